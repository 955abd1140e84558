//! Database models for pricewatch.
//!
//! These models map directly to the database schema.

pub mod price;
pub mod product;

pub use price::*;
pub use product::*;
