//! pricewatch library crate.
//!
//! Persistence, scheduling and the HTTP API around [`price_extractor`].

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod services;

pub use error::{Error, Result};
