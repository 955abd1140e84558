//! REST API server module.
//!
//! Provides HTTP endpoints for registering products, reading price history
//! and triggering checks.

pub mod error;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
