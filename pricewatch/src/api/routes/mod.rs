//! API route modules.
//!
//! Organizes routes by resource type.

pub mod health;
pub mod logging;
pub mod products;
pub mod selectors;

use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use crate::api::openapi::ApiDoc;
use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/products", products::router())
        .nest("/api/selectors", selectors::router())
        .nest("/api/logging", logging::router())
        .nest("/health", health::router())
        .route("/api/openapi.json", get(openapi_json))
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
