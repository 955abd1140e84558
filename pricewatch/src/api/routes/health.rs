//! Health check routes.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::models::{HealthResponse, LivenessResponse};
use crate::api::server::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let active_schedules = state
        .product_service
        .as_ref()
        .map(|service| service.scheduler().registry().len())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_schedules,
    })
}

/// Liveness check - is the service alive?
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Service is responsive", body = LivenessResponse)
    )
)]
pub async fn liveness_check(State(state): State<AppState>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_without_services() {
        let Json(response) = health_check(State(AppState::new())).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.active_schedules, 0);

        let Json(live) = liveness_check(State(AppState::new())).await;
        assert_eq!(live.status, "alive");
    }
}
