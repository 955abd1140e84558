//! Selector test route.

use axum::{Json, Router, extract::State, routing::post};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{SelectorTestRequest, SelectorTestResponse};
use crate::api::server::AppState;

/// Create the selectors router.
pub fn router() -> Router<AppState> {
    Router::new().route("/test", post(test_selector))
}

/// Try a selector against a page without tracking it.
///
/// Extraction failures come back as `success: false` with a 200.
#[utoipa::path(
    post,
    path = "/api/selectors/test",
    tag = "selectors",
    request_body = SelectorTestRequest,
    responses(
        (status = 200, description = "Selector test outcome", body = SelectorTestResponse)
    )
)]
pub async fn test_selector(
    State(state): State<AppState>,
    Json(request): Json<SelectorTestRequest>,
) -> ApiResult<Json<SelectorTestResponse>> {
    let service = state
        .product_service
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Product service not available"))?;

    let test = service.test_locator(&request.url, &request.selector).await;
    Ok(Json(test.into()))
}
