//! Product management routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{CreateProductRequest, PriceResponse, ProductResponse};
use crate::api::server::AppState;
use crate::scheduler::CheckResult;
use crate::services::ProductService;

/// Create the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/check", post(check_all_products))
        .route("/{id}", get(get_product).delete(delete_product))
        .route("/{id}/prices", get(list_prices))
        .route("/{id}/check", post(check_product))
}

fn product_service(state: &AppState) -> ApiResult<&Arc<ProductService>> {
    state
        .product_service
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Product service not available"))
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "products",
    responses(
        (status = 200, description = "Tracked products with their latest price", body = Vec<ProductResponse>)
    )
)]
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<ProductResponse>>> {
    let products = product_service(&state)?.list_with_latest().await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product registered and scheduled", body = ProductResponse),
        (status = 409, description = "Product URL already tracked", body = crate::api::error::ApiErrorResponse),
        (status = 422, description = "Validation error or selector test failed", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    let registered = product_service(&state)?.register(request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::with_latest(
            registered.product,
            Some(&registered.initial_price),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductResponse>> {
    let product = product_service(&state)?.get(id).await?;
    Ok(Json(product.into()))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product, history and schedule removed"),
        (status = 404, description = "Product not found", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    product_service(&state)?.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/prices",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Price history, newest first", body = Vec<PriceResponse>),
        (status = 404, description = "Product not found", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn list_prices(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<PriceResponse>>> {
    let prices = product_service(&state)?.history(id).await?;
    Ok(Json(prices.into_iter().map(PriceResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/check",
    tag = "products",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Outcome of the check", body = CheckResult),
        (status = 404, description = "Product not found", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn check_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CheckResult>> {
    let result = product_service(&state)?.check_now(id).await?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/products/check",
    tag = "products",
    responses(
        (status = 200, description = "One outcome per tracked product", body = Vec<CheckResult>)
    )
)]
pub async fn check_all_products(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CheckResult>>> {
    let results = product_service(&state)?.check_all_now().await?;
    Ok(Json(results))
}
