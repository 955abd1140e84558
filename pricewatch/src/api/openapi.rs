//! OpenAPI documentation configuration.
//!
//! The generated document is served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::api::error::ApiErrorResponse;
use crate::api::models::{
    CreateProductRequest, HealthResponse, LivenessResponse, LoggingConfigResponse, ModuleInfo,
    PriceResponse, ProductResponse, SelectorTestRequest, SelectorTestResponse,
    UpdateLogFilterRequest,
};
use crate::scheduler::CheckResult;

/// OpenAPI documentation for the pricewatch API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "pricewatch API",
        description = "REST API for tracking product prices. Register product pages with a CSS selector, read price history and trigger checks.",
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "products", description = "Tracked products, price history and checks"),
        (name = "selectors", description = "Selector testing"),
        (name = "logging", description = "Runtime log filter"),
    ),
    paths(
        crate::api::routes::health::health_check,
        crate::api::routes::health::liveness_check,
        crate::api::routes::products::list_products,
        crate::api::routes::products::create_product,
        crate::api::routes::products::get_product,
        crate::api::routes::products::delete_product,
        crate::api::routes::products::list_prices,
        crate::api::routes::products::check_product,
        crate::api::routes::products::check_all_products,
        crate::api::routes::selectors::test_selector,
        crate::api::routes::logging::get_logging_config,
        crate::api::routes::logging::update_logging_config,
    ),
    components(
        schemas(
            ApiErrorResponse,
            HealthResponse,
            LivenessResponse,
            CreateProductRequest,
            ProductResponse,
            PriceResponse,
            CheckResult,
            SelectorTestRequest,
            SelectorTestResponse,
            LoggingConfigResponse,
            ModuleInfo,
            UpdateLogFilterRequest,
        )
    )
)]
pub struct ApiDoc;
