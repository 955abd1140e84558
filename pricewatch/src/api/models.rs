//! API request and response models.

use chrono::{DateTime, Utc};
use price_extractor::LocatorTest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::database::models::{PriceDbModel, ProductDbModel, ProductWithLatestDbModel};
use crate::database::time::ms_to_datetime;
use crate::services::NewProduct;

/// Request to start tracking a product.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    /// Display name
    pub name: String,
    /// Absolute http(s) URL of the product page
    pub url: String,
    /// CSS selector of the element holding the price
    pub selector: String,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(request: CreateProductRequest) -> Self {
        NewProduct::new(request.name, request.url, request.selector)
    }
}

/// A tracked product, with its most recent sample if any.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub selector: String,
    pub created_at: DateTime<Utc>,
    pub latest_price: Option<f64>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl From<ProductWithLatestDbModel> for ProductResponse {
    fn from(model: ProductWithLatestDbModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            url: model.url,
            selector: model.selector,
            created_at: ms_to_datetime(model.created_at),
            latest_price: model.latest_price,
            last_checked: model.last_checked.map(ms_to_datetime),
        }
    }
}

impl ProductResponse {
    pub fn with_latest(product: ProductDbModel, latest: Option<&PriceDbModel>) -> Self {
        Self {
            id: product.id,
            name: product.name,
            url: product.url,
            selector: product.selector,
            created_at: ms_to_datetime(product.created_at),
            latest_price: latest.map(|p| p.price),
            last_checked: latest.map(|p| ms_to_datetime(p.timestamp)),
        }
    }
}

/// One price sample.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PriceResponse {
    pub id: i64,
    pub product_id: i64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<PriceDbModel> for PriceResponse {
    fn from(model: PriceDbModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            price: model.price,
            timestamp: ms_to_datetime(model.timestamp),
        }
    }
}

/// Request to try a selector against a page.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SelectorTestRequest {
    pub url: String,
    pub selector: String,
}

/// Result of a selector test. Failures are reported here, not as HTTP errors.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SelectorTestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub message: String,
}

impl From<LocatorTest> for SelectorTestResponse {
    fn from(test: LocatorTest) -> Self {
        Self {
            success: test.success,
            price: test.value,
            message: test.message,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Number of products with a live schedule
    pub active_schedules: usize,
}

/// Liveness check response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LivenessResponse {
    /// Always "alive" if responding
    pub status: String,
    pub uptime_secs: u64,
}

/// Request to update the log filter.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLogFilterRequest {
    pub filter: String,
}

/// Response for logging configuration.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoggingConfigResponse {
    pub filter: String,
    pub available_modules: Vec<ModuleInfo>,
}

/// Information about an available logging module.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleInfo {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_response_timestamps() {
        let response = ProductResponse::from(ProductWithLatestDbModel {
            id: 1,
            name: "Widget".to_string(),
            url: "http://shop.test/w".to_string(),
            selector: "#price".to_string(),
            created_at: 1_700_000_000_000,
            latest_price: None,
            last_checked: None,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["created_at"], "2023-11-14T22:13:20Z");
        assert!(json["latest_price"].is_null());
        assert!(json["last_checked"].is_null());
    }

    #[test]
    fn test_selector_test_response_from_failure() {
        let response = SelectorTestResponse::from(LocatorTest {
            success: false,
            value: None,
            message: "Failed to extract price: product page not found".to_string(),
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("price").is_none());
    }
}
