//! Product registration, removal and queries.

use std::sync::Arc;

use price_extractor::{LocatorTest, ValueSource};
use serde::Deserialize;
use tracing::{info, warn};

use crate::database::models::{PriceDbModel, ProductDbModel, ProductWithLatestDbModel};
use crate::database::repositories::{PriceRepository, ProductRepository};
use crate::database::time::now_ms;
use crate::scheduler::{CheckResult, Scheduler};
use crate::{Error, Result};

/// Input for registering a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub url: String,
    pub selector: String,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            selector: selector.into(),
        }
    }

    /// Trim every field and check that the URL is an absolute http(s) URL.
    fn validated(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        let url = self.url.trim().to_string();
        let selector = self.selector.trim().to_string();

        if name.is_empty() || url.is_empty() || selector.is_empty() {
            return Err(Error::validation("Name, URL and selector are required"));
        }

        let parsed = url::Url::parse(&url)
            .map_err(|e| Error::validation(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "Invalid URL '{}': only http and https are supported",
                url
            )));
        }

        Ok(Self {
            name,
            url,
            selector,
        })
    }
}

/// A freshly registered product and its first sample.
#[derive(Debug, Clone)]
pub struct RegisteredProduct {
    pub product: ProductDbModel,
    pub initial_price: PriceDbModel,
}

pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    prices: Arc<dyn PriceRepository>,
    source: Arc<dyn ValueSource>,
    scheduler: Arc<Scheduler>,
}

impl ProductService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        prices: Arc<dyn PriceRepository>,
        source: Arc<dyn ValueSource>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            products,
            prices,
            source,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Validate, test the selector, persist, record the first price and schedule.
    ///
    /// Nothing is persisted unless the selector test succeeds.
    pub async fn register(&self, request: NewProduct) -> Result<RegisteredProduct> {
        let request = request.validated()?;

        match self.products.get_product_by_url(&request.url).await {
            Ok(_) => return Err(Error::duplicate_url(&request.url)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let test = self
            .source
            .test_locator(&request.url, &request.selector)
            .await;
        let price = match test.value {
            Some(price) if test.success => price,
            _ => {
                warn!(
                    url = %request.url,
                    selector = %request.selector,
                    message = %test.message,
                    "Selector test failed, product not registered"
                );
                return Err(Error::validation(test.message));
            }
        };

        let product = self
            .products
            .create_product(&ProductDbModel::new(
                request.name,
                request.url,
                request.selector,
            ))
            .await?;
        let initial_price = match self.prices.record_price(product.id, price, now_ms()).await {
            Ok(sample) => sample,
            Err(e) => {
                // A product without its first sample is never scheduled; undo it
                // so the URL can be registered again.
                if let Err(cleanup) = self.products.delete_product(product.id).await {
                    warn!(
                        product_id = product.id,
                        error = %cleanup,
                        "Failed to roll back product after initial price write failed"
                    );
                }
                warn!(product_id = product.id, error = %e, "Failed to record initial price");
                return Err(e);
            }
        };

        self.scheduler.schedule_default(&product);

        info!(
            product_id = product.id,
            name = %product.name,
            url = %product.url,
            price,
            "Registered product"
        );

        Ok(RegisteredProduct {
            product,
            initial_price,
        })
    }

    /// Delete the product and its history, then cancel its schedule.
    pub async fn remove(&self, product_id: i64) -> Result<()> {
        self.products.delete_product(product_id).await?;
        self.scheduler.unschedule(product_id);
        self.scheduler.guards().remove(product_id);
        info!(product_id, "Removed product");
        Ok(())
    }

    pub async fn list_with_latest(&self) -> Result<Vec<ProductWithLatestDbModel>> {
        self.products.list_products_with_latest().await
    }

    pub async fn get(&self, product_id: i64) -> Result<ProductWithLatestDbModel> {
        let product = self.products.get_product(product_id).await?;
        let latest = self.prices.latest_price(product_id).await?;

        Ok(ProductWithLatestDbModel {
            id: product.id,
            name: product.name,
            url: product.url,
            selector: product.selector,
            created_at: product.created_at,
            latest_price: latest.as_ref().map(|p| p.price),
            last_checked: latest.map(|p| p.timestamp),
        })
    }

    /// Price history, newest first.
    pub async fn history(&self, product_id: i64) -> Result<Vec<PriceDbModel>> {
        self.products.get_product(product_id).await?;
        self.prices.list_prices(product_id).await
    }

    pub async fn check_now(&self, product_id: i64) -> Result<CheckResult> {
        self.scheduler.trigger_one_now(product_id).await
    }

    pub async fn check_all_now(&self) -> Result<Vec<CheckResult>> {
        self.scheduler.trigger_all_now().await
    }

    /// Try a selector against a page without persisting anything.
    pub async fn test_locator(&self, url: &str, selector: &str) -> LocatorTest {
        self.source.test_locator(url.trim(), selector.trim()).await
    }
}
