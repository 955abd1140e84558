use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::browser::{ChromiumRenderer, PageRenderer, RendererConfig};
use crate::client;
use crate::error::{ExtractError, Strategy};
use crate::http::{HttpStrategy, PrimaryOutcome};
use crate::normalize::normalize_with;

/// A value extracted from a page and the strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extracted {
    pub value: f64,
    pub strategy: Strategy,
}

/// Outcome of a locator check. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorTest {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub message: String,
}

impl LocatorTest {
    pub fn from_result(result: Result<f64, ExtractError>) -> Self {
        match result {
            Ok(value) => Self {
                success: true,
                value: Some(value),
                message: format!("Successfully extracted price: {}", value),
            },
            Err(e) => Self {
                success: false,
                value: None,
                message: format!("Failed to extract price: {}", e),
            },
        }
    }
}

/// Anything that turns a (location, locator) pair into a number.
#[async_trait]
pub trait ValueSource: Send + Sync {
    async fn extract(&self, location: &str, selector: &str) -> Result<f64, ExtractError>;

    /// Run [`ValueSource::extract`] and fold the outcome into a [`LocatorTest`].
    async fn test_locator(&self, location: &str, selector: &str) -> LocatorTest {
        LocatorTest::from_result(self.extract(location, selector).await)
    }
}

/// Two-strategy extractor: plain HTTP first, headless rendering when blocked.
#[derive(Clone)]
pub struct ValueExtractor {
    http: HttpStrategy,
    renderer: Arc<dyn PageRenderer>,
}

impl ValueExtractor {
    pub fn new(http: HttpStrategy, renderer: Arc<dyn PageRenderer>) -> Self {
        Self { http, renderer }
    }

    /// Default HTTP client plus a Chromium renderer.
    pub fn with_renderer_config(config: RendererConfig) -> Result<Self, ExtractError> {
        let client = client::default_client().map_err(ExtractError::unreachable)?;
        Ok(Self::new(
            HttpStrategy::new(client),
            Arc::new(ChromiumRenderer::new(config)),
        ))
    }

    /// Extract a value and report which strategy produced it.
    pub async fn extract_detailed(
        &self,
        location: &str,
        selector: &str,
    ) -> Result<Extracted, ExtractError> {
        let outcome = match self.http.fetch(location, selector).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(url = %location, error = %e, "Error scraping price");
                return Err(e);
            }
        };

        match outcome {
            PrimaryOutcome::Extracted(text) => {
                debug!(url = %location, text = %text, "Primary strategy extracted text");
                let value = normalize_with(Strategy::Http, &text)?;
                Ok(Extracted {
                    value,
                    strategy: Strategy::Http,
                })
            }
            PrimaryOutcome::Blocked => {
                info!(url = %location, "Website is blocking access (403 Forbidden), escalating to browser rendering");
                self.extract_rendered(location, selector).await
            }
        }
    }

    async fn extract_rendered(
        &self,
        location: &str,
        selector: &str,
    ) -> Result<Extracted, ExtractError> {
        let text = self
            .renderer
            .render_text(location, selector)
            .await
            .inspect_err(|e| warn!(url = %location, error = %e, "Browser fallback failed"))?;

        let value = normalize_with(Strategy::Browser, &text)?;
        Ok(Extracted {
            value,
            strategy: Strategy::Browser,
        })
    }
}

#[async_trait]
impl ValueSource for ValueExtractor {
    async fn extract(&self, location: &str, selector: &str) -> Result<f64, ExtractError> {
        self.extract_detailed(location, selector)
            .await
            .map(|extracted| extracted.value)
    }
}
