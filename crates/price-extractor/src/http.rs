//! Lightweight strategy: one GET, parse the markup, read the first match.

use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::ExtractError;

/// Result of the primary strategy that is not a terminal failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryOutcome {
    /// Text of the first element matching the selector (empty if none matched).
    Extracted(String),
    /// The site refused a non-browser client (HTTP 403). The caller may escalate.
    Blocked,
}

/// Compile a CSS selector, mapping syntax errors to [`ExtractError::InvalidSelector`].
pub fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Text content of the first element in `html` matching `selector`, trimmed.
pub fn select_text(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}

/// Validate that `location` is an absolute http(s) URL.
pub fn parse_location(location: &str) -> Result<url::Url, ExtractError> {
    let url = url::Url::parse(location).map_err(|e| ExtractError::InvalidUrl {
        url: location.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ExtractError::InvalidUrl {
            url: location.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct HttpStrategy {
    client: Client,
}

impl HttpStrategy {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch `location` and read the text of the first element matching `selector`.
    pub async fn fetch(
        &self,
        location: &str,
        selector: &str,
    ) -> Result<PrimaryOutcome, ExtractError> {
        let compiled = parse_selector(selector)?;
        let url = parse_location(location)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ExtractError::unreachable)?;

        let status = response.status();
        debug!(url = %location, status = status.as_u16(), "Primary fetch responded");

        match status {
            StatusCode::FORBIDDEN => return Ok(PrimaryOutcome::Blocked),
            StatusCode::NOT_FOUND => return Err(ExtractError::NotFound),
            s if !s.is_success() => {
                return Err(ExtractError::ServerError { status: s.as_u16() });
            }
            _ => {}
        }

        let body = response.text().await.map_err(ExtractError::unreachable)?;
        let text = select_text(&body, &compiled).unwrap_or_default();

        Ok(PrimaryOutcome::Extracted(text))
    }
}
