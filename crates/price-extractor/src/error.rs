use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which strategy produced a value or a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Plain HTTP GET plus markup parsing.
    Http,
    /// Headless browser rendering.
    Browser,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// 403 from the primary strategy. Only surfaced when no fallback ran.
    #[error("website is blocking access (403 Forbidden)")]
    AccessDenied,
    #[error("product page not found (404). The URL might be incorrect or the product was removed")]
    NotFound,
    #[error("server responded with status code {status}")]
    ServerError { status: u16 },
    #[error("no response received from website: {reason}")]
    Unreachable { reason: String },
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("element '{selector}' did not appear within {waited_ms}ms")]
    SelectorTimeout { selector: String, waited_ms: u64 },
    #[error("failed to parse price from text: '{raw}' ({strategy})")]
    ParseFailure { strategy: Strategy, raw: String },
    #[error("browser rendering failed: {reason}")]
    Browser { reason: String },
}

impl ExtractError {
    pub fn unreachable(reason: impl fmt::Display) -> Self {
        Self::Unreachable {
            reason: reason.to_string(),
        }
    }

    pub fn browser(reason: impl fmt::Display) -> Self {
        Self::Browser {
            reason: reason.to_string(),
        }
    }

    pub fn parse_failure(strategy: Strategy, raw: impl Into<String>) -> Self {
        Self::ParseFailure {
            strategy,
            raw: raw.into(),
        }
    }

    /// The strategy a failure originated from.
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::SelectorTimeout { .. } | Self::Browser { .. } => Strategy::Browser,
            Self::ParseFailure { strategy, .. } => *strategy,
            _ => Strategy::Http,
        }
    }

    /// Short machine-readable kind, used in logs and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::NotFound => "not_found",
            Self::ServerError { .. } => "server_error",
            Self::Unreachable { .. } => "unreachable",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::InvalidSelector { .. } => "invalid_selector",
            Self::SelectorTimeout { .. } => "selector_timeout",
            Self::ParseFailure { .. } => "parse_failure",
            Self::Browser { .. } => "browser",
        }
    }
}
