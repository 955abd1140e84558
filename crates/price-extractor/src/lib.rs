//! Single-value page extraction.
//!
//! [`ValueExtractor`] fetches a page with a browser-like HTTP client, selects one
//! element with a CSS selector and normalizes its text into an `f64`. When the
//! site answers 403 it retries exactly once through a [`PageRenderer`] (headless
//! Chromium by default).

pub mod browser;
pub mod client;
pub mod error;
pub mod extractor;
pub mod http;
pub mod normalize;

pub use browser::{BrowserSession, ChromiumRenderer, PageRenderer, RendererConfig};
pub use error::{ExtractError, Strategy};
pub use extractor::{Extracted, LocatorTest, ValueExtractor, ValueSource};
pub use http::{HttpStrategy, PrimaryOutcome};
pub use normalize::normalize_price_text;
