use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, redirect};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Total time budget for a primary-strategy request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum redirects followed by the primary strategy.
pub const MAX_REDIRECTS: usize = 5;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,nl;q=0.8";

/// Header set a desktop browser sends on a top-level navigation.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

/// Client builder preloaded with browser headers, timeout and redirect limit.
pub fn client_builder() -> reqwest::ClientBuilder {
    Client::builder()
        .default_headers(browser_headers())
        .timeout(HTTP_TIMEOUT)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
}

pub fn default_client() -> reqwest::Result<Client> {
    client_builder().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_headers() {
        let headers = browser_headers();
        assert_eq!(
            headers.get(header::USER_AGENT).unwrap(),
            DEFAULT_USER_AGENT
        );
        assert!(headers.contains_key("sec-fetch-mode"));
        assert_eq!(headers.get(header::UPGRADE_INSECURE_REQUESTS).unwrap(), "1");
    }

    #[test]
    fn test_default_client_builds() {
        assert!(default_client().is_ok());
    }
}
