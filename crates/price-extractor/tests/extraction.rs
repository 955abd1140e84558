//! Extraction tests against a throwaway local HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use price_extractor::client::{DEFAULT_USER_AGENT, default_client};
use price_extractor::{
    ExtractError, HttpStrategy, PageRenderer, Strategy, ValueExtractor, ValueSource,
};
use tokio::net::TcpListener;

/// Renderer that counts calls and returns canned text.
struct CountingRenderer {
    calls: AtomicUsize,
    text: Result<String, ExtractError>,
}

impl CountingRenderer {
    fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            text: Ok(text.to_string()),
        })
    }

    fn failing(err: ExtractError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            text: Err(err),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for CountingRenderer {
    async fn render_text(&self, _location: &str, _selector: &str) -> Result<String, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone()
    }
}

async fn product_page() -> Html<&'static str> {
    Html(r#"<html><body><h1>Widget</h1><span id="price">$42.00</span></body></html>"#)
}

async fn euro_page() -> Html<&'static str> {
    Html(r#"<html><body><div class="amount">1.299,00&nbsp;&euro;</div></body></html>"#)
}

async fn sold_out_page() -> Html<&'static str> {
    Html(r#"<html><body><span id="price">Sold out</span></body></html>"#)
}

async fn echo_user_agent(headers: HeaderMap) -> Html<String> {
    let ua = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let ok = if ua == DEFAULT_USER_AGENT { "1.00" } else { "0.00" };
    Html(format!(r#"<span id="ua">{}</span>"#, ok))
}

/// Redirects `hops` more times before serving the product page.
async fn redirect_chain(Path(hops): Path<u32>) -> Response {
    if hops == 0 {
        product_page().await.into_response()
    } else {
        Redirect::temporary(&format!("/hops/{}", hops - 1)).into_response()
    }
}

async fn spawn_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/product", get(product_page))
        .route("/euro", get(euro_page))
        .route("/sold-out", get(sold_out_page))
        .route("/ua", get(echo_user_agent))
        .route("/hops/{hops}", get(redirect_chain))
        .route("/blocked", get(|| async { StatusCode::FORBIDDEN }))
        .route("/gone", get(|| async { StatusCode::NOT_FOUND }))
        .route("/broken", get(|| async { StatusCode::BAD_GATEWAY }));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn extractor_with(renderer: Arc<CountingRenderer>) -> ValueExtractor {
    ValueExtractor::new(HttpStrategy::new(default_client().unwrap()), renderer)
}

#[tokio::test]
async fn extracts_value_with_primary_strategy() {
    let addr = spawn_upstream().await;
    let renderer = CountingRenderer::returning("0");
    let extractor = extractor_with(renderer.clone());

    let extracted = extractor
        .extract_detailed(&format!("http://{addr}/product"), "#price")
        .await
        .unwrap();

    assert_eq!(extracted.value, 42.0);
    assert_eq!(extracted.strategy, Strategy::Http);
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn normalizes_european_format() {
    let addr = spawn_upstream().await;
    let extractor = extractor_with(CountingRenderer::returning("0"));

    let value = extractor
        .extract(&format!("http://{addr}/euro"), ".amount")
        .await
        .unwrap();

    // Both separators present: commas are dropped, the period stays decimal.
    assert_eq!(value, 1.29900);
}

#[tokio::test]
async fn sends_browser_user_agent() {
    let addr = spawn_upstream().await;
    let extractor = extractor_with(CountingRenderer::returning("0"));

    let value = extractor
        .extract(&format!("http://{addr}/ua"), "#ua")
        .await
        .unwrap();
    assert_eq!(value, 1.0);
}

#[tokio::test]
async fn forbidden_escalates_exactly_once() {
    let addr = spawn_upstream().await;
    let renderer = CountingRenderer::returning("€ 19,99");
    let extractor = extractor_with(renderer.clone());

    let extracted = extractor
        .extract_detailed(&format!("http://{addr}/blocked"), "#price")
        .await
        .unwrap();

    assert_eq!(extracted.value, 19.99);
    assert_eq!(extracted.strategy, Strategy::Browser);
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn fallback_failure_is_surfaced_without_retry() {
    let addr = spawn_upstream().await;
    let renderer = CountingRenderer::failing(ExtractError::SelectorTimeout {
        selector: "#price".to_string(),
        waited_ms: 5000,
    });
    let extractor = extractor_with(renderer.clone());

    let err = extractor
        .extract(&format!("http://{addr}/blocked"), "#price")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::SelectorTimeout { .. }));
    assert_eq!(err.strategy(), Strategy::Browser);
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn fallback_parse_failure_is_tagged_browser() {
    let addr = spawn_upstream().await;
    let renderer = CountingRenderer::returning("Call for price");
    let extractor = extractor_with(renderer.clone());

    let err = extractor
        .extract(&format!("http://{addr}/blocked"), "#price")
        .await
        .unwrap_err();

    match err {
        ExtractError::ParseFailure { strategy, raw } => {
            assert_eq!(strategy, Strategy::Browser);
            assert_eq!(raw, "Call for price");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(renderer.calls(), 1);
}

#[tokio::test]
async fn not_found_does_not_escalate() {
    let addr = spawn_upstream().await;
    let renderer = CountingRenderer::returning("1.00");
    let extractor = extractor_with(renderer.clone());

    let err = extractor
        .extract(&format!("http://{addr}/gone"), "#price")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::NotFound));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn other_status_is_server_error() {
    let addr = spawn_upstream().await;
    let renderer = CountingRenderer::returning("1.00");
    let extractor = extractor_with(renderer.clone());

    let err = extractor
        .extract(&format!("http://{addr}/broken"), "#price")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::ServerError { status: 502 }));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn connection_refused_is_unreachable() {
    // Bind then drop to obtain a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let renderer = CountingRenderer::returning("1.00");
    let extractor = extractor_with(renderer.clone());

    let err = extractor
        .extract(&format!("http://{addr}/product"), "#price")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::Unreachable { .. }));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn follows_up_to_five_redirects() {
    let addr = spawn_upstream().await;
    let renderer = CountingRenderer::returning("0");
    let extractor = extractor_with(renderer.clone());

    let value = extractor
        .extract(&format!("http://{addr}/hops/5"), "#price")
        .await
        .unwrap();

    assert_eq!(value, 42.0);
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn sixth_redirect_is_unreachable() {
    let addr = spawn_upstream().await;
    let renderer = CountingRenderer::returning("1.00");
    let extractor = extractor_with(renderer.clone());

    let err = extractor
        .extract(&format!("http://{addr}/hops/6"), "#price")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::Unreachable { .. }));
    assert_eq!(err.strategy(), Strategy::Http);
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn non_numeric_text_is_parse_failure() {
    let addr = spawn_upstream().await;
    let extractor = extractor_with(CountingRenderer::returning("1.00"));

    let err = extractor
        .extract(&format!("http://{addr}/sold-out"), "#price")
        .await
        .unwrap_err();

    match err {
        ExtractError::ParseFailure { strategy, raw } => {
            assert_eq!(strategy, Strategy::Http);
            assert_eq!(raw, "Sold out");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_element_is_parse_failure() {
    let addr = spawn_upstream().await;
    let extractor = extractor_with(CountingRenderer::returning("1.00"));

    let err = extractor
        .extract(&format!("http://{addr}/product"), ".does-not-exist")
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::ParseFailure { .. }));
}

#[tokio::test]
async fn test_locator_never_errors() {
    let addr = spawn_upstream().await;
    let extractor = extractor_with(CountingRenderer::returning("1.00"));

    let ok = extractor
        .test_locator(&format!("http://{addr}/product"), "#price")
        .await;
    assert!(ok.success);
    assert_eq!(ok.value, Some(42.0));

    let bad_selector = extractor
        .test_locator(&format!("http://{addr}/product"), "span[[")
        .await;
    assert!(!bad_selector.success);
    assert!(bad_selector.message.contains("invalid selector"));

    let gone = extractor
        .test_locator(&format!("http://{addr}/gone"), "#price")
        .await;
    assert!(!gone.success);
    assert!(gone.value.is_none());
}
