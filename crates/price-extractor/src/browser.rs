//! Fallback strategy: render the page in a throwaway headless Chromium.
//!
//! Every call launches its own browser with its own profile directory and tears
//! it down before returning. [`BrowserSession`] owns the process; the normal path
//! awaits [`BrowserSession::shutdown`], and `Drop` covers the path where the
//! surrounding future is cancelled mid-render.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::DEFAULT_USER_AGENT;
use crate::error::ExtractError;

/// Navigation budget for the rendered page.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for the selector to match after navigation.
pub const SELECTOR_TIMEOUT: Duration = Duration::from_secs(5);

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a browser gets to exit after `close` before it is killed.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle event Chromium emits once at most two connections remain open.
const NETWORK_SETTLED_EVENT: &str = "networkAlmostIdle";
const NETWORK_IDLE_EVENT: &str = "networkIdle";

/// Something that can render a page and return the text of one element.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_text(&self, location: &str, selector: &str) -> Result<String, ExtractError>;
}

#[derive(Debug, Clone, Default)]
pub struct RendererConfig {
    /// Disable the Chromium sandbox. Needed when running as root in containers.
    pub no_sandbox: bool,
    /// Explicit Chromium/Chrome executable. Auto-detected when `None`.
    pub executable: Option<PathBuf>,
}

/// A launched browser plus the task driving its CDP connection.
pub struct BrowserSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    profile: Option<TempDir>,
}

impl BrowserSession {
    pub async fn launch(config: &RendererConfig) -> Result<Self, ExtractError> {
        let profile = tempfile::Builder::new()
            .prefix("pricewatch-chromium-")
            .tempdir()
            .map_err(ExtractError::browser)?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .request_timeout(NAVIGATION_TIMEOUT);
        if config.no_sandbox {
            builder = builder.no_sandbox().arg("--disable-setuid-sandbox");
        }
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(ExtractError::browser)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(ExtractError::browser)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!(profile = %profile.path().display(), "Headless browser launched");

        Ok(Self {
            browser: Some(browser),
            handler: Some(handler),
            profile: Some(profile),
        })
    }

    pub fn browser_mut(&mut self) -> Option<&mut Browser> {
        self.browser.as_mut()
    }

    /// Close the browser and wait for the process to exit.
    pub async fn shutdown(mut self) {
        if let Some(browser) = self.browser.take() {
            close_browser(browser).await;
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        drop(self.profile.take());
    }
}

async fn close_browser(mut browser: Browser) {
    let graceful = tokio::time::timeout(CLOSE_TIMEOUT, async {
        if let Err(e) = browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        browser.wait().await
    })
    .await;

    match graceful {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to reap browser process"),
        Err(_) => {
            warn!(
                timeout_secs = CLOSE_TIMEOUT.as_secs(),
                "Browser did not exit in time, killing it"
            );
            if let Some(Err(e)) = browser.kill().await {
                warn!(error = %e, "Failed to kill browser process");
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(browser) = self.browser.take() else {
            return;
        };
        let handler = self.handler.take();
        let profile = self.profile.take();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    close_browser(browser).await;
                    if let Some(handler) = handler {
                        handler.abort();
                    }
                    drop(profile);
                });
            }
            Err(_) => {
                warn!("No runtime available to close browser; dropping process handle");
                if let Some(handler) = handler {
                    handler.abort();
                }
            }
        }
    }
}

/// [`PageRenderer`] backed by a fresh headless Chromium per call.
#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    config: RendererConfig,
}

impl ChromiumRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    async fn render_in(
        &self,
        session: &mut BrowserSession,
        location: &str,
        selector: &str,
    ) -> Result<String, ExtractError> {
        let browser = session
            .browser_mut()
            .ok_or_else(|| ExtractError::browser("browser already closed"))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(ExtractError::browser)?;

        page.set_user_agent(SetUserAgentOverrideParams::new(DEFAULT_USER_AGENT))
            .await
            .map_err(ExtractError::browser)?;

        navigate_and_settle(&page, location).await?;
        wait_for_selector(&page, selector).await?;

        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.textContent.trim() : ''; }})()",
            serde_json::to_string(selector).map_err(ExtractError::browser)?
        );
        let text = page
            .evaluate(script)
            .await
            .map_err(ExtractError::browser)?
            .into_value::<String>()
            .map_err(ExtractError::browser)?;

        Ok(text)
    }
}

/// Tracks main-frame lifecycle events until the navigated document's network
/// activity settles. Events from the previous document are ignored until the
/// new one reports `init`.
#[derive(Debug, Default)]
struct SettleTracker {
    document_started: bool,
}

impl SettleTracker {
    fn observe(&mut self, name: &str) -> bool {
        match name {
            "init" => {
                self.document_started = true;
                false
            }
            NETWORK_SETTLED_EVENT | NETWORK_IDLE_EVENT => self.document_started,
            _ => false,
        }
    }
}

/// Navigate and wait until the network goes quiet, all within
/// [`NAVIGATION_TIMEOUT`].
async fn navigate_and_settle(page: &Page, location: &str) -> Result<(), ExtractError> {
    page.execute(SetLifecycleEventsEnabledParams::new(true))
        .await
        .map_err(ExtractError::browser)?;
    // Subscribe before navigating so no event is missed.
    let mut lifecycle = page
        .event_listener::<EventLifecycleEvent>()
        .await
        .map_err(ExtractError::browser)?;

    let navigation = async {
        page.goto(location)
            .await
            .map_err(|e| ExtractError::browser(format!("navigation failed: {}", e)))?;
        let main_frame = page.mainframe().await.map_err(ExtractError::browser)?;

        let mut tracker = SettleTracker::default();
        while let Some(event) = lifecycle.next().await {
            if main_frame.as_ref().is_some_and(|id| *id != event.frame_id) {
                continue;
            }
            if tracker.observe(&event.name) {
                debug!(url = %location, "Network settled");
                return Ok(());
            }
        }
        Err(ExtractError::browser("page closed before network settled"))
    };

    match tokio::time::timeout(NAVIGATION_TIMEOUT, navigation).await {
        Ok(result) => result,
        Err(_) => Err(ExtractError::browser(format!(
            "navigation timed out after {}s",
            NAVIGATION_TIMEOUT.as_secs()
        ))),
    }
}

async fn wait_for_selector(page: &Page, selector: &str) -> Result<(), ExtractError> {
    let started = Instant::now();
    loop {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        if started.elapsed() >= SELECTOR_TIMEOUT {
            return Err(ExtractError::SelectorTimeout {
                selector: selector.to_string(),
                waited_ms: SELECTOR_TIMEOUT.as_millis() as u64,
            });
        }
        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render_text(&self, location: &str, selector: &str) -> Result<String, ExtractError> {
        info!(url = %location, "Rendering page in headless browser");

        let mut session = BrowserSession::launch(&self.config).await?;
        let result = self.render_in(&mut session, location, selector).await;
        session.shutdown().await;

        result
    }
}
