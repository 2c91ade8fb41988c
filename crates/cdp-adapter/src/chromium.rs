use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Element;
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::page::{collapse_whitespace, CookieInfo, ElementRef, Page};

const VISIBILITY_FN: &str = "function() { \
    const rect = this.getBoundingClientRect(); \
    const style = window.getComputedStyle(this); \
    return rect.width > 0 && rect.height > 0 \
        && style.visibility !== 'hidden' && style.display !== 'none'; }";

const CLICK_FALLBACK_FN: &str = "function() { this.click(); }";

const CLEAR_INPUT_FN: &str = "function() { \
    this.focus(); \
    this.value = ''; \
    this.dispatchEvent(new Event('input', { bubbles: true })); }";

/// A browser process bound to one profile directory, plus its single working tab.
pub struct ChromiumBrowser {
    browser: Browser,
    page: Arc<ChromiumPage>,
    handler_task: JoinHandle<()>,
}

impl ChromiumBrowser {
    pub async fn launch(cfg: &CdpConfig) -> Result<Self, AdapterError> {
        let browser_config = build_browser_config(cfg)?;

        info!(
            target: "cdp-adapter",
            profile = %cfg.user_data_dir.display(),
            headless = cfg.headless,
            "launching chromium"
        );
        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", %err, "chromium handler event error");
                }
            }
            debug!(target: "cdp-adapter", "chromium handler loop finished");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                    .with_hint(format!("browser has been closed before a page opened: {err}")));
            }
        };

        Ok(Self {
            browser,
            page: Arc::new(ChromiumPage::new(page)),
            handler_task,
        })
    }

    pub fn page(&self) -> Arc<ChromiumPage> {
        Arc::clone(&self.page)
    }

    /// Close the browser and stop the handler loop.
    pub async fn close(mut self) -> Result<(), AdapterError> {
        let closed = self.browser.close().await.map(|_| ()).map_err(map_cdp_error);
        if let Err(err) = self.browser.wait().await {
            warn!(target: "cdp-adapter", ?err, "waiting for chromium exit failed");
        }
        self.handler_task.abort();
        closed
    }
}

fn build_browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    let profile_dir = if cfg.user_data_dir.is_absolute() {
        cfg.user_data_dir.clone()
    } else {
        let cwd = std::env::current_dir().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to resolve cwd for user-data-dir: {err}"))
        })?;
        cwd.join(&cfg.user_data_dir)
    };
    fs::create_dir_all(&profile_dir).map_err(|err| {
        AdapterError::new(AdapterErrorKind::LaunchFailed)
            .with_hint(format!("failed to ensure user-data-dir: {err}"))
    })?;

    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.request_timeout_ms))
        .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms));

    if !cfg.headless {
        builder = builder.with_head();
    }
    if cfg.no_sandbox {
        builder = builder.no_sandbox();
    }

    let mut args: Vec<String> = [
        "--disable-background-timer-throttling",
        "--disable-breakpad",
        "--disable-dev-shm-usage",
        "--disable-popup-blocking",
        "--no-first-run",
        "--no-default-browser-check",
        "--password-store=basic",
        "--use-mock-keychain",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();
    if cfg.headless {
        args.push("--headless=new".to_string());
    }
    args.extend(cfg.extra_args.iter().cloned());
    builder = builder.args(args);

    if let Some(executable) = &cfg.executable {
        builder = builder.chrome_executable(executable.clone());
    }
    builder = builder.user_data_dir(profile_dir);

    builder.build().map_err(|err| {
        AdapterError::new(AdapterErrorKind::LaunchFailed)
            .with_hint(format!("browser config error: {err}"))
    })
}

fn map_cdp_error(err: CdpError) -> AdapterError {
    AdapterError::new(AdapterErrorKind::CdpIo)
        .with_hint(err.to_string())
        .retriable(true)
}

/// [`Page`] over a live chromiumoxide tab.
pub struct ChromiumPage {
    page: chromiumoxide::Page,
    elements: Mutex<HashMap<u64, Arc<Element>>>,
    next_handle: AtomicU64,
}

impl ChromiumPage {
    pub fn new(page: chromiumoxide::Page) -> Self {
        Self {
            page,
            elements: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    fn register(&self, found: Vec<Element>) -> Vec<ElementRef> {
        let mut elements = self.elements.lock();
        found
            .into_iter()
            .map(|element| {
                let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
                elements.insert(id, Arc::new(element));
                ElementRef(id)
            })
            .collect()
    }

    fn lookup(&self, element: ElementRef) -> Result<Arc<Element>, AdapterError> {
        self.elements.lock().get(&element.0).cloned().ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::StaleElement)
                .with_hint(format!("unknown element handle {}", element.0))
                .retriable(true)
        })
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), AdapterError> {
        debug!(target: "cdp-adapter", %url, "navigating");
        self.elements.lock().clear();
        self.page.goto(url).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::Navigation)
                .with_hint(format!("{url}: {err}"))
                .retriable(true)
        })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self
            .page
            .url()
            .await
            .map_err(map_cdp_error)?
            .unwrap_or_default())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>, AdapterError> {
        let found = self.page.find_elements(selector).await.map_err(map_cdp_error)?;
        Ok(self.register(found))
    }

    async fn query_within(
        &self,
        scope: ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, AdapterError> {
        let scope = self.lookup(scope)?;
        let found = scope.find_elements(selector).await.map_err(map_cdp_error)?;
        Ok(self.register(found))
    }

    async fn text(&self, element: ElementRef) -> Result<String, AdapterError> {
        let element = self.lookup(element)?;
        let text = element.inner_text().await.map_err(map_cdp_error)?;
        Ok(collapse_whitespace(&text.unwrap_or_default()))
    }

    async fn attribute(
        &self,
        element: ElementRef,
        name: &str,
    ) -> Result<Option<String>, AdapterError> {
        let element = self.lookup(element)?;
        element.attribute(name).await.map_err(map_cdp_error)
    }

    async fn is_visible(&self, element: ElementRef) -> Result<bool, AdapterError> {
        let element = self.lookup(element)?;
        let returns = element
            .call_js_fn(VISIBILITY_FN, false)
            .await
            .map_err(map_cdp_error)?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    async fn click(&self, element: ElementRef) -> Result<(), AdapterError> {
        let element = self.lookup(element)?;
        if let Err(err) = element.scroll_into_view().await {
            debug!(target: "cdp-adapter", %err, "scroll into view failed");
        }
        match element.click().await {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!(target: "cdp-adapter", %err, "native click failed; dispatching DOM click");
                element
                    .call_js_fn(CLICK_FALLBACK_FN, false)
                    .await
                    .map(|_| ())
                    .map_err(map_cdp_error)
            }
        }
    }

    async fn fill(&self, element: ElementRef, value: &str) -> Result<(), AdapterError> {
        let element = self.lookup(element)?;
        element
            .call_js_fn(CLEAR_INPUT_FN, false)
            .await
            .map_err(map_cdp_error)?;
        element.type_str(value).await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn body_text(&self) -> Result<String, AdapterError> {
        let result = self
            .page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(map_cdp_error)?;
        let text: String = result.into_value().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("body text decode failed: {err}"))
        })?;
        Ok(text)
    }

    async fn cookies(&self) -> Result<Vec<CookieInfo>, AdapterError> {
        let cookies = self.page.get_cookies().await.map_err(map_cdp_error)?;
        Ok(cookies
            .into_iter()
            .map(|cookie| CookieInfo::new(cookie.name, cookie.value, cookie.domain))
            .collect())
    }

    async fn local_storage_keys(&self) -> Result<Vec<String>, AdapterError> {
        let result = self
            .page
            .evaluate("(() => { try { return Object.keys(window.localStorage); } catch (e) { return []; } })()")
            .await
            .map_err(map_cdp_error)?;
        result.into_value().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("localStorage decode failed: {err}"))
        })
    }
}
