//! Headless Chrome session
//!
//! `ChromeSession` drives the catalog in a real browser over the DevTools
//! protocol, so page scripts run, postback pagers work and captures are PNG
//! screenshots. headless_chrome is a blocking API, so every browser call runs
//! on tokio's blocking pool.

use crate::config::{BrowserConfig, UserAgentConfig};
use crate::session::http::user_agent_string;
use crate::session::{Element, PageSnapshot, Session, SessionError, SessionResult};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Attribute put on a clicked control; it is gone once the page replaces the control
const STALE_MARKER: &str = "data-harvest-stale";

/// Keeps the DevTools connection open through long waits between calls
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

/// Maps the browser configuration onto Chrome launch options
pub fn launch_options(config: &BrowserConfig) -> SessionResult<LaunchOptions<'static>> {
    LaunchOptions::default_builder()
        .headless(config.headless)
        .sandbox(config.sandbox)
        .window_size(Some((config.window_width, config.window_height)))
        .path(config.chrome_path.as_ref().map(PathBuf::from))
        .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
        .build()
        .map_err(|e| SessionError::Browser(format!("invalid launch options: {}", e)))
}

fn browser_error(context: &str, e: impl std::fmt::Display) -> SessionError {
    SessionError::Browser(format!("{}: {}", context, e))
}

/// Runs a blocking tab operation off the async runtime
async fn on_tab<T, F>(tab: Arc<Tab>, f: F) -> SessionResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Tab) -> SessionResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&tab))
        .await
        .map_err(|e| browser_error("browser task failed", e))?
}

/// A pooled session backed by one headless Chrome process with one tab
pub struct ChromeSession {
    id: usize,
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
    navigated: bool,
    navigation_timeout: Duration,
    poll_interval: Duration,
}

impl ChromeSession {
    /// Launches Chrome and opens the session's tab
    ///
    /// Blocks until the browser is up; call it during setup, before any
    /// harvesting starts.
    ///
    /// # Arguments
    ///
    /// * `id` - Session identifier used in logs
    /// * `config` - Launch settings (binary, headless, sandbox, window size)
    /// * `user_agent` - Identity announced on every request
    /// * `navigation_timeout` - Upper bound for a page load or a click's page update
    /// * `poll_interval` - Delay between readiness checks while waiting
    pub fn launch(
        id: usize,
        config: &BrowserConfig,
        user_agent: &UserAgentConfig,
        navigation_timeout: Duration,
        poll_interval: Duration,
    ) -> SessionResult<Self> {
        let options = launch_options(config)?;
        let browser =
            Browser::new(options).map_err(|e| browser_error("failed to launch Chrome", e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| browser_error("failed to open a tab", e))?;
        tab.set_default_timeout(navigation_timeout);
        tab.set_user_agent(&user_agent_string(user_agent), None, None)
            .map_err(|e| browser_error("failed to set the user agent", e))?;

        tracing::debug!("Session {} launched Chrome", id);
        Ok(Self {
            id,
            browser: Some(browser),
            tab: Some(tab),
            navigated: false,
            navigation_timeout,
            poll_interval,
        })
    }

    fn tab(&self) -> SessionResult<Arc<Tab>> {
        self.tab.clone().ok_or(SessionError::Closed(self.id))
    }

    async fn snapshot(&self) -> SessionResult<PageSnapshot> {
        if !self.navigated {
            self.tab()?;
            return Err(SessionError::NoPage);
        }
        on_tab(self.tab()?, |tab| {
            let html = tab
                .get_content()
                .map_err(|e| browser_error("failed to read the page", e))?;
            Ok(PageSnapshot::new(tab.get_url(), html))
        })
        .await
    }

    /// Polls the page until `done` holds for a snapshot or `timeout` elapses
    ///
    /// Snapshots that fail while a document is being replaced count as not ready.
    async fn poll_until<F>(&self, label: &str, timeout: Duration, done: F) -> SessionResult<()>
    where
        F: Fn(&PageSnapshot) -> SessionResult<bool>,
    {
        let deadline = Instant::now() + timeout;

        loop {
            match self.snapshot().await {
                Ok(page) => {
                    if done(&page)? {
                        return Ok(());
                    }
                }
                Err(e @ (SessionError::Closed(_) | SessionError::NoPage)) => return Err(e),
                Err(e) => tracing::debug!("Session {} page not readable yet: {}", self.id, e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::Timeout {
                    selector: label.to_string(),
                    timeout,
                });
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

#[async_trait]
impl Session for ChromeSession {
    fn id(&self) -> usize {
        self.id
    }

    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        let tab = self.tab()?;
        Url::parse(url).map_err(|e| SessionError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!("Session {} navigating to {}", self.id, url);
        let target = url.to_string();
        let landed = on_tab(tab, move |tab| {
            let failed = |e: anyhow::Error| SessionError::Navigation {
                url: target.clone(),
                message: e.to_string(),
            };
            tab.navigate_to(&target).map_err(failed)?;
            tab.wait_until_navigated().map_err(failed)?;
            Ok(tab.get_url())
        })
        .await?;

        self.navigated = true;
        if landed != url {
            tracing::debug!("Session {} redirected to {}", self.id, landed);
        }
        Ok(())
    }

    fn current_url(&self) -> String {
        match &self.tab {
            Some(tab) if self.navigated => tab.get_url(),
            _ => String::new(),
        }
    }

    async fn wait_until_present(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> SessionResult<()> {
        self.poll_until(selector, timeout, |page| page.contains(selector))
            .await
    }

    async fn find_one(&self, selector: &str) -> SessionResult<Option<Element>> {
        self.snapshot().await?.find_one(selector)
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>> {
        self.snapshot().await?.find_all(selector)
    }

    /// Clicks the live node behind `element` and waits for the page to replace it
    ///
    /// The node is marked before the click. A new document or a re-rendered
    /// control both drop the mark, which covers link pagers and script
    /// postbacks alike.
    async fn click(&mut self, element: &Element) -> SessionResult<()> {
        let locator = element.locator().cloned().ok_or_else(|| {
            SessionError::Unsupported("only elements found by a page query can be clicked".to_string())
        })?;

        tracing::debug!(
            "Session {} clicking '{}' match {}",
            self.id,
            locator.selector,
            locator.index
        );
        on_tab(self.tab()?, move |tab| {
            let nodes = tab
                .find_elements(&locator.selector)
                .map_err(|e| browser_error("control is no longer on the page", e))?;
            let node = nodes.get(locator.index).ok_or_else(|| {
                SessionError::Browser(format!(
                    "'{}' match {} is no longer on the page",
                    locator.selector, locator.index
                ))
            })?;
            node.call_js_fn(
                &format!("function() {{ this.setAttribute('{}', '1'); }}", STALE_MARKER),
                vec![],
                false,
            )
            .map_err(|e| browser_error("failed to mark the control", e))?;
            node.click()
                .map_err(|e| browser_error("click failed", e))?;
            Ok(())
        })
        .await?;

        let marker = format!("[{}]", STALE_MARKER);
        self.poll_until(&marker, self.navigation_timeout, |page| {
            Ok(!page.contains(&marker)?)
        })
        .await
    }

    async fn screenshot(&mut self, path: &Path) -> SessionResult<()> {
        let png = on_tab(self.tab()?, |tab| {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(|e| browser_error("screenshot failed", e))
        })
        .await?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }

    async fn run_script(&mut self, script: &str) -> SessionResult<()> {
        let script = script.to_string();
        on_tab(self.tab()?, move |tab| {
            tab.evaluate(&script, false)
                .map_err(|e| browser_error("script failed", e))?;
            Ok(())
        })
        .await
    }

    async fn quit(&mut self) -> SessionResult<()> {
        let tab = self.tab.take();
        let browser = self.browser.take();
        self.navigated = false;

        if let Some(tab) = tab {
            // Dropping the browser waits for the Chrome process to exit
            let closed = tokio::task::spawn_blocking(move || {
                let result = tab.close(false);
                drop(browser);
                result
            })
            .await;
            match closed {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::debug!("Session {} tab close failed: {}", self.id, e),
                Err(e) => tracing::debug!("Session {} shutdown task failed: {}", self.id, e),
            }
            tracing::debug!("Session {} closed Chrome", self.id);
        }
        Ok(())
    }
}
