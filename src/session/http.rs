//! HTTP-backed session implementation
//!
//! `HttpSession` drives the catalog with plain HTTP requests:
//! - navigation follows redirects and keeps the final URL as the current URL
//! - waits poll the page, re-fetching it until the selector appears or time runs out
//! - clicking a control follows the hyperlink it carries
//! - captures are HTML snapshots of the loaded page
//!
//! Script execution is a no-op: there is no viewport to scroll.

use crate::config::UserAgentConfig;
use crate::session::{Element, PageSnapshot, Session, SessionError, SessionResult};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// User agent announced by every session
///
/// Format: CrawlerName/Version (+ContactURL; ContactEmail)
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds the HTTP client shared by all pooled sessions
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Upper bound for a single request
///
/// # Example
///
/// ```no_run
/// use parts_harvester::config::UserAgentConfig;
/// use parts_harvester::session::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "PartsHarvester".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A session that loads pages over HTTP and queries them with CSS selectors
pub struct HttpSession {
    id: usize,
    client: Client,
    page: Option<PageSnapshot>,
    poll_interval: Duration,
    closed: bool,
}

impl HttpSession {
    /// Creates a session; `client` is cheap to clone and may be shared
    pub fn new(id: usize, client: Client, poll_interval: Duration) -> Self {
        Self {
            id,
            client,
            page: None,
            poll_interval,
            closed: false,
        }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Closed(self.id));
        }
        Ok(())
    }

    fn page(&self) -> SessionResult<&PageSnapshot> {
        self.ensure_open()?;
        self.page.as_ref().ok_or(SessionError::NoPage)
    }

    async fn fetch(&self, url: &str) -> SessionResult<PageSnapshot> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| navigation_error(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(SessionError::Status {
                url: final_url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| navigation_error(url, e))?;

        Ok(PageSnapshot::new(final_url, body))
    }
}

fn navigation_error(url: &str, error: reqwest::Error) -> SessionError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else {
        error.to_string()
    };

    SessionError::Navigation {
        url: url.to_string(),
        message,
    }
}

#[async_trait]
impl Session for HttpSession {
    fn id(&self) -> usize {
        self.id
    }

    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.ensure_open()?;
        Url::parse(url).map_err(|e| SessionError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!("Session {} navigating to {}", self.id, url);
        let page = self.fetch(url).await?;
        if page.url() != url {
            tracing::debug!("Session {} redirected to {}", self.id, page.url());
        }
        self.page = Some(page);
        Ok(())
    }

    fn current_url(&self) -> String {
        self.page
            .as_ref()
            .map(|page| page.url().to_string())
            .unwrap_or_default()
    }

    async fn wait_until_present(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> SessionResult<()> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.page()?.contains(selector)? {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(SessionError::Timeout {
                    selector: selector.to_string(),
                    timeout,
                });
            }

            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;

            let url = self.page()?.url().to_string();
            match self.fetch(&url).await {
                Ok(page) => self.page = Some(page),
                Err(e) => tracing::debug!("Reload of {} failed while waiting: {}", url, e),
            }
        }
    }

    async fn find_one(&self, selector: &str) -> SessionResult<Option<Element>> {
        self.page()?.find_one(selector)
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>> {
        self.page()?.find_all(selector)
    }

    async fn click(&mut self, element: &Element) -> SessionResult<()> {
        let href = if element.tag_name().as_deref() == Some("a") {
            element.attr("href")
        } else {
            element.find("a[href]")?.and_then(|link| link.attr("href"))
        };
        let href = href.ok_or_else(|| {
            SessionError::Unsupported("control carries no hyperlink to follow".to_string())
        })?;

        let base = Url::parse(self.page()?.url()).map_err(|e| SessionError::Navigation {
            url: self.current_url(),
            message: e.to_string(),
        })?;
        let target = crate::url::resolve_link(&href, &base).ok_or_else(|| {
            SessionError::Unsupported(format!("cannot follow '{}' without a script engine", href))
        })?;

        self.navigate(&target).await
    }

    async fn screenshot(&mut self, path: &Path) -> SessionResult<()> {
        let html = self.page()?.html().to_string();
        tokio::fs::write(path, html).await?;
        Ok(())
    }

    async fn run_script(&mut self, script: &str) -> SessionResult<()> {
        self.ensure_open()?;
        tracing::trace!("Session {} skipping script: {}", self.id, script);
        Ok(())
    }

    fn capture_extension(&self) -> &'static str {
        "html"
    }

    async fn quit(&mut self) -> SessionResult<()> {
        self.closed = true;
        self.page = None;
        tracing::debug!("Session {} closed", self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn session() -> HttpSession {
        let client = build_http_client(&create_test_config(), Duration::from_secs(5)).unwrap();
        HttpSession::new(7, client, Duration::from_millis(10))
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config(), Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_queries_before_navigation_fail() {
        let session = session();
        assert_eq!(session.current_url(), "");
        assert!(matches!(
            session.find_all("div").await,
            Err(SessionError::NoPage)
        ));
    }

    #[tokio::test]
    async fn test_navigate_rejects_malformed_url() {
        let mut session = session();
        let err = session.navigate("not a url").await.unwrap_err();
        assert!(matches!(err, SessionError::Navigation { .. }));
    }

    #[tokio::test]
    async fn test_quit_closes_session() {
        let mut session = session();
        session.quit().await.unwrap();
        assert!(matches!(
            session.navigate("https://example.com/").await,
            Err(SessionError::Closed(7))
        ));
        assert!(matches!(
            session.run_script("window.scrollTo(0, 0);").await,
            Err(SessionError::Closed(7))
        ));
    }

    // Navigation, waiting and clicking against a live server are covered by
    // the wiremock tests under tests/integration
}
