//! In-memory session serving canned pages, for unit tests

use crate::session::{Element, PageSnapshot, Session, SessionError, SessionResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub(crate) struct FakeSession {
    id: usize,
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    panic_on: Option<String>,
    page: Option<PageSnapshot>,
    pub visits: Vec<String>,
    pub scripts: Vec<String>,
    pub closed: bool,
}

impl FakeSession {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            pages: HashMap::new(),
            redirects: HashMap::new(),
            panic_on: None,
            page: None,
            visits: Vec::new(),
            scripts: Vec::new(),
            closed: false,
        }
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Makes `navigate` panic when it reaches `url`
    pub fn panicking_on(mut self, url: &str) -> Self {
        self.panic_on = Some(url.to_string());
        self
    }

    fn loaded(&self) -> SessionResult<&PageSnapshot> {
        if self.closed {
            return Err(SessionError::Closed(self.id));
        }
        self.page.as_ref().ok_or(SessionError::NoPage)
    }
}

#[async_trait]
impl Session for FakeSession {
    fn id(&self) -> usize {
        self.id
    }

    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Closed(self.id));
        }
        let target = self.redirects.get(url).cloned().unwrap_or_else(|| url.to_string());
        self.visits.push(target.clone());
        if self.panic_on.as_deref() == Some(target.as_str()) {
            panic!("session {} crashed loading {}", self.id, target);
        }
        match self.pages.get(&target) {
            Some(html) => {
                self.page = Some(PageSnapshot::new(target, html.clone()));
                Ok(())
            }
            None => Err(SessionError::Status {
                url: target,
                status: 404,
            }),
        }
    }

    fn current_url(&self) -> String {
        self.page
            .as_ref()
            .map(|page| page.url().to_string())
            .unwrap_or_default()
    }

    async fn wait_until_present(&mut self, selector: &str, timeout: Duration) -> SessionResult<()> {
        if self.loaded()?.contains(selector)? {
            Ok(())
        } else {
            Err(SessionError::Timeout {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    async fn find_one(&self, selector: &str) -> SessionResult<Option<Element>> {
        self.loaded()?.find_one(selector)
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>> {
        self.loaded()?.find_all(selector)
    }

    async fn click(&mut self, element: &Element) -> SessionResult<()> {
        let href = match element.attr("href") {
            Some(href) => Some(href),
            None => element.find("a[href]")?.and_then(|a| a.attr("href")),
        }
        .ok_or_else(|| SessionError::Unsupported("nothing to click".to_string()))?;

        let base = Url::parse(self.loaded()?.url()).map_err(|e| SessionError::Navigation {
            url: self.current_url(),
            message: e.to_string(),
        })?;
        let target = crate::url::resolve_link(&href, &base)
            .ok_or_else(|| SessionError::Unsupported(href.clone()))?;
        self.navigate(&target).await
    }

    async fn screenshot(&mut self, path: &Path) -> SessionResult<()> {
        let html = self.loaded()?.html().to_string();
        tokio::fs::write(path, html).await?;
        Ok(())
    }

    async fn run_script(&mut self, script: &str) -> SessionResult<()> {
        self.scripts.push(script.to_string());
        Ok(())
    }

    fn capture_extension(&self) -> &'static str {
        "html"
    }

    async fn quit(&mut self) -> SessionResult<()> {
        self.closed = true;
        Ok(())
    }
}
