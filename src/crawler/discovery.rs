//! Manufacturer discovery
//!
//! Runs one catalog search per keyword and classifies the result page:
//! - the no-results marker carries the sentinel text: no manufacturers
//! - the search redirected to a manufacturer page: that page alone
//! - otherwise a listing: every listed manufacturer link
//!
//! Discovery for one keyword never aborts discovery for the others.

use crate::config::SiteConfig;
use crate::session::{Session, SessionResult};
use crate::url::{build_search_url, resolve_link, MarkerRedirect, RedirectRule};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Manufacturer URLs found for one keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub keyword: String,
    pub urls: Vec<String>,
}

pub struct Discovery {
    site: SiteConfig,
    base_url: Url,
    rule: Arc<dyn RedirectRule>,
    timeout: Duration,
}

impl Discovery {
    /// Creates discovery with the site's marker-based redirect rule
    pub fn new(site: &SiteConfig, timeout: Duration) -> Result<Self> {
        let rule = Arc::new(MarkerRedirect::new(site.redirect_marker.clone()));
        Self::with_rule(site, rule, timeout)
    }

    pub fn with_rule(
        site: &SiteConfig,
        rule: Arc<dyn RedirectRule>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(&site.base_url)?,
            site: site.clone(),
            rule,
            timeout,
        })
    }

    /// Selector list matching any of the three possible result pages
    fn any_result_selector(&self) -> String {
        let selectors = &self.site.selectors;
        format!(
            "{}, {}, {}",
            selectors.listing_link, selectors.no_results, selectors.group
        )
    }

    async fn try_discover(&self, session: &mut dyn Session, keyword: &str) -> SessionResult<Vec<String>> {
        let search_url = build_search_url(&self.site.search_url, keyword);
        tracing::info!(
            "Searching for manufacturers for keyword '{}' at {}",
            keyword,
            search_url
        );

        session.navigate(&search_url).await?;
        session
            .wait_until_present(&self.any_result_selector(), self.timeout)
            .await?;

        if let Some(marker) = session.find_one(&self.site.selectors.no_results).await? {
            if marker.text() == self.site.no_results_text {
                tracing::warn!("No results found for keyword '{}'", keyword);
                return Ok(Vec::new());
            }
        }

        let landed = session.current_url();
        if self.rule.is_manufacturer_page(&search_url, &landed) {
            tracing::info!("Redirected to manufacturer page: {}", landed);
            return Ok(vec![landed]);
        }

        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for link in session.find_all(&self.site.selectors.listing_link).await? {
            let Some(href) = link.attr("href") else {
                continue;
            };
            match resolve_link(&href, &self.base_url) {
                Some(url) => {
                    if seen.insert(url.clone()) {
                        tracing::debug!("Found manufacturer link: {}", url);
                        urls.push(url);
                    }
                }
                None => tracing::debug!("Skipping listing link '{}'", href),
            }
        }
        Ok(urls)
    }

    /// Discovers the manufacturer URLs for one keyword
    ///
    /// Failures are logged and yield no URLs.
    pub async fn discover(&self, session: &mut dyn Session, keyword: &str) -> Vec<String> {
        match self.try_discover(session, keyword).await {
            Ok(urls) => {
                tracing::info!("Keyword '{}': {} manufacturer(s)", keyword, urls.len());
                urls
            }
            Err(e) => {
                tracing::error!(
                    "Error extracting manufacturer links for keyword '{}': {}",
                    keyword,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Discovers every keyword in order, one search at a time
    pub async fn discover_all(
        &self,
        session: &mut dyn Session,
        keywords: &[String],
    ) -> Vec<DiscoveryOutcome> {
        let mut outcomes = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let urls = self.discover(session, keyword).await;
            outcomes.push(DiscoveryOutcome {
                keyword: keyword.clone(),
                urls,
            });
        }
        outcomes
    }
}
