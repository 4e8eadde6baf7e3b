//! Single-match redirect detection
//!
//! When a search matches exactly one manufacturer the catalog skips the
//! listing and redirects straight to that manufacturer's page. How to tell
//! the two apart is site-specific, so discovery asks a `RedirectRule`.

use url::Url;

/// Decides whether a search landed directly on a manufacturer page
pub trait RedirectRule: Send + Sync {
    /// `search_url` is the URL discovery navigated to, `landed_url` the page it ended on
    fn is_manufacturer_page(&self, search_url: &str, landed_url: &str) -> bool;
}

impl<F> RedirectRule for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn is_manufacturer_page(&self, search_url: &str, landed_url: &str) -> bool {
        self(search_url, landed_url)
    }
}

/// Matches when the browser moved away from the search URL to a URL containing a marker
#[derive(Debug, Clone)]
pub struct MarkerRedirect {
    marker: String,
}

impl MarkerRedirect {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl RedirectRule for MarkerRedirect {
    fn is_manufacturer_page(&self, search_url: &str, landed_url: &str) -> bool {
        !same_url(search_url, landed_url) && landed_url.contains(&self.marker)
    }
}

fn same_url(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
