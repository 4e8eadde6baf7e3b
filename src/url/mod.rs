//! URL handling module for Parts-Harvester
//!
//! This module provides search URL construction, link resolution against the
//! site origin, manufacturer identifier extraction, and the pluggable rule
//! that recognizes a single-match redirect.

mod redirect;
mod search;

pub use redirect::{MarkerRedirect, RedirectRule};
pub use search::build_search_url;

use url::Url;

/// Identifier used when a manufacturer URL carries no identifier parameter
pub const UNKNOWN_MANUFACTURER: &str = "unknown";

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Extracts the manufacturer identifier from a manufacturer page URL
///
/// The identifier is the first non-empty value of the `param` query
/// parameter; anything else yields [`UNKNOWN_MANUFACTURER`].
///
/// # Examples
///
/// ```
/// use parts_harvester::url::manufacturer_id;
///
/// let url = "https://apecauto.com/searchspareparts/?number=0986494104&mfr=BOSCH";
/// assert_eq!(manufacturer_id(url, "mfr"), "BOSCH");
/// assert_eq!(manufacturer_id("https://apecauto.com/", "mfr"), "unknown");
/// ```
pub fn manufacturer_id(url: &str, param: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .query_pairs()
                .find(|(key, value)| key == param && !value.is_empty())
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_else(|| UNKNOWN_MANUFACTURER.to_string())
}
