//! Owned DOM snapshots
//!
//! `scraper::Html` is neither `Send` nor `Sync`, so nothing borrowed from a
//! parsed document may live across an await point. Sessions hand out
//! `Element`s instead: the element's outer HTML, re-parsed on demand. Queries
//! on an element only ever see its own subtree, which is exactly the scoping
//! the row and group lookups need.
//!
//! Elements found by a page-level query also remember where they came from
//! (`Locator`), so a live browser can find the same node again to click it.

use crate::session::{SessionError, SessionResult};
use scraper::{ElementRef, Html, Selector};

/// Parses a CSS selector, mapping failures into a `SessionError`
pub(crate) fn parse_selector(selector: &str) -> SessionResult<Selector> {
    Selector::parse(selector).map_err(|e| SessionError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Collapses runs of whitespace and trims, approximating rendered text
fn normalize_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Position of an element among a page-level selector's matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector: String,
    pub index: usize,
}

/// An element detached from the page it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    html: String,
    locator: Option<Locator>,
}

impl Element {
    /// Wraps a fragment whose first top-level element is the element itself
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            locator: None,
        }
    }

    pub(crate) fn from_ref(element: ElementRef<'_>) -> Self {
        Self {
            html: element.html(),
            locator: None,
        }
    }

    fn located(element: ElementRef<'_>, selector: &str, index: usize) -> Self {
        Self {
            html: element.html(),
            locator: Some(Locator {
                selector: selector.to_string(),
                index,
            }),
        }
    }

    pub fn outer_html(&self) -> &str {
        &self.html
    }

    /// Where a page-level query found this element; None for nested lookups
    pub fn locator(&self) -> Option<&Locator> {
        self.locator.as_ref()
    }

    fn with_root<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> Option<T> {
        let fragment = Html::parse_fragment(&self.html);
        let root = fragment
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .next()?;
        Some(f(root))
    }

    /// Lowercase tag name
    pub fn tag_name(&self) -> Option<String> {
        self.with_root(|root| root.value().name().to_string())
    }

    /// Trimmed, whitespace-collapsed text content
    pub fn text(&self) -> String {
        self.with_root(|root| normalize_text(root.text()))
            .unwrap_or_default()
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.with_root(|root| root.value().attr(name).map(str::to_string))
            .flatten()
    }

    /// True if the `class` attribute contains `fragment` anywhere
    pub fn class_contains(&self, fragment: &str) -> bool {
        self.attr("class")
            .map(|class| class.contains(fragment))
            .unwrap_or(false)
    }

    /// First descendant matching `selector`
    pub fn find(&self, selector: &str) -> SessionResult<Option<Element>> {
        let selector = parse_selector(selector)?;
        Ok(self
            .with_root(|root| root.select(&selector).next().map(Element::from_ref))
            .flatten())
    }

    /// All descendants matching `selector`, in document order
    pub fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>> {
        let selector = parse_selector(selector)?;
        Ok(self
            .with_root(|root| root.select(&selector).map(Element::from_ref).collect())
            .unwrap_or_default())
    }
}

/// A loaded page: the URL it was served from and its HTML
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    url: String,
    html: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn contains(&self, selector: &str) -> SessionResult<bool> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let found = document.select(&selector).next().is_some();
        Ok(found)
    }

    pub fn find_one(&self, selector: &str) -> SessionResult<Option<Element>> {
        let parsed = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let found = document
            .select(&parsed)
            .next()
            .map(|element| Element::located(element, selector, 0));
        Ok(found)
    }

    pub fn find_all(&self, selector: &str) -> SessionResult<Vec<Element>> {
        let parsed = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let found = document
            .select(&parsed)
            .enumerate()
            .map(|(index, element)| Element::located(element, selector, index))
            .collect();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <div class="table__rows-group">
                <div class="table__rows-title"> Own stock   warehouses </div>
                <div class="table__rows-list">
                    <div class="table__row"><span>first</span></div>
                    <div class="table__row"><span>second</span></div>
                </div>
            </div>
            <ul><li class="page-next disabled"><a href="/p?page=2">Next</a></li></ul>
        </body></html>
    "#;

    fn page() -> PageSnapshot {
        PageSnapshot::new("https://example.com/p", PAGE)
    }

    #[test]
    fn test_contains() {
        assert!(page().contains("div.table__rows-group").unwrap());
        assert!(!page().contains("div.missing").unwrap());
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let err = page().find_all("div[[").unwrap_err();
        assert!(matches!(err, SessionError::InvalidSelector { .. }));
    }

    #[test]
    fn test_text_is_trimmed_and_collapsed() {
        let title = page().find_one("div.table__rows-title").unwrap().unwrap();
        assert_eq!(title.text(), "Own stock warehouses");
    }

    #[test]
    fn test_nested_queries_are_scoped_to_the_element() {
        let group = page().find_one("div.table__rows-group").unwrap().unwrap();
        let rows = group
            .find_all("div.table__rows-list > div.table__row")
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].text(), "second");

        // the pagination control lives outside the group
        assert!(group.find("li.page-next").unwrap().is_none());
    }

    #[test]
    fn test_attributes_and_classes() {
        let next = page().find_one("li.page-next").unwrap().unwrap();
        assert_eq!(next.tag_name().as_deref(), Some("li"));
        assert!(next.class_contains("disabled"));
        assert!(!next.class_contains("active"));

        let link = next.find("a").unwrap().unwrap();
        assert_eq!(link.attr("href").as_deref(), Some("/p?page=2"));
        assert_eq!(link.attr("title"), None);
    }

    #[test]
    fn test_page_queries_record_locators() {
        let rows = page().find_all("div.table__row").unwrap();
        assert_eq!(
            rows[1].locator(),
            Some(&Locator {
                selector: "div.table__row".to_string(),
                index: 1
            })
        );

        let next = page().find_one("li.page-next").unwrap().unwrap();
        assert_eq!(next.locator().map(|l| l.index), Some(0));

        // nested lookups cannot be replayed against the live page
        assert!(next.find("a").unwrap().unwrap().locator().is_none());
        assert!(Element::from_html("<a></a>").locator().is_none());
    }

    #[test]
    fn test_nth_of_type_within_row() {
        let row = Element::from_html(
            r#"<div class="table__row">
                <div class="table__row-element"><div>BOSCH</div></div>
                <div class="table__row-element"><div>0 986 494 104</div></div>
            </div>"#,
        );
        let cell = row
            .find("div.table__row-element:nth-of-type(2) > div")
            .unwrap()
            .unwrap();
        assert_eq!(cell.text(), "0 986 494 104");
    }
}
