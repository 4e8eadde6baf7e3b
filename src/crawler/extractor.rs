//! Pagination extractor
//!
//! Walks one manufacturer's paginated listing with a leased session:
//!
//! 1. Loading: open the page and wait for a category group
//! 2. Extracting: capture the page, then parse groups in document order,
//!    halting at the first category outside the allow-list
//! 3. Continue: follow the next-page control, if there is a usable one
//!
//! Every failure ends pagination for this manufacturer only.

use crate::config::SiteConfig;
use crate::output::{CaptureStore, RecordSink};
use crate::record::RowParser;
use crate::session::Session;
use crate::state::{PaginationState, StopReason};
use crate::url::manufacturer_id;
use crate::HarvestError;
use std::sync::Arc;
use std::time::Duration;

/// Scrolls to the bottom of the page so the pager is rendered
pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// One (keyword, manufacturer URL) unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerTarget {
    pub keyword: String,
    pub url: String,
}

/// What happened while extracting one manufacturer
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub keyword: String,
    pub manufacturer: String,
    pub url: String,
    pub pages_loaded: u32,
    pub captures: u32,
    pub rows_appended: usize,
    pub rows_failed: usize,
    pub stop: StopReason,
}

pub struct Extractor {
    site: SiteConfig,
    parser: RowParser,
    sink: Arc<dyn RecordSink>,
    captures: Arc<CaptureStore>,
    page_timeout: Duration,
    max_pages: Option<u32>,
}

impl Extractor {
    pub fn new(
        site: &SiteConfig,
        sink: Arc<dyn RecordSink>,
        captures: Arc<CaptureStore>,
        page_timeout: Duration,
        max_pages: Option<u32>,
    ) -> Self {
        Self {
            site: site.clone(),
            parser: RowParser::new(site),
            sink,
            captures,
            page_timeout,
            max_pages,
        }
    }

    /// Runs pagination for `target` to completion
    ///
    /// Never fails: every error becomes the report's stop reason.
    pub async fn run(&self, session: &mut dyn Session, target: &ManufacturerTarget) -> ExtractionReport {
        let mut report = ExtractionReport {
            keyword: target.keyword.clone(),
            manufacturer: manufacturer_id(&target.url, &self.site.manufacturer_param),
            url: target.url.clone(),
            pages_loaded: 0,
            captures: 0,
            rows_appended: 0,
            rows_failed: 0,
            stop: StopReason::Unexpected,
        };

        let mut state = PaginationState::start();
        loop {
            let next = match &state {
                PaginationState::Loading { page } => {
                    self.load(session, target, *page, &mut report).await
                }
                PaginationState::Extracting { page } => {
                    self.extract(session, target, *page, &mut report).await
                }
                PaginationState::Continue { page } => self.advance(session, *page).await,
                PaginationState::Stop(reason) => {
                    report.stop = reason.clone();
                    break;
                }
            };

            state = match transition(state, next) {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("{} while extracting {}", e, target.url);
                    PaginationState::Stop(StopReason::Unexpected)
                }
            };
        }

        if report.stop.is_failure() {
            tracing::warn!(
                "Stopped {} ({}) after {} page(s): {}",
                report.manufacturer,
                report.keyword,
                report.pages_loaded,
                report.stop
            );
        } else {
            tracing::info!(
                "Finished {} ({}): {} page(s), {} row(s), {}",
                report.manufacturer,
                report.keyword,
                report.pages_loaded,
                report.rows_appended,
                report.stop
            );
        }
        report
    }

    async fn load(
        &self,
        session: &mut dyn Session,
        target: &ManufacturerTarget,
        page: u32,
        report: &mut ExtractionReport,
    ) -> PaginationState {
        // later pages are reached by clicking, not navigating
        if page == 1 {
            tracing::info!("Navigating to manufacturer page: {}", target.url);
            if let Err(e) = session.navigate(&target.url).await {
                tracing::warn!("Failed to load {}: {}", target.url, e);
                return PaginationState::Stop(StopReason::NavigationFailed);
            }
        }

        match session
            .wait_until_present(&self.site.selectors.group, self.page_timeout)
            .await
        {
            Ok(()) => {
                report.pages_loaded += 1;
                PaginationState::Extracting { page }
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(
                    "Page {} of {} did not load within {:?}",
                    page,
                    target.url,
                    self.page_timeout
                );
                PaginationState::Stop(StopReason::LoadTimeout)
            }
            Err(e) => {
                tracing::warn!("Failed waiting for page {} of {}: {}", page, target.url, e);
                PaginationState::Stop(StopReason::Unexpected)
            }
        }
    }

    async fn extract(
        &self,
        session: &mut dyn Session,
        target: &ManufacturerTarget,
        page: u32,
        report: &mut ExtractionReport,
    ) -> PaginationState {
        let current_url = session.current_url();
        tracing::info!("Scraping data from {}", current_url);

        let manufacturer = manufacturer_id(&current_url, &self.site.manufacturer_param);
        match self
            .captures
            .capture(session, &target.keyword, &manufacturer, page)
            .await
        {
            Ok(_) => report.captures += 1,
            Err(e) => tracing::warn!("Failed to capture page {} of {}: {}", page, current_url, e),
        }

        let groups = match session.find_all(&self.site.selectors.group).await {
            Ok(groups) => groups,
            Err(e) => {
                tracing::error!("Failed to read category groups on {}: {}", current_url, e);
                return PaginationState::Stop(StopReason::Unexpected);
            }
        };
        tracing::debug!("Found {} group(s) on page {}", groups.len(), page);

        for group in &groups {
            let category = match group.find(&self.site.selectors.group_title) {
                Ok(Some(title)) => title.text(),
                Ok(None) => {
                    tracing::warn!("Skipping category group without a title on {}", current_url);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Error processing group on {}: {}", current_url, e);
                    continue;
                }
            };

            if !self.site.is_allowed_category(&category) {
                tracing::warn!(
                    "Aborting scraping for category: {}. Only specific categories are needed.",
                    category
                );
                return PaginationState::Stop(StopReason::CategoryHalt { category });
            }
            tracing::debug!("Processing {}'s category: {}", target.keyword, category);

            let rows = match group.find_all(&self.site.selectors.row) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(
                        "Error processing group in {}'s category '{}': {}",
                        target.keyword,
                        category,
                        e
                    );
                    continue;
                }
            };

            for row in &rows {
                let record = self.parser.parse(row, &category, &target.keyword);
                match self.sink.append(&record) {
                    Ok(()) => report.rows_appended += 1,
                    Err(e) => {
                        report.rows_failed += 1;
                        tracing::warn!(
                            "Failed to write row in {}'s category '{}': {}",
                            target.keyword,
                            category,
                            e
                        );
                    }
                }
            }
        }

        if self.max_pages.map_or(false, |max| page >= max) {
            tracing::info!("Reached the page limit on {}", current_url);
            return PaginationState::Stop(StopReason::PageLimit);
        }
        PaginationState::Continue { page }
    }

    async fn advance(&self, session: &mut dyn Session, page: u32) -> PaginationState {
        let selectors = &self.site.selectors;
        let control = match session.find_one(&selectors.next_page).await {
            Ok(Some(control)) => control,
            Ok(None) => {
                tracing::info!("Next page button not found. Ending pagination.");
                return PaginationState::Stop(StopReason::NoNextPage);
            }
            Err(e) => {
                tracing::error!("Error checking next page button: {}", e);
                return PaginationState::Stop(StopReason::NextPageFailed);
            }
        };

        if control.class_contains(&selectors.disabled_class) {
            tracing::info!("No more pages to scrape.");
            return PaginationState::Stop(StopReason::NextPageDisabled);
        }

        let Some(next_page) = page.checked_add(1) else {
            tracing::warn!("Page counter exhausted at page {}. Ending pagination.", page);
            return PaginationState::Stop(StopReason::PageLimit);
        };

        if let Err(e) = session.run_script(SCROLL_TO_BOTTOM).await {
            tracing::error!("Error scrolling to next page button: {}", e);
            return PaginationState::Stop(StopReason::NextPageFailed);
        }
        if let Err(e) = session.click(&control).await {
            tracing::error!("Error clicking next page button: {}", e);
            return PaginationState::Stop(StopReason::NextPageFailed);
        }

        PaginationState::Loading { page: next_page }
    }
}

fn transition(from: PaginationState, to: PaginationState) -> Result<PaginationState, HarvestError> {
    if from.can_transition_to(&to) {
        Ok(to)
    } else {
        Err(HarvestError::InvalidTransition { from, to })
    }
}
