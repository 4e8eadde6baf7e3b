//! Crawler module for catalog harvesting
//!
//! This module contains the core harvesting logic, including:
//! - Manufacturer discovery for each search keyword
//! - The per-manufacturer pagination extractor
//! - Overall harvest coordination across a bounded worker pool

mod coordinator;
mod discovery;
mod extractor;

pub use coordinator::{normalize_keywords, run_harvest, Coordinator};
pub use discovery::{Discovery, DiscoveryOutcome};
pub use extractor::{ExtractionReport, Extractor, ManufacturerTarget, SCROLL_TO_BOTTOM};
