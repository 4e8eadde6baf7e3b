//! Run statistics
//!
//! This module accumulates what a harvest run did and prints it at the end.

use crate::crawler::ExtractionReport;
use crate::state::StopReason;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Harvest run statistics
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Hash of the configuration that produced the run
    pub config_hash: Option<String>,

    pub keywords_searched: usize,
    pub manufacturers_discovered: usize,
    pub manufacturers_processed: usize,

    pub pages_loaded: u64,
    pub captures: u64,
    pub rows_written: u64,
    pub rows_failed: u64,

    /// Manufacturers whose pagination ended on a timeout or navigation failure
    pub load_failures: u64,

    /// Worker tasks that failed or panicked
    pub task_failures: u64,

    /// Stop reason label -> manufacturers
    pub stop_reasons: BTreeMap<&'static str, u64>,

    /// Where the artifact was written, once finalized
    pub artifact: Option<PathBuf>,
}

impl RunStatistics {
    /// Starts the clock for a new run
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            config_hash: None,
            keywords_searched: 0,
            manufacturers_discovered: 0,
            manufacturers_processed: 0,
            pages_loaded: 0,
            captures: 0,
            rows_written: 0,
            rows_failed: 0,
            load_failures: 0,
            task_failures: 0,
            stop_reasons: BTreeMap::new(),
            artifact: None,
        }
    }

    /// Folds one manufacturer's extraction into the totals
    pub fn record_extraction(&mut self, report: &ExtractionReport) {
        self.manufacturers_processed += 1;
        self.pages_loaded += u64::from(report.pages_loaded);
        self.captures += u64::from(report.captures);
        self.rows_written += report.rows_appended as u64;
        self.rows_failed += report.rows_failed as u64;

        if matches!(
            report.stop,
            StopReason::LoadTimeout | StopReason::NavigationFailed
        ) {
            self.load_failures += 1;
        }
        *self.stop_reasons.entry(report.stop.label()).or_insert(0) += 1;
    }

    pub fn record_task_failure(&mut self) {
        self.task_failures += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Keywords searched: {}", stats.keywords_searched);
    println!(
        "  Manufacturers: {} discovered, {} processed",
        stats.manufacturers_discovered, stats.manufacturers_processed
    );
    println!("  Pages loaded: {}", stats.pages_loaded);
    println!("  Captures written: {}", stats.captures);
    println!("  Rows written: {}", stats.rows_written);
    if let Some(duration) = stats.duration_seconds() {
        println!("  Duration: {} seconds", duration);
    }
    println!();

    if !stats.stop_reasons.is_empty() {
        println!("Pagination Stops:");
        // Sort reasons by count (descending)
        let mut reasons: Vec<_> = stats.stop_reasons.iter().collect();
        reasons.sort_by(|a, b| b.1.cmp(a.1));

        for (reason, count) in reasons {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    if stats.rows_failed > 0 || stats.load_failures > 0 || stats.task_failures > 0 {
        println!("Failures:");
        println!("  Rows not written: {}", stats.rows_failed);
        println!("  Page load failures: {}", stats.load_failures);
        println!("  Task failures: {}", stats.task_failures);
        println!();
    }

    match &stats.artifact {
        Some(path) => println!("Artifact: {}", path.display()),
        None => println!("Artifact: not written"),
    }
}
