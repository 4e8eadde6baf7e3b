//! Output module for harvest results
//!
//! This module handles:
//! - Writing part records into the tabular artifact
//! - Retrying the final write while the artifact is locked
//! - Storing per-page captures
//! - Recording run statistics and markdown summaries

mod capture;
mod markdown;
mod retry;
pub mod stats;
mod table;
mod traits;

pub use capture::{capture_file_name, create_subfolder, CaptureStore};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use retry::{MaxAttempts, OperatorPrompt, RetryDecision, RetryPolicy};
pub use stats::{print_statistics, RunStatistics};
pub use table::TableSink;
pub use traits::{OutputError, OutputResult, RecordSink};

use crate::config::OutputConfig;
use std::time::Duration;

/// Delay between bounded finalize attempts
pub const FINALIZE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Chooses the finalize retry policy for a configuration
///
/// A configured attempt limit gives `MaxAttempts`; otherwise the operator is
/// prompted before every retry.
pub fn retry_policy_for(config: &OutputConfig) -> Box<dyn RetryPolicy> {
    match config.finalize_max_attempts {
        Some(max) => Box::new(MaxAttempts::new(max, FINALIZE_RETRY_DELAY)),
        None => Box::new(OperatorPrompt::new()),
    }
}
