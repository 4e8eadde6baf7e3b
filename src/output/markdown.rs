//! Markdown summary generation
//!
//! This module renders run statistics as a human-readable markdown report.

use crate::output::stats::RunStatistics;
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a run
///
/// # Arguments
///
/// * `stats` - The run statistics
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(stats: &RunStatistics, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(stats);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats run statistics as markdown
pub fn format_markdown_summary(stats: &RunStatistics) -> String {
    let mut md = String::new();

    md.push_str("# Parts Harvest Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", stats.started_at.to_rfc3339()));
    if let Some(finished) = &stats.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = stats.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    if let Some(hash) = &stats.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    match &stats.artifact {
        Some(path) => md.push_str(&format!("- **Artifact**: {}\n\n", path.display())),
        None => md.push_str("- **Artifact**: not written\n\n"),
    }

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Keywords Searched**: {}\n",
        stats.keywords_searched
    ));
    md.push_str(&format!(
        "- **Manufacturers Discovered**: {}\n",
        stats.manufacturers_discovered
    ));
    md.push_str(&format!(
        "- **Manufacturers Processed**: {}\n",
        stats.manufacturers_processed
    ));
    md.push_str(&format!("- **Pages Loaded**: {}\n", stats.pages_loaded));
    md.push_str(&format!("- **Captures**: {}\n", stats.captures));
    md.push_str(&format!("- **Rows Written**: {}\n\n", stats.rows_written));

    // Stop reasons
    if !stats.stop_reasons.is_empty() {
        md.push_str("## Pagination Stops\n\n");
        md.push_str("| Reason | Manufacturers |\n");
        md.push_str("|--------|---------------|\n");

        for (reason, count) in &stats.stop_reasons {
            md.push_str(&format!("| {} | {} |\n", reason, count));
        }
        md.push('\n');
    }

    // Failures
    md.push_str("## Failures\n\n");
    md.push_str("| Kind | Count |\n");
    md.push_str("|------|-------|\n");
    md.push_str(&format!("| Rows not written | {} |\n", stats.rows_failed));
    md.push_str(&format!("| Page load failures | {} |\n", stats.load_failures));
    md.push_str(&format!("| Task failures | {} |\n", stats.task_failures));

    md
}
