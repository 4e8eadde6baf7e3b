//! Output sink traits and errors
//!
//! This module defines the interface every record sink implements and the
//! errors shared by the output layer.

use crate::output::retry::RetryPolicy;
use crate::record::PartRecord;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Artifact already finalized: {0}")]
    AlreadyFinalized(PathBuf),

    #[error("Finalize abandoned after {attempts} attempt(s): {message}")]
    Aborted { attempts: u32, message: String },
}

impl OutputError {
    /// True when the destination is held open by another process
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == io::ErrorKind::PermissionDenied,
            Self::Csv(e) => match e.kind() {
                csv::ErrorKind::Io(e) => e.kind() == io::ErrorKind::PermissionDenied,
                _ => false,
            },
            _ => false,
        }
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for record sinks
///
/// A sink is shared by every worker for the whole run. Implementations must
/// serialize `append` internally; callers take no lock of their own.
pub trait RecordSink: Send + Sync {
    /// Appends one record
    ///
    /// # Arguments
    ///
    /// * `record` - The record to append after any rows already appended
    fn append(&self, record: &PartRecord) -> OutputResult<()>;

    /// Number of rows appended so far
    fn row_count(&self) -> usize;

    /// Writes the artifact, consulting `retry` after every failed attempt
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Where the artifact was written
    /// * `Err(OutputError)` - The policy gave up; appended rows are kept and
    ///   `finalize` may be called again
    fn finalize(&self, retry: &mut dyn RetryPolicy) -> OutputResult<PathBuf>;
}
