//! CSV artifact sink
//!
//! Rows are rendered when appended and kept in memory; the file itself is
//! written once, by `finalize`. A failed write loses nothing, so the caller
//! can retry until the destination becomes writable.

use crate::output::retry::{RetryDecision, RetryPolicy};
use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::record::{schema, PartRecord, COLUMNS};
use csv::Writer;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

struct TableState {
    rows: Vec<Vec<String>>,
    finalized: bool,
}

/// A CSV artifact with one header row and one row per record
pub struct TableSink {
    path: PathBuf,
    state: Mutex<TableState>,
}

impl TableSink {
    /// Creates a sink writing `{directory}/{name}.csv`
    pub fn new(directory: &Path, name: &str) -> Self {
        let path = directory.join(format!("{}.csv", name));
        tracing::info!("Artifact will be written to {}", path.display());
        Self {
            path,
            state: Mutex::new(TableState {
                rows: Vec::new(),
                finalized: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finalized(&self) -> bool {
        self.lock().finalized
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Renders a record, each value placed at its column's index
    pub fn render(record: &PartRecord) -> Vec<String> {
        let mut cells = vec![String::new(); COLUMNS.len()];
        for column in &COLUMNS {
            let value = record.get(column.field);
            if let (Some(cell), Some(value)) = (cells.get_mut(column.index), value) {
                *cell = value.render(column.kind);
            }
        }
        cells
    }

    fn write_file(&self, rows: &[Vec<String>]) -> OutputResult<()> {
        let mut writer = Writer::from_path(&self.path)?;
        writer.write_record(schema::headers())?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl RecordSink for TableSink {
    fn append(&self, record: &PartRecord) -> OutputResult<()> {
        let row = Self::render(record);
        let mut state = self.lock();
        if state.finalized {
            return Err(OutputError::AlreadyFinalized(self.path.clone()));
        }
        state.rows.push(row);
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.lock().rows.len()
    }

    fn finalize(&self, retry: &mut dyn RetryPolicy) -> OutputResult<PathBuf> {
        let mut state = self.lock();
        if state.finalized {
            return Err(OutputError::AlreadyFinalized(self.path.clone()));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.write_file(&state.rows) {
                Ok(()) => {
                    state.finalized = true;
                    tracing::info!(
                        "Artifact saved with {} row(s): {}",
                        state.rows.len(),
                        self.path.display()
                    );
                    return Ok(self.path.clone());
                }
                Err(e) => match retry.on_failure(attempt, &e) {
                    RetryDecision::Retry => continue,
                    RetryDecision::Abort => {
                        return Err(OutputError::Aborted {
                            attempts: attempt,
                            message: e.to_string(),
                        })
                    }
                },
            }
        }
    }
}
