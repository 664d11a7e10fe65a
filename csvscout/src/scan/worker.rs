use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{trace, warn};

use super::matcher;
use crate::errors::ScanError;
use crate::metrics::ScanMetrics;
use crate::progress::{NoProgress, ProgressSink};
use crate::results::{FailureKind, FileFailure, FileMatches, FileOutcome, MatchRecord, MatchedRow};
use crate::source::RowSource;
use crate::targets::TargetSet;

/// One file to scan. Created once per listed file and consumed by exactly one worker.
#[derive(Debug, Clone)]
pub struct FileTask {
    /// Where to open the file
    pub path: PathBuf,
    /// How the file is reported, relative to the scanned directory
    pub file: PathBuf,
    pub targets: Arc<TargetSet>,
}

impl FileTask {
    pub fn new(path: impl Into<PathBuf>, file: impl Into<PathBuf>, targets: Arc<TargetSet>) -> Self {
        Self {
            path: path.into(),
            file: file.into(),
            targets,
        }
    }
}

/// Scans single files. Shared by all pool threads.
pub struct FileWorker<S> {
    source: Arc<S>,
    progress: Arc<dyn ProgressSink>,
    metrics: ScanMetrics,
    progress_interval: usize,
    capture_rows: bool,
}

impl<S: RowSource> FileWorker<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            progress: Arc::new(NoProgress),
            metrics: ScanMetrics::new(),
            progress_interval: crate::config::DEFAULT_PROGRESS_INTERVAL,
            capture_rows: false,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>, interval: usize) -> Self {
        self.progress = progress;
        self.progress_interval = interval.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: ScanMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn capture_rows(mut self, capture: bool) -> Self {
        self.capture_rows = capture;
        self
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Scans one file and returns its terminal outcome.
    ///
    /// Errors and panics raised while reading the file are turned into a failure for that
    /// file; nothing escapes to the caller.
    pub fn scan(&self, task: &FileTask) -> FileOutcome {
        trace!("Scanning file: {}", task.path.display());

        match panic::catch_unwind(AssertUnwindSafe(|| self.scan_rows(task))) {
            Ok(Ok(found)) => {
                self.metrics
                    .record_success(found.rows_scanned as u64, found.matches.len() as u64);
                FileOutcome::Success(found)
            }
            Ok(Err((err, rows_read))) => {
                warn!(
                    "Error reading {} after {} rows: {}",
                    task.file.display(),
                    rows_read,
                    err
                );
                self.metrics.record_failure(rows_read as u64);
                FileOutcome::Failure(FileFailure::from_error(&task.file, &err))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Worker panicked on {}: {}", task.file.display(), message);
                self.metrics.record_failure(0);
                FileOutcome::Failure(FileFailure::new(
                    &task.file,
                    FailureKind::Panic,
                    format!("worker panicked: {}", message),
                ))
            }
        }
    }

    /// Reads every row; on error returns it with the number of rows read so far
    fn scan_rows(&self, task: &FileTask) -> Result<FileMatches, (ScanError, usize)> {
        self.progress.file_started(&task.file);

        // The row iterator owns the file handle; it is dropped on every return path below
        let rows = self.source.open(&task.path).map_err(|e| (e, 0))?;

        let mut found = FileMatches {
            path: task.file.clone(),
            ..FileMatches::default()
        };

        for (index, row) in rows.enumerate() {
            let row = row.map_err(|e| (e, index))?;
            if index % self.progress_interval == 0 {
                self.progress.rows_processed(&task.file, index);
            }

            let hits: Vec<MatchRecord> = matcher::matches(&row, &task.targets)
                .into_iter()
                .map(|(column, value)| MatchRecord {
                    file: task.file.clone(),
                    row: index,
                    column: column.clone(),
                    value: value.clone(),
                })
                .collect();

            if !hits.is_empty() {
                if self.capture_rows {
                    found.rows.push(MatchedRow {
                        file: task.file.clone(),
                        row: index,
                        columns: row.columns().to_vec(),
                        values: row.values().to_vec(),
                    });
                }
                found.matches.extend(hits);
            }
            found.rows_scanned = index + 1;
        }

        trace!(
            "Found {} matches in {} rows of {}",
            found.matches.len(),
            found.rows_scanned,
            task.file.display()
        );
        Ok(found)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
