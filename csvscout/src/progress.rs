use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use tracing::{debug, info};

use crate::results::FileOutcome;

/// Receives advisory progress observations during a scan.
///
/// Every method has an empty default. Observations are sent from worker threads and from
/// the coordinator thread, so implementations must be cheap and must not block; nothing in
/// the scan depends on them.
pub trait ProgressSink: Send + Sync {
    /// The listing finished with `total` files to scan
    fn files_found(&self, _total: usize) {}

    /// A worker opened `file`
    fn file_started(&self, _file: &Path) {}

    /// A worker reached row `rows` of `file`
    fn rows_processed(&self, _file: &Path, _rows: usize) {}

    /// The coordinator merged the outcome of one file
    fn file_finished(&self, _outcome: &FileOutcome) {}
}

/// Discards every observation
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Reports progress through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn files_found(&self, total: usize) {
        info!("Found {} CSV files in directory", total);
    }

    fn file_started(&self, file: &Path) {
        info!("Searching in file: {}", file.display());
    }

    fn rows_processed(&self, file: &Path, rows: usize) {
        debug!("Processed {} rows in {}", rows, file.display());
    }

    fn file_finished(&self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Success(found) => debug!(
                "Finished {}: {} matches in {} rows",
                found.path.display(),
                found.matches.len(),
                found.rows_scanned
            ),
            FileOutcome::Failure(failure) => debug!(
                "Finished {} with an error: {}",
                failure.path.display(),
                failure.message
            ),
        }
    }
}

/// Terminal progress bar counting finished files
#[derive(Debug, Clone)]
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// A bar that draws nothing, for non-interactive runs
    pub fn hidden() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden());
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn files_found(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn file_started(&self, file: &Path) {
        if let Some(name) = file.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
    }

    fn file_finished(&self, outcome: &FileOutcome) {
        if let FileOutcome::Failure(failure) = outcome {
            self.bar
                .println(format!("failed: {} ({})", failure.path.display(), failure.message));
        }
        self.bar.inc(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{FailureKind, FileFailure, FileMatches};
    use std::path::PathBuf;

    #[test]
    fn test_bar_counts_finished_files() {
        let progress = BarProgress::hidden();
        progress.files_found(2);
        progress.file_started(Path::new("a.csv"));
        progress.file_finished(&FileOutcome::Success(FileMatches {
            path: PathBuf::from("a.csv"),
            ..FileMatches::default()
        }));
        progress.file_finished(&FileOutcome::Failure(FileFailure::new(
            "b.csv",
            FailureKind::Parse,
            "bad record",
        )));
        assert_eq!(progress.position(), 2);
        progress.finish();
    }

    #[test]
    fn test_default_methods_are_no_ops() {
        let progress = NoProgress;
        progress.files_found(10);
        progress.rows_processed(Path::new("a.csv"), 100);
    }
}
