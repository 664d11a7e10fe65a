use crossbeam_channel::unbounded;
use ignore::WalkBuilder;
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use super::worker::{FileTask, FileWorker};
use crate::config::ScanConfig;
use crate::errors::{ScanError, ScanResult};
use crate::filters::should_include_file;
use crate::metrics::ScanMetrics;
use crate::progress::{NoProgress, ProgressSink};
use crate::results::{FileOutcome, ScanResult as ScanOutput};
use crate::source::{CsvRowSource, RowSource};
use crate::targets::TargetSet;

/// Lifecycle of a scan run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Dispatching,
    Collecting,
    Finalized,
}

impl ScanState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ScanState::Dispatching,
            2 => ScanState::Collecting,
            3 => ScanState::Finalized,
            _ => ScanState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ScanState::Idle => 0,
            ScanState::Dispatching => 1,
            ScanState::Collecting => 2,
            ScanState::Finalized => 3,
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::Dispatching => "dispatching",
            ScanState::Collecting => "collecting",
            ScanState::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Cooperative stop signal for a running scan.
///
/// Cancelling stops the dispatch of files that have not started yet. Files already being
/// read run to completion so their handles are released normally.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lists the tabular files directly under `root`, or below it when `recursive` is set.
///
/// A directory that does not exist yields no files. A directory that exists but cannot be
/// listed is a [`ScanError::DirectoryError`].
pub fn list_files(root: &Path, config: &ScanConfig) -> ScanResult<Vec<PathBuf>> {
    match fs::metadata(root) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Directory {} does not exist, nothing to scan", root.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(ScanError::directory(root, e)),
        Ok(metadata) if !metadata.is_dir() => {
            return Err(ScanError::directory(
                root,
                io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }
        Ok(_) => {}
    }
    // The walker reports an unreadable root as an entry error; check it up front instead
    fs::read_dir(root).map_err(|e| ScanError::directory(root, e))?;

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(false)
        .follow_links(true)
        .max_depth(if config.recursive { None } else { Some(1) });

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if should_include_file(relative, &config.file_extensions, &config.ignore_patterns) {
            trace!("Adding file: {}", entry.path().display());
            files.push(entry.into_path());
        }
    }
    files.sort();

    debug!("Found {} files under {}", files.len(), root.display());
    Ok(files)
}

/// Runs scans: lists files, fans them out over a bounded pool and merges the outcomes.
pub struct Scanner<S = CsvRowSource> {
    config: ScanConfig,
    source: Arc<S>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelToken,
    metrics: ScanMetrics,
    state: Arc<AtomicU8>,
}

impl<S: RowSource + 'static> Scanner<S> {
    pub fn new(config: ScanConfig, source: S) -> Self {
        Self {
            config,
            source: Arc::new(source),
            progress: Arc::new(NoProgress),
            cancel: CancelToken::new(),
            metrics: ScanMetrics::new(),
            state: Arc::new(AtomicU8::new(ScanState::Idle.as_u8())),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    pub fn state(&self) -> ScanState {
        ScanState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ScanState) {
        debug!("Scan state: {}", state);
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Scans the configured root directory
    pub fn scan(&self, targets: impl Into<Arc<TargetSet>>) -> ScanResult<ScanOutput> {
        let root = self.config.root_path.clone();
        self.scan_directory(&root, targets)
    }

    /// Scans every tabular file of `root` for `targets`.
    ///
    /// Per-file failures are recorded in the result and never abort the scan. Only an
    /// unreadable directory, an empty target set or a pool that cannot be built are errors.
    pub fn scan_directory(
        &self,
        root: &Path,
        targets: impl Into<Arc<TargetSet>>,
    ) -> ScanResult<ScanOutput> {
        let started = Instant::now();
        let targets = targets.into();
        self.set_state(ScanState::Idle);
        self.metrics.reset();

        if targets.is_empty() {
            return Err(ScanError::config_error("no target values given"));
        }
        info!(
            "Starting scan of {} for {} targets on {} threads",
            root.display(),
            targets.len(),
            self.config.thread_count
        );

        let files = list_files(root, &self.config)?;
        self.set_state(ScanState::Dispatching);
        self.progress.files_found(files.len());

        let mut result = ScanOutput::new();
        if files.is_empty() {
            debug!("No files to scan, finalizing empty result");
            self.set_state(ScanState::Finalized);
            result.elapsed = started.elapsed();
            return Ok(result);
        }

        let mut queue: VecDeque<FileTask> = files
            .into_iter()
            .map(|path| {
                let file = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                FileTask::new(path, file, Arc::clone(&targets))
            })
            .collect();

        let width = self.config.thread_count.get();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(|i| format!("csvscout-worker-{}", i))
            .build()
            .map_err(|e| ScanError::PoolError(e.to_string()))?;

        let worker = Arc::new(
            FileWorker::new(Arc::clone(&self.source))
                .with_progress(
                    Arc::clone(&self.progress),
                    self.config.progress_interval.get(),
                )
                .with_metrics(self.metrics.clone())
                .capture_rows(self.config.capture_rows),
        );

        let (sender, completions) = unbounded::<FileOutcome>();
        let mut in_flight = 0usize;

        loop {
            // Keep at most `width` files in flight; the rest wait in the queue
            while in_flight < width && !self.cancel.is_cancelled() {
                let Some(task) = queue.pop_front() else {
                    break;
                };
                let worker = Arc::clone(&worker);
                let sender = sender.clone();
                pool.spawn(move || {
                    let outcome = worker.scan(&task);
                    // The coordinator only goes away once every outcome is in
                    let _ = sender.send(outcome);
                });
                in_flight += 1;
                self.metrics.record_dispatch(in_flight as u64);
            }

            if in_flight == 0 {
                break;
            }
            if self.state() == ScanState::Dispatching {
                self.set_state(ScanState::Collecting);
            }

            let outcome = match completions.recv() {
                Ok(outcome) => outcome,
                Err(_) => break,
            };
            in_flight -= 1;

            self.progress.file_finished(&outcome);
            if !result.add_outcome(outcome) {
                warn!("Dropped a second outcome for an already merged file");
            }
        }

        if !queue.is_empty() {
            info!(
                "Scan cancelled, {} files were not dispatched",
                queue.len()
            );
            for task in queue {
                self.metrics.record_skipped();
                result.not_dispatched.push(task.file);
            }
        }

        self.set_state(ScanState::Finalized);
        result.elapsed = started.elapsed();
        self.metrics.log_stats();
        info!(
            "Scan complete. Found {} matches in {} of {} files ({} failed)",
            result.total_matches(),
            result.files_with_matches,
            result.files_scanned,
            result.failures.len()
        );

        Ok(result)
    }
}

/// Performs a concurrent scan of `config.root_path` using the CSV row source
pub fn scan(config: &ScanConfig) -> ScanResult<ScanOutput> {
    let targets = config.load_targets()?;
    let source = config.row_source()?;
    Scanner::new(config.clone(), source).scan(targets)
}
