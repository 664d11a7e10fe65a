use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters shared between the coordinator and its workers
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    // File lifecycle
    files_dispatched: Arc<AtomicU64>,
    files_succeeded: Arc<AtomicU64>,
    files_failed: Arc<AtomicU64>,
    files_skipped: Arc<AtomicU64>,

    // Content
    rows_scanned: Arc<AtomicU64>,
    matches_found: Arc<AtomicU64>,
    peak_in_flight: Arc<AtomicU64>,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance
    pub fn new() -> Self {
        Self {
            files_dispatched: Arc::new(AtomicU64::new(0)),
            files_succeeded: Arc::new(AtomicU64::new(0)),
            files_failed: Arc::new(AtomicU64::new(0)),
            files_skipped: Arc::new(AtomicU64::new(0)),
            rows_scanned: Arc::new(AtomicU64::new(0)),
            matches_found: Arc::new(AtomicU64::new(0)),
            peak_in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a task handed to the pool, with the number of tasks now in flight
    pub fn record_dispatch(&self, in_flight: u64) {
        self.files_dispatched.fetch_add(1, Ordering::Relaxed);
        let mut peak = self.peak_in_flight.load(Ordering::Relaxed);
        while in_flight > peak {
            match self.peak_in_flight.compare_exchange_weak(
                peak,
                in_flight,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => peak = current,
            }
        }
    }

    /// Records a file that was scanned to the end
    pub fn record_success(&self, rows: u64, matches: u64) {
        self.files_succeeded.fetch_add(1, Ordering::Relaxed);
        self.rows_scanned.fetch_add(rows, Ordering::Relaxed);
        self.matches_found.fetch_add(matches, Ordering::Relaxed);
        debug!("File done: {} rows, {} matches", rows, matches);
    }

    /// Records a file that failed, with the rows read before the failure
    pub fn record_failure(&self, rows: u64) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
        self.rows_scanned.fetch_add(rows, Ordering::Relaxed);
    }

    /// Records a file left undispatched by cancellation
    pub fn record_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Sets every counter back to zero
    pub fn reset(&self) {
        for counter in [
            &self.files_dispatched,
            &self.files_succeeded,
            &self.files_failed,
            &self.files_skipped,
            &self.rows_scanned,
            &self.matches_found,
            &self.peak_in_flight,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            files_dispatched: self.files_dispatched.load(Ordering::Relaxed),
            files_succeeded: self.files_succeeded.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            rows_scanned: self.rows_scanned.load(Ordering::Relaxed),
            matches_found: self.matches_found.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
        }
    }

    /// Logs current scan statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Files dispatched/succeeded/failed/skipped: {}/{}/{}/{}\n\
             Rows scanned: {}\n\
             Matches found: {}\n\
             Peak tasks in flight: {}",
            stats.files_dispatched,
            stats.files_succeeded,
            stats.files_failed,
            stats.files_skipped,
            stats.rows_scanned,
            stats.matches_found,
            stats.peak_in_flight
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub files_dispatched: u64,
    pub files_succeeded: u64,
    pub files_failed: u64,
    pub files_skipped: u64,
    pub rows_scanned: u64,
    pub matches_found: u64,
    pub peak_in_flight: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_lifecycle_tracking() {
        let metrics = ScanMetrics::new();

        metrics.record_dispatch(1);
        metrics.record_dispatch(2);
        metrics.record_success(100, 3);
        metrics.record_failure(7);
        metrics.record_skipped();

        let stats = metrics.get_stats();
        assert_eq!(stats.files_dispatched, 2);
        assert_eq!(stats.files_succeeded, 1);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.rows_scanned, 107);
        assert_eq!(stats.matches_found, 3);
    }

    #[test]
    fn test_peak_in_flight() {
        let metrics = ScanMetrics::new();
        metrics.record_dispatch(1);
        metrics.record_dispatch(4);
        metrics.record_dispatch(2);
        assert_eq!(metrics.get_stats().peak_in_flight, 4);
    }

    #[test]
    fn test_reset() {
        let metrics = ScanMetrics::new();
        metrics.record_dispatch(3);
        metrics.record_success(10, 2);
        metrics.reset();

        let stats = metrics.get_stats();
        assert_eq!(stats.files_dispatched, 0);
        assert_eq!(stats.rows_scanned, 0);
        assert_eq!(stats.peak_in_flight, 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = ScanMetrics::new();
        let worker_view = metrics.clone();
        worker_view.record_success(10, 1);
        assert_eq!(metrics.get_stats().rows_scanned, 10);
    }
}
