/// This module implements the concurrent scan: one task per file, a bounded pool of workers,
/// and a single coordinator that merges what the workers return.
///
/// # Fan-Out / Fan-In
///
/// A thread pool with futures is the usual way to express this:
/// ```python
/// with ThreadPoolExecutor(max_workers=16) as executor:
///     futures = [executor.submit(scan_file, f) for f in files]
///     for future in as_completed(futures):
///         results.extend(future.result())
/// ```
///
/// Here the pool is a Rayon `ThreadPool` of fixed width and "as completed" is a channel the
/// workers send their [`FileOutcome`](crate::results::FileOutcome) into:
/// ```rust,ignore
/// pool.spawn(move || sender.send(worker.scan(&task)));
/// while let Ok(outcome) = completions.recv() {
///     result.add_outcome(outcome);
/// }
/// ```
///
/// The coordinator only hands a new file to the pool when a previous one has finished, so at
/// most `thread_count` files are open at any time and a cancelled scan never starts the
/// files still waiting in its queue.
///
/// # Failure Handling
///
/// A worker returns a value for every file, successful or not, and catches panics from the
/// row source. A broken file therefore shows up as one failure entry and the remaining files
/// are scanned as usual.
pub mod engine;
pub mod matcher;
pub mod worker;

pub use engine::{list_files, scan, CancelToken, ScanState, Scanner};
pub use matcher::matches;
pub use worker::{FileTask, FileWorker};
