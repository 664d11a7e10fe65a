/// This module implements the scan result types and the ownership rules between them.
///
/// # Ownership of Results
///
/// A file worker builds its matches in a local `Vec` and hands the whole vector over when it
/// finishes:
/// ```rust,ignore
/// FileOutcome::Success(FileMatches { matches, .. }) // moved, not shared
/// ```
///
/// The coordinator is the only owner of the [`ScanResult`] while a scan runs. Outcomes are
/// moved into it one at a time by [`ScanResult::add_outcome`], so there is never a second
/// writer and no lock is needed around the aggregate:
/// ```rust,ignore
/// for outcome in completions.iter() {
///     result.add_outcome(outcome); // &mut borrow, single consumer
/// }
/// ```
///
/// Once the scan is finalized the result is returned by value; nothing else holds a
/// reference to it, so it cannot change behind the caller's back.
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ScanError;
use crate::source::{ColumnId, Scalar};

/// A single cell that equals one of the targets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    /// The file, relative to the scanned directory
    pub file: PathBuf,
    /// 0-based index of the data row (the header is not counted)
    pub row: usize,
    /// The column the value was found in
    pub column: ColumnId,
    /// The matched value after type inference, so `042` and `42.0` are reported as `42`
    pub value: Scalar,
}

/// A complete row that contained at least one match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRow {
    pub file: PathBuf,
    pub row: usize,
    pub columns: Vec<ColumnId>,
    pub values: Vec<Scalar>,
}

/// Why a file could not be scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Io,
    Parse,
    Panic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Io => f.write_str("io"),
            FailureKind::Parse => f.write_str("parse"),
            FailureKind::Panic => f.write_str("panic"),
        }
    }
}

/// A file whose scan failed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

impl FileFailure {
    pub fn new(path: impl Into<PathBuf>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// Records a per-file error under the file's identifier
    pub fn from_error(path: impl Into<PathBuf>, err: &ScanError) -> Self {
        let kind = match err {
            ScanError::FileIo { .. } | ScanError::IoError(_) => FailureKind::Io,
            _ => FailureKind::Parse,
        };
        Self::new(path, kind, err.to_string())
    }
}

/// Everything found in one successfully scanned file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMatches {
    pub path: PathBuf,
    /// Matches in row order
    pub matches: Vec<MatchRecord>,
    /// Whole matching rows, only filled when row capture is enabled
    pub rows: Vec<MatchedRow>,
    pub rows_scanned: usize,
}

/// Terminal result of scanning one file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Success(FileMatches),
    Failure(FileFailure),
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Success(found) => &found.path,
            FileOutcome::Failure(failure) => &failure.path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Success(_))
    }
}

/// The aggregated result of a scan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    /// All matches; rows keep file order, files follow completion order
    pub matches: Vec<MatchRecord>,
    /// Matching rows, when row capture is enabled
    pub matched_rows: Vec<MatchedRow>,
    /// Files that could not be scanned
    pub failures: Vec<FileFailure>,
    /// Files never dispatched because the scan was cancelled
    pub not_dispatched: Vec<PathBuf>,
    /// Files that produced an outcome, successful or not
    pub files_scanned: usize,
    /// Files with at least one match
    pub files_with_matches: usize,
    /// Data rows read across all successful files
    pub rows_scanned: usize,
    /// Wall-clock duration of the scan
    pub elapsed: Duration,
    #[serde(skip)]
    seen: HashSet<PathBuf>,
}

impl ScanResult {
    /// Creates a new empty scan result
    pub fn new() -> Self {
        Default::default()
    }

    /// Merges one file outcome into the result.
    ///
    /// Each file contributes at most once; a second outcome for the same file is dropped and
    /// `false` is returned.
    pub fn add_outcome(&mut self, outcome: FileOutcome) -> bool {
        if !self.seen.insert(outcome.path().to_path_buf()) {
            return false;
        }
        self.files_scanned += 1;
        match outcome {
            FileOutcome::Success(found) => {
                if !found.matches.is_empty() {
                    self.files_with_matches += 1;
                }
                self.rows_scanned += found.rows_scanned;
                self.matches.extend(found.matches);
                self.matched_rows.extend(found.rows);
            }
            FileOutcome::Failure(failure) => self.failures.push(failure),
        }
        true
    }

    /// Merges another scan result into this one
    pub fn merge(&mut self, other: ScanResult) {
        self.files_scanned += other.files_scanned;
        self.files_with_matches += other.files_with_matches;
        self.rows_scanned += other.rows_scanned;
        self.elapsed += other.elapsed;
        self.matches.extend(other.matches);
        self.matched_rows.extend(other.matched_rows);
        self.failures.extend(other.failures);
        self.not_dispatched.extend(other.not_dispatched);
        self.seen.extend(other.seen);
    }

    /// Orders matches, rows and failures by file and row.
    ///
    /// The sort is stable, so matches within one row keep their column order.
    pub fn sort(&mut self) {
        self.matches
            .sort_by(|a, b| (&a.file, a.row).cmp(&(&b.file, b.row)));
        self.matched_rows
            .sort_by(|a, b| (&a.file, a.row).cmp(&(&b.file, b.row)));
        self.failures.sort_by(|a, b| a.path.cmp(&b.path));
        self.not_dispatched.sort();
    }

    pub fn total_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Matches of a single file, in row order
    pub fn matches_in<'a>(&'a self, file: &'a Path) -> impl Iterator<Item = &'a MatchRecord> {
        self.matches.iter().filter(move |m| m.file.as_path() == file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(file: &str, row: usize, column: &str, value: &str) -> MatchRecord {
        MatchRecord {
            file: PathBuf::from(file),
            row,
            column: ColumnId::from(column),
            value: Scalar::infer(value),
        }
    }

    fn success(file: &str, matches: Vec<MatchRecord>, rows_scanned: usize) -> FileOutcome {
        FileOutcome::Success(FileMatches {
            path: PathBuf::from(file),
            matches,
            rows: vec![],
            rows_scanned,
        })
    }

    #[test]
    fn test_scan_result_new() {
        let result = ScanResult::new();
        assert_eq!(result.total_matches(), 0);
        assert_eq!(result.files_scanned, 0);
        assert_eq!(result.files_with_matches, 0);
        assert!(!result.has_failures());
    }

    #[test]
    fn test_add_outcome() {
        let mut result = ScanResult::new();

        assert!(result.add_outcome(success(
            "a.csv",
            vec![record("a.csv", 0, "col1", "X"), record("a.csv", 2, "col2", "X")],
            10,
        )));
        assert_eq!(result.total_matches(), 2);
        assert_eq!(result.files_scanned, 1);
        assert_eq!(result.files_with_matches, 1);
        assert_eq!(result.rows_scanned, 10);

        // Empty success still counts as scanned
        assert!(result.add_outcome(success("b.csv", vec![], 5)));
        assert_eq!(result.files_scanned, 2);
        assert_eq!(result.files_with_matches, 1);

        assert!(result.add_outcome(FileOutcome::Failure(FileFailure::new(
            "c.csv",
            FailureKind::Parse,
            "bad record",
        ))));
        assert_eq!(result.files_scanned, 3);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.rows_scanned, 15);
    }

    #[test]
    fn test_outcome_is_write_once() {
        let mut result = ScanResult::new();
        assert!(result.add_outcome(success("a.csv", vec![record("a.csv", 0, "c", "X")], 1)));
        assert!(!result.add_outcome(success("a.csv", vec![record("a.csv", 0, "c", "X")], 1)));
        assert_eq!(result.total_matches(), 1);
        assert_eq!(result.files_scanned, 1);
    }

    #[test]
    fn test_merge() {
        let mut first = ScanResult::new();
        first.add_outcome(success("a.csv", vec![record("a.csv", 0, "c", "X")], 3));

        let mut second = ScanResult::new();
        second.add_outcome(success("b.csv", vec![record("b.csv", 1, "c", "X")], 4));
        second.add_outcome(FileOutcome::Failure(FileFailure::new(
            "c.csv",
            FailureKind::Io,
            "denied",
        )));

        first.merge(second);
        assert_eq!(first.total_matches(), 2);
        assert_eq!(first.files_scanned, 3);
        assert_eq!(first.files_with_matches, 2);
        assert_eq!(first.rows_scanned, 7);
        assert_eq!(first.failures.len(), 1);
    }

    #[test]
    fn test_sort_keeps_column_order_within_row() {
        let mut result = ScanResult::new();
        result.add_outcome(success(
            "b.csv",
            vec![record("b.csv", 0, "z", "X"), record("b.csv", 0, "a", "X")],
            1,
        ));
        result.add_outcome(success("a.csv", vec![record("a.csv", 4, "c", "X")], 5));

        result.sort();
        let order: Vec<_> = result
            .matches
            .iter()
            .map(|m| (m.file.to_string_lossy().into_owned(), m.row, m.column.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.csv".to_string(), 4, "c".to_string()),
                ("b.csv".to_string(), 0, "z".to_string()),
                ("b.csv".to_string(), 0, "a".to_string()),
            ]
        );
    }

    #[test]
    fn test_failure_kind_from_error() {
        let io = ScanError::file_io("a.csv", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(FileFailure::from_error("a.csv", &io).kind, FailureKind::Io);

        let parse = ScanError::file_parse("a.csv", "bad");
        let failure = FileFailure::from_error("a.csv", &parse);
        assert_eq!(failure.kind, FailureKind::Parse);
        assert_eq!(failure.message, "Parse error in a.csv: bad");
    }
}
