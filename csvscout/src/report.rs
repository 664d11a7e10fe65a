use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{ScanError, ScanResult};
use crate::results::ScanResult as ScanOutput;
use crate::source::{ColumnId, Scalar};

/// Header of the match report
pub const MATCH_HEADER: [&str; 4] = ["file", "row", "column", "value"];

/// Writes one `file, row, column, value` line per match
pub fn render_matches<W: Write>(result: &ScanOutput, writer: &mut W) -> io::Result<()> {
    for m in &result.matches {
        writeln!(
            writer,
            "{}, {}, {}, {}",
            m.file.display(),
            m.row,
            m.column,
            m.value
        )?;
    }
    Ok(())
}

/// Writes every match to a CSV file at `path`
pub fn write_matches_csv(result: &ScanOutput, path: &Path) -> ScanResult<()> {
    write_atomically(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(MATCH_HEADER)?;
        for m in &result.matches {
            writer.write_record([
                &*m.file.to_string_lossy(),
                m.row.to_string().as_str(),
                m.column.to_string().as_str(),
                m.value.to_string().as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    })?;
    debug!(
        "Wrote {} matches to {}",
        result.matches.len(),
        path.display()
    );
    Ok(())
}

/// Writes every captured matching row to a CSV file at `path`.
///
/// Columns are the union of all captured rows' columns in the order they were first seen;
/// a row without one of them gets an empty cell.
pub fn write_matched_rows_csv(result: &ScanOutput, path: &Path) -> ScanResult<()> {
    let mut columns: Vec<&ColumnId> = Vec::new();
    for row in &result.matched_rows {
        for column in &row.columns {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
    }

    write_atomically(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        let mut header = vec!["file".to_string(), "row".to_string()];
        header.extend(columns.iter().map(|c| c.to_string()));
        writer.write_record(&header)?;

        for row in &result.matched_rows {
            let mut record = vec![row.file.to_string_lossy().into_owned(), row.row.to_string()];
            for column in &columns {
                let value = row
                    .columns
                    .iter()
                    .position(|c| c == *column)
                    .and_then(|i| row.values.get(i))
                    .map(Scalar::to_string)
                    .unwrap_or_default();
                record.push(value);
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    })?;
    debug!(
        "Wrote {} rows to {}",
        result.matched_rows.len(),
        path.display()
    );
    Ok(())
}

/// Writes the finalized result as pretty JSON
pub fn write_json<W: Write>(result: &ScanOutput, writer: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, result)?;
    writeln!(writer)
}

/// One-paragraph human summary of a scan; `None` means no scan has run
pub fn summary(result: Option<&ScanOutput>) -> String {
    let Some(result) = result else {
        return "No scan has been run".to_string();
    };

    let mut text = if result.matches.is_empty() {
        format!("No matches found in {} files", result.files_scanned)
    } else {
        format!(
            "Found {} matches in {} of {} files",
            result.total_matches(),
            result.files_with_matches,
            result.files_scanned
        )
    };
    text.push_str(&format!(
        " ({} rows, {})",
        result.rows_scanned,
        humantime::format_duration(round_to_millis(result.elapsed))
    ));

    if result.has_failures() {
        text.push_str(&format!("\n{} files failed:", result.failures.len()));
        for failure in &result.failures {
            text.push_str(&format!(
                "\n  {} [{}]: {}",
                failure.path.display(),
                failure.kind,
                failure.message
            ));
        }
    }
    if !result.not_dispatched.is_empty() {
        text.push_str(&format!(
            "\n{} files skipped after cancellation",
            result.not_dispatched.len()
        ));
    }
    text
}

fn round_to_millis(elapsed: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(elapsed.as_millis() as u64)
}

/// Writes through a temporary file next to `path` and renames it into place on success
fn write_atomically<F>(path: &Path, write: F) -> ScanResult<()>
where
    F: FnOnce(&mut NamedTempFile) -> Result<(), csv::Error>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut file = NamedTempFile::new_in(&dir).map_err(|e| ScanError::output(path, e))?;
    write(&mut file).map_err(|e| ScanError::output(path, csv_to_io(e)))?;
    file.persist(path)
        .map_err(|e| ScanError::output(path, e.error))?;
    Ok(())
}

fn csv_to_io(err: csv::Error) -> io::Error {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{FailureKind, FileFailure, FileMatches, FileOutcome, MatchRecord, MatchedRow};
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn sample() -> ScanOutput {
        let mut result = ScanOutput::new();
        result.add_outcome(FileOutcome::Success(FileMatches {
            path: PathBuf::from("a.csv"),
            matches: vec![MatchRecord {
                file: PathBuf::from("a.csv"),
                row: 0,
                column: ColumnId::from("col1"),
                value: Scalar::infer("X"),
            }],
            rows: vec![MatchedRow {
                file: PathBuf::from("a.csv"),
                row: 0,
                columns: vec![ColumnId::from("col1"), ColumnId::from("col2")],
                values: vec![Scalar::infer("X"), Scalar::infer("7")],
            }],
            rows_scanned: 1,
        }));
        result.add_outcome(FileOutcome::Failure(FileFailure::new(
            "b.csv",
            FailureKind::Io,
            "permission denied",
        )));
        result.elapsed = Duration::from_millis(1500);
        result
    }

    #[test]
    fn test_render_matches() {
        let mut out = Vec::new();
        render_matches(&sample(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a.csv, 0, col1, X\n");
    }

    #[test]
    fn test_write_matches_csv_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matches.csv");
        write_matches_csv(&sample(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("file,row,column,value"));
        assert_eq!(lines.next(), Some("a.csv,0,col1,X"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_write_matched_rows_union_of_columns() {
        let mut result = sample();
        result.matched_rows.push(MatchedRow {
            file: PathBuf::from("c.csv"),
            row: 4,
            columns: vec![ColumnId::from("col3"), ColumnId::from("col1")],
            values: vec![Scalar::infer("z"), Scalar::infer("X")],
        });

        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        write_matched_rows_csv(&result, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "file,row,col1,col2,col3");
        assert_eq!(lines[1], "a.csv,0,X,7,");
        assert_eq!(lines[2], "c.csv,4,X,,z");
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing/matches.csv");
        let err = write_matches_csv(&sample(), &path).unwrap_err();
        assert!(matches!(err, ScanError::OutputError { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_json() {
        let mut out = Vec::new();
        write_json(&sample(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["matches"][0]["file"], "a.csv");
        assert_eq!(value["matches"][0]["value"], "X");
        assert_eq!(value["failures"][0]["kind"], "Io");
        assert_eq!(value["files_scanned"], 2);
    }

    #[test]
    fn test_summary_states() {
        assert_eq!(summary(None), "No scan has been run");

        let empty = ScanOutput::new();
        assert!(summary(Some(&empty)).starts_with("No matches found in 0 files"));

        let text = summary(Some(&sample()));
        assert!(text.starts_with("Found 1 matches in 1 of 2 files"));
        assert!(text.contains("1s 500ms"));
        assert!(text.contains("1 files failed"));
        assert!(text.contains("b.csv [io]: permission denied"));
    }
}
