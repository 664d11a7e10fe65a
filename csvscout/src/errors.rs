/// This module defines the error types for csvscout and the split between errors that end
/// a run and errors that only end the scan of a single file.
///
/// # Fatal vs Per-File Errors
///
/// In an exception-based design a worker failure is usually caught somewhere up the stack:
/// ```csharp
/// try {
///     var rows = CsvReader.Read(path);
/// } catch (IOException ex) {
///     // Log and continue with the next file
/// }
/// ```
///
/// Here the worker returns a value instead, so nothing crosses the task boundary:
/// ```rust,ignore
/// match source.open(path) {
///     Ok(rows) => // scan rows,
///     Err(e) => FileOutcome::failure(path, &e),
/// }
/// ```
///
/// Only `DirectoryError`, `TargetLoadError`, `ConfigError` and `PoolError` abort a run.
/// `FileIo` and `FileParse` are always converted into a [`FileFailure`](crate::results::FileFailure)
/// by the file worker and recorded next to the successful matches.
use std::path::PathBuf;
use thiserror::Error;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur during scan operations
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot load targets from {path}: {source}")]
    TargetLoadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error in {path}: {source}")]
    FileIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Parse error in {path}: {message}")]
    FileParse { path: PathBuf, message: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Worker pool error: {0}")]
    PoolError(String),
    #[error("Cannot write {path}: {source}")]
    OutputError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScanError {
    pub fn directory(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryError {
            path: path.into(),
            source,
        }
    }

    pub fn target_load(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::TargetLoadError {
            path: path.into(),
            source,
        }
    }

    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    pub fn file_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FileParse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputError {
            path: path.into(),
            source,
        }
    }

    /// Converts a `csv` reader error for `path` into a per-file error.
    ///
    /// I/O errors keep their kind so permission problems stay distinguishable
    /// from malformed content.
    pub fn from_csv(path: impl Into<PathBuf>, err: csv::Error) -> Self {
        let path = path.into();
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(source) => Self::file_io(path, source),
                other => Self::file_parse(path, format!("{:?}", other)),
            }
        } else {
            Self::file_parse(path, err.to_string())
        }
    }

    /// Returns true for errors that a file worker recovers from locally
    pub fn is_per_file(&self) -> bool {
        matches!(self, Self::FileIo { .. } | Self::FileParse { .. })
    }
}
