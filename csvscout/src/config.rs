use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{ScanError, ScanResult};
use crate::source::CsvRowSource;
use crate::targets::TargetSet;

/// Default number of files scanned at the same time
pub const DEFAULT_THREAD_COUNT: usize = 16;

/// Default number of rows between two progress observations
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// Configuration for a scan run.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations, later ones winning:
/// 1. Global `$HOME/.config/csvscout/config.yaml`
/// 2. Local `.csvscout.yaml` in the current directory
/// 3. Custom config file specified via `--config` flag
///
/// # Configuration Format
///
/// ```yaml
/// # Directory holding the CSV files
/// root_path: "exports"
///
/// # Values to look for, and/or a file with one value per line
/// targets: ["MSCU1234567"]
/// targets_file: "containers.txt"
///
/// # Extensions treated as tabular files
/// file_extensions: ["csv"]
///
/// # Files to skip (glob syntax)
/// ignore_patterns: ["*_backup.csv"]
///
/// # Descend into subdirectories
/// recursive: false
///
/// # Files scanned concurrently
/// thread_count: 16
///
/// # Rows between progress observations
/// progress_interval: 100
///
/// # Field delimiter and tolerance for ragged records
/// delimiter: ","
/// flexible: false
///
/// # Also collect the full matching rows
/// capture_rows: false
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
///
/// When using the CLI, command-line arguments take precedence over config file values.
/// The merging behavior is defined in the `merge_with_cli` method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory to scan
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Target values given inline
    #[serde(default)]
    pub targets: Vec<String>,

    /// File with one target value per line
    #[serde(default)]
    pub targets_file: Option<PathBuf>,

    /// Extensions of files to scan, compared case-insensitively
    #[serde(default = "default_file_extensions")]
    pub file_extensions: Vec<String>,

    /// Patterns to ignore (supports glob syntax)
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Whether to descend into subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Number of files scanned concurrently
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Rows between two progress observations of a worker
    #[serde(default = "default_progress_interval")]
    pub progress_interval: NonZeroUsize,

    /// Field delimiter, a single ASCII character
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Accept records with more or fewer fields than the header
    #[serde(default)]
    pub flexible: bool,

    /// Keep whole matching rows in addition to the matched cells
    #[serde(default)]
    pub capture_rows: bool,

    /// Whether to only show statistics instead of individual matches
    #[serde(default)]
    pub stats_only: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_extensions() -> Vec<String> {
    vec!["csv".to_string()]
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_THREAD_COUNT).unwrap_or(NonZeroUsize::MIN)
}

/// One worker per logical CPU
pub fn available_threads() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_progress_interval() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_PROGRESS_INTERVAL).unwrap_or(NonZeroUsize::MIN)
}

fn default_delimiter() -> char {
    ','
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            targets: Vec::new(),
            targets_file: None,
            file_extensions: default_file_extensions(),
            ignore_patterns: Vec::new(),
            recursive: false,
            thread_count: default_thread_count(),
            progress_interval: default_progress_interval(),
            delimiter: default_delimiter(),
            flexible: false,
            capture_rows: false,
            stats_only: false,
            log_level: default_log_level(),
        }
    }
}

impl ScanConfig {
    /// Creates a configuration for `root_path` with default settings
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an optional explicit file.
    ///
    /// An explicit file that does not exist is an error; the default locations are
    /// optional.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("csvscout/config.yaml")),
            Some(PathBuf::from(".csvscout.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: ScanConfig) -> Self {
        // CLI values take precedence over config file values
        if cli_config.root_path != default_root_path() {
            self.root_path = cli_config.root_path;
        }
        if !cli_config.targets.is_empty() {
            self.targets = cli_config.targets;
        }
        if cli_config.targets_file.is_some() {
            self.targets_file = cli_config.targets_file;
        }
        if cli_config.file_extensions != default_file_extensions() {
            self.file_extensions = cli_config.file_extensions;
        }
        if !cli_config.ignore_patterns.is_empty() {
            self.ignore_patterns = cli_config.ignore_patterns;
        }
        if cli_config.thread_count != default_thread_count() {
            self.thread_count = cli_config.thread_count;
        }
        if cli_config.progress_interval != default_progress_interval() {
            self.progress_interval = cli_config.progress_interval;
        }
        if cli_config.delimiter != default_delimiter() {
            self.delimiter = cli_config.delimiter;
        }
        self.recursive |= cli_config.recursive;
        self.flexible |= cli_config.flexible;
        self.capture_rows |= cli_config.capture_rows;
        self.stats_only |= cli_config.stats_only;
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        self
    }

    /// Builds the target set from the inline targets and the targets file.
    ///
    /// A missing or unreadable targets file is fatal, as is ending up with no targets at all.
    pub fn load_targets(&self) -> ScanResult<TargetSet> {
        let mut targets = TargetSet::from_values(&self.targets);
        if let Some(path) = &self.targets_file {
            targets.merge(TargetSet::load(path)?);
        }
        if targets.is_empty() {
            return Err(ScanError::config_error("no target values given"));
        }
        Ok(targets)
    }

    /// Builds the CSV row source described by this configuration
    pub fn row_source(&self) -> ScanResult<CsvRowSource> {
        if !self.delimiter.is_ascii() {
            return Err(ScanError::config_error(format!(
                "delimiter must be a single ASCII character, got {:?}",
                self.delimiter
            )));
        }
        Ok(CsvRowSource::new(self.delimiter as u8, self.flexible))
    }
}
