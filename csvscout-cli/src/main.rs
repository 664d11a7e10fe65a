use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use csvscout::{
    config::{self, ScanConfig},
    progress::{BarProgress, LogProgress, ProgressSink},
    report,
    results::ScanResult,
    Scanner,
};
use std::{
    io::{self, Write},
    num::NonZeroUsize,
    path::PathBuf,
    sync::Arc,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliScanConfig {
    /// Directory holding the CSV files
    #[arg(short = 'd', long = "dir", default_value = ".")]
    root: PathBuf,

    /// Value to search for (can be specified multiple times)
    #[arg(short = 't', long = "target")]
    targets: Vec<String>,

    /// File with one target value per line
    #[arg(short = 'T', long)]
    targets_file: Option<PathBuf>,

    /// File extensions to include (e.g. csv,tsv)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// Patterns to ignore (glob format)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Number of files scanned at once, or "auto" for one per CPU
    #[arg(short = 'j', long, value_parser = parse_threads)]
    threads: Option<NonZeroUsize>,

    /// Field delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Accept records with a different number of fields than the header
    #[arg(long)]
    flexible: bool,

    /// Write matches to this CSV file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Write the full matching rows to this CSV file
    #[arg(long)]
    rows_output: Option<PathBuf>,

    /// Print the result as JSON instead of match lines
    #[arg(long)]
    json: bool,

    /// Show only statistics, not matches
    #[arg(short, long)]
    stats: bool,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a directory of CSV files for target values
    Scan(Box<CliScanConfig>),
}

fn parse_threads(value: &str) -> std::result::Result<NonZeroUsize, String> {
    if value.eq_ignore_ascii_case("auto") {
        return Ok(config::available_threads());
    }
    value
        .parse::<NonZeroUsize>()
        .map_err(|_| format!("expected a positive number or \"auto\", got {:?}", value))
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level {:?}", level))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => run_scan(*args),
    }
}

fn run_scan(args: CliScanConfig) -> Result<()> {
    init_logging(&args.log_level)?;

    let defaults = ScanConfig::default();
    let cli_config = ScanConfig {
        root_path: args.root.clone(),
        targets: args.targets.clone(),
        targets_file: args.targets_file.clone(),
        file_extensions: args
            .extensions
            .as_ref()
            .map(|e| {
                e.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| defaults.file_extensions.clone()),
        ignore_patterns: args.ignore.clone(),
        recursive: args.recursive,
        thread_count: args.threads.unwrap_or(defaults.thread_count),
        delimiter: args.delimiter.unwrap_or(defaults.delimiter),
        flexible: args.flexible,
        capture_rows: args.rows_output.is_some(),
        stats_only: args.stats,
        log_level: args.log_level.clone(),
        ..defaults
    };

    let mut config = ScanConfig::load_from(args.config.as_deref())
        .context("Failed to load configuration")?
        .merge_with_cli(cli_config);
    // Explicit flags win even when they equal the built-in default
    if let Some(threads) = args.threads {
        config.thread_count = threads;
    }
    if let Some(delimiter) = args.delimiter {
        config.delimiter = delimiter;
    }

    let targets = config.load_targets()?;
    let source = config.row_source()?;

    let bar = args.progress.then(BarProgress::new);
    let progress: Arc<dyn ProgressSink> = match &bar {
        Some(bar) => Arc::new(bar.clone()),
        None => Arc::new(LogProgress),
    };

    let scanner = Scanner::new(config.clone(), source).with_progress(progress);
    let scanned = scanner.scan(targets);
    if let Some(bar) = &bar {
        bar.finish();
    }
    let mut result = scanned.with_context(|| {
        format!("Failed to scan {}", config.root_path.display())
    })?;
    result.sort();

    if let Some(path) = &args.output {
        report::write_matches_csv(&result, path)?;
    }
    if let Some(path) = &args.rows_output {
        report::write_matched_rows_csv(&result, path)?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        report::write_json(&result, &mut out)?;
        eprintln!("{}", report::summary(Some(&result)));
        return Ok(());
    }

    if !config.stats_only {
        report::render_matches(&result, &mut out)?;
    }
    print_summary(&result, &mut out)?;
    Ok(())
}

fn print_summary<W: Write>(result: &ScanResult, out: &mut W) -> io::Result<()> {
    let summary = report::summary(Some(result));
    let mut lines = summary.lines();
    if let Some(headline) = lines.next() {
        if result.matches.is_empty() {
            writeln!(out, "\n{}", headline.yellow())?;
        } else {
            writeln!(out, "\n{}", headline.green())?;
        }
    }
    for line in lines {
        writeln!(out, "{}", line.red())?;
    }
    Ok(())
}
