pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod progress;
pub mod report;
pub mod results;
pub mod scan;
pub mod source;
pub mod targets;

pub use config::ScanConfig;
pub use errors::{ScanError, ScanResult};
pub use results::{FileFailure, FileOutcome, MatchRecord, MatchedRow, ScanResult as ScanOutput};
pub use scan::{scan, CancelToken, Scanner};
pub use source::{ColumnId, CsvRowSource, Row, RowSource, Scalar};
pub use targets::TargetSet;
