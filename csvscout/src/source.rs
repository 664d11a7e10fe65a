use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

use crate::errors::{ScanError, ScanResult};

/// A single cell value as inferred from its text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Infers the typed value of a raw cell.
    ///
    /// Empty cells are `Null`. Anything parsing as an `i64` is `Int`; finite floats are
    /// `Float`, folded into `Int` when they hold an integral value. Digit strings too long
    /// for an `i64` and everything else are kept verbatim as `Text`.
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return Scalar::Null;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Scalar::Int(i);
        }
        if is_integer_literal(raw) {
            return Scalar::Text(raw.to_string());
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => {
                // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Scalar::Int(f as i64)
                } else {
                    Scalar::Float(f)
                }
            }
            _ => Scalar::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

/// An optional sign followed by decimal digits only
fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Identifies a column by header name, or by position when the header cell is blank
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ColumnId {
    Name(String),
    Index(usize),
}

impl ColumnId {
    fn from_header(index: usize, header: &str) -> Self {
        if header.trim().is_empty() {
            ColumnId::Index(index)
        } else {
            ColumnId::Name(header.to_string())
        }
    }
}

/// Column ids for a header row; a repeated name gets a `.1`, `.2`, ... suffix
fn unique_columns<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<ColumnId> {
    let mut columns: Vec<ColumnId> = Vec::new();
    for (index, header) in headers.enumerate() {
        let mut column = ColumnId::from_header(index, header);
        if let ColumnId::Name(name) = column.clone() {
            let mut suffix = 1;
            while columns.contains(&column) {
                column = ColumnId::Name(format!("{}.{}", name, suffix));
                suffix += 1;
            }
        }
        columns.push(column);
    }
    columns
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnId::Name(name) => f.write_str(name),
            ColumnId::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for ColumnId {
    fn from(name: &str) -> Self {
        ColumnId::Name(name.to_string())
    }
}

/// One data record: an ordered mapping from column to value.
///
/// Rows of the same file share their column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[ColumnId]>,
    values: Vec<Scalar>,
}

impl Row {
    pub fn new(columns: Arc<[ColumnId]>, values: Vec<Scalar>) -> Self {
        Self { columns, values }
    }

    /// Builds a row from `(header, raw value)` pairs, inferring every value
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let (columns, values): (Vec<ColumnId>, Vec<Scalar>) = pairs
            .into_iter()
            .enumerate()
            .map(|(i, (header, raw))| (ColumnId::from_header(i, header), Scalar::infer(raw)))
            .unzip();
        Self::new(columns.into(), values)
    }

    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cells in column order. Records shorter than the header only yield the cells they have.
    pub fn iter(&self) -> impl Iterator<Item = (&ColumnId, &Scalar)> {
        self.columns.iter().zip(self.values.iter())
    }
}

/// Gives access to the rows of one tabular file.
///
/// Implementations are shared by every worker, so they must be `Send + Sync`. The row
/// iterator owns whatever handle it reads from and releases it when dropped.
pub trait RowSource: Send + Sync {
    type Rows: Iterator<Item = ScanResult<Row>>;

    fn open(&self, path: &Path) -> ScanResult<Self::Rows>;
}

/// [`RowSource`] for delimited text files with a header row
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    delimiter: u8,
    flexible: bool,
}

impl Default for CsvRowSource {
    fn default() -> Self {
        Self {
            delimiter: b',',
            flexible: false,
        }
    }
}

impl CsvRowSource {
    pub fn new(delimiter: u8, flexible: bool) -> Self {
        Self {
            delimiter,
            flexible,
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl RowSource for CsvRowSource {
    type Rows = CsvRows;

    fn open(&self, path: &Path) -> ScanResult<CsvRows> {
        trace!("Opening CSV file: {}", path.display());
        let file = File::open(path).map_err(|e| ScanError::file_io(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(self.flexible)
            .has_headers(true)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| ScanError::from_csv(path, e))?
            .clone();
        if headers.is_empty() {
            return Err(ScanError::file_parse(path, "file has no header row"));
        }

        let columns: Arc<[ColumnId]> = unique_columns(headers.iter()).into();

        Ok(CsvRows {
            path: path.to_path_buf(),
            reader,
            columns,
            record: csv::StringRecord::new(),
            done: false,
        })
    }
}

/// Row iterator over an open CSV file; the file closes when this is dropped
#[derive(Debug)]
pub struct CsvRows {
    path: PathBuf,
    reader: csv::Reader<File>,
    columns: Arc<[ColumnId]>,
    record: csv::StringRecord,
    done: bool,
}

impl CsvRows {
    fn columns_for(&self, width: usize) -> Arc<[ColumnId]> {
        if width <= self.columns.len() {
            return Arc::clone(&self.columns);
        }
        // Flexible mode can yield records wider than the header
        self.columns
            .iter()
            .cloned()
            .chain((self.columns.len()..width).map(ColumnId::Index))
            .collect::<Vec<_>>()
            .into()
    }
}

impl Iterator for CsvRows {
    type Item = ScanResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let values = self.record.iter().map(Scalar::infer).collect();
                let columns = self.columns_for(self.record.len());
                Some(Ok(Row::new(columns, values)))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(ScanError::from_csv(&self.path, e)))
            }
        }
    }
}
