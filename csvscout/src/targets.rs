use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::errors::{ScanError, ScanResult};
use crate::source::Scalar;

/// The set of values being searched for.
///
/// Targets are normalized with the same inference the row source applies to cells, so a
/// target of `42` finds cells reading `42`, `042` or `42.0`, and duplicates collapse.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    ints: HashSet<i64>,
    floats: HashSet<u64>,
    texts: HashSet<String>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from raw target strings; blank entries are skipped
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        set.extend(values);
        set
    }

    /// Loads targets from a newline-delimited file.
    ///
    /// Each line is trimmed; blank lines contribute nothing.
    pub fn load(path: &Path) -> ScanResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ScanError::target_load(path, e))?;
        let set = Self::from_values(contents.lines());
        debug!("Loaded {} targets from {}", set.len(), path.display());
        Ok(set)
    }

    /// Adds one raw target. Returns false if it was blank or already present.
    pub fn insert(&mut self, raw: &str) -> bool {
        match Scalar::infer(raw.trim()) {
            Scalar::Null => false,
            Scalar::Int(i) => self.ints.insert(i),
            Scalar::Float(f) => self.floats.insert(f.to_bits()),
            Scalar::Text(s) => self.texts.insert(s),
        }
    }

    pub fn extend<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for value in values {
            self.insert(value.as_ref());
        }
    }

    /// Adds every target of `other`
    pub fn merge(&mut self, other: TargetSet) {
        self.ints.extend(other.ints);
        self.floats.extend(other.floats);
        self.texts.extend(other.texts);
    }

    /// Returns true if the cell value equals one of the targets
    pub fn contains(&self, value: &Scalar) -> bool {
        match value {
            Scalar::Null => false,
            Scalar::Int(i) => self.ints.contains(i),
            Scalar::Float(f) => self.floats.contains(&f.to_bits()),
            Scalar::Text(s) => self.texts.contains(s.as_str()),
        }
    }

    pub fn len(&self) -> usize {
        self.ints.len() + self.floats.len() + self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All targets in their normalized form, sorted for display
    pub fn values(&self) -> Vec<String> {
        let mut values: Vec<String> = self
            .ints
            .iter()
            .map(|i| i.to_string())
            .chain(self.floats.iter().map(|b| f64::from_bits(*b).to_string()))
            .chain(self.texts.iter().cloned())
            .collect();
        values.sort();
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_duplicates_collapse() {
        let set = TargetSet::from_values(["42", "042", "42.0", "X", "X"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Scalar::Int(42)));
        assert!(set.contains(&Scalar::Text("X".to_string())));
    }

    #[test]
    fn test_blank_targets_skipped() {
        let mut set = TargetSet::new();
        assert!(!set.insert(""));
        assert!(!set.insert("   "));
        assert!(set.is_empty());
    }

    #[test]
    fn test_null_never_contained() {
        let set = TargetSet::from_values(["a"]);
        assert!(!set.contains(&Scalar::Null));
    }

    #[test]
    fn test_text_and_number_are_distinct() {
        let set = TargetSet::from_values(["1.5", "abc"]);
        assert!(set.contains(&Scalar::Float(1.5)));
        assert!(!set.contains(&Scalar::Text("1.5".to_string())));
        assert!(!set.contains(&Scalar::Text("ABC".to_string())));
    }

    #[test]
    fn test_load_trims_and_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("containers.txt");
        std::fs::write(&path, "  MSCU1234567 \n\n\tTGHU7654321\n   \n").unwrap();

        let set = TargetSet::load(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.values(), vec!["MSCU1234567", "TGHU7654321"]);
    }

    #[test]
    fn test_merge() {
        let mut set = TargetSet::from_values(["A", "1"]);
        set.merge(TargetSet::from_values(["1.0", "2.5"]));
        assert_eq!(set.len(), 3);
        assert!(set.contains(&Scalar::Float(2.5)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = TargetSet::load(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, ScanError::TargetLoadError { .. }));
    }
}
