/// This module decides which directory entries become scan tasks.
///
/// Only files with a tabular extension are scanned. The default is `csv`, compared without
/// regard to case, so `data.CSV` is picked up as well. Glob ignore patterns are matched
/// against the path with forward slashes, relative to the scanned directory when possible.
use glob::Pattern;
use std::path::Path;

/// Checks if a file has one of the accepted extensions
pub fn has_valid_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    if let Some(ext) = path.extension() {
        if let Some(ext_str) = ext.to_str() {
            return extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext_str));
        }
    }
    false
}

/// Checks if a file should be ignored based on ignore patterns
pub fn should_ignore(path: &Path, ignore_patterns: &[String]) -> bool {
    let normalized_path = path.to_string_lossy().replace('\\', "/");
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    ignore_patterns.iter().any(|pattern| match Pattern::new(pattern) {
        Ok(p) => p.matches(&normalized_path) || p.matches(&file_name),
        Err(_) => false,
    })
}

/// Determines if a file should be scanned
pub fn should_include_file(path: &Path, extensions: &[String], ignore_patterns: &[String]) -> bool {
    has_valid_extension(path, extensions) && !should_ignore(path, ignore_patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_only() -> Vec<String> {
        vec!["csv".to_string()]
    }

    #[test]
    fn test_has_valid_extension() {
        assert!(has_valid_extension(Path::new("data.csv"), &csv_only()));
        assert!(has_valid_extension(Path::new("DATA.CSV"), &csv_only()));
        assert!(!has_valid_extension(Path::new("data.txt"), &csv_only()));
        assert!(!has_valid_extension(Path::new("data.csv.bak"), &csv_only()));
        assert!(!has_valid_extension(Path::new("csv"), &csv_only()));

        let with_dot = vec![".tsv".to_string()];
        assert!(has_valid_extension(Path::new("data.tsv"), &with_dot));

        assert!(has_valid_extension(Path::new("anything"), &[]));
    }

    #[test]
    fn test_should_ignore() {
        let ignore_patterns = vec![
            "archive/**".to_string(),
            "*_backup.csv".to_string(),
            "tmp_[0-4].csv".to_string(),
        ];

        assert!(should_ignore(Path::new("archive/2023/a.csv"), &ignore_patterns));
        assert!(should_ignore(Path::new("jan_backup.csv"), &ignore_patterns));
        assert!(should_ignore(Path::new("sub/feb_backup.csv"), &ignore_patterns));
        assert!(should_ignore(Path::new("tmp_3.csv"), &ignore_patterns));

        assert!(!should_ignore(Path::new("tmp_7.csv"), &ignore_patterns));
        assert!(!should_ignore(Path::new("current/a.csv"), &ignore_patterns));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let ignore_patterns = vec!["[".to_string()];
        assert!(!should_ignore(Path::new("a.csv"), &ignore_patterns));
    }

    #[test]
    fn test_should_include_file() {
        let ignore_patterns = vec!["*_backup.csv".to_string()];

        assert!(should_include_file(Path::new("a.csv"), &csv_only(), &ignore_patterns));
        assert!(!should_include_file(Path::new("a.txt"), &csv_only(), &ignore_patterns));
        assert!(!should_include_file(
            Path::new("a_backup.csv"),
            &csv_only(),
            &ignore_patterns
        ));
    }
}
