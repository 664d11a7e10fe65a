use crate::source::{ColumnId, Row, Scalar};
use crate::targets::TargetSet;

/// Finds the cells of `row` whose value is one of the targets.
///
/// Cells are compared by exact value after type inference; a row can match in several
/// columns and every one of them is returned, in column order. Empty cells never match.
pub fn matches<'r>(row: &'r Row, targets: &TargetSet) -> Vec<(&'r ColumnId, &'r Scalar)> {
    row.iter()
        .filter(|(_, value)| targets.contains(value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_match() {
        let row = Row::from_pairs([("col1", "X"), ("col2", "Y")]);
        let targets = TargetSet::from_values(["X"]);

        let found = matches(&row, &targets);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, &ColumnId::from("col1"));
        assert_eq!(found[0].1, &Scalar::Text("X".to_string()));
    }

    #[test]
    fn test_multiple_columns_in_order() {
        let row = Row::from_pairs([("a", "X"), ("b", "Z"), ("c", "X"), ("d", "Y")]);
        let targets = TargetSet::from_values(["X", "Y"]);

        let columns: Vec<String> = matches(&row, &targets)
            .into_iter()
            .map(|(column, _)| column.to_string())
            .collect();
        assert_eq!(columns, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_no_substring_or_case_matching() {
        let row = Row::from_pairs([("a", "XX"), ("b", "x"), ("c", "aXb")]);
        let targets = TargetSet::from_values(["X"]);
        assert!(matches(&row, &targets).is_empty());
    }

    #[test]
    fn test_numeric_normalization() {
        let row = Row::from_pairs([("qty", "42.0"), ("code", "042"), ("price", "4.20")]);
        let targets = TargetSet::from_values(["42", "4.2"]);
        assert_eq!(matches(&row, &targets).len(), 3);
    }

    #[test]
    fn test_empty_cells_never_match() {
        let row = Row::from_pairs([("a", ""), ("b", "")]);
        let targets = TargetSet::from_values(["", " "]);
        assert!(matches(&row, &targets).is_empty());
    }
}
