//! Most-common value aggregation.
//!
//! Counts display values of a column and keeps the most frequent ones.
//! Ties are broken by first appearance, so results are deterministic.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{ProcessError, ProcessResult};
use crate::table::{cell_text, Table};

/// Value counts in rank order, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedCounts(Vec<(String, usize)>);

impl OrderedCounts {
    pub fn entries(&self) -> &[(String, usize)] {
        &self.0
    }

    pub fn get(&self, value: &str) -> Option<usize> {
        self.0.iter().find(|(v, _)| v == value).map(|(_, n)| *n)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for OrderedCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (value, count) in &self.0 {
            map.serialize_entry(value, count)?;
        }
        map.end()
    }
}

/// Result of a most-common query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MostCommon {
    /// `top == 1`: the mode, or tied modes joined with `" & "`
    Single(String),
    /// `top > 1`: up to `top` values with their counts
    Ranked(OrderedCounts),
}

impl MostCommon {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Ranked(_) => None,
        }
    }

    pub fn as_ranked(&self) -> Option<&OrderedCounts> {
        match self {
            Self::Ranked(counts) => Some(counts),
            Self::Single(_) => None,
        }
    }
}

/// Count values, keeping first-appearance order among equal counts.
fn ranked_counts<I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }
    // Stable sort keeps first appearance among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Most common of already-extracted display values.
pub fn most_common_values<I>(values: I, top: usize) -> ProcessResult<Option<MostCommon>>
where
    I: IntoIterator<Item = String>,
{
    if top == 0 {
        return Err(ProcessError::InvalidArgument(
            "top must be at least 1".to_string(),
        ));
    }

    let counts = ranked_counts(values);
    let Some(best) = counts.first().map(|(_, n)| *n) else {
        return Ok(None);
    };

    if top == 1 {
        let tied: Vec<&str> = counts
            .iter()
            .take_while(|(_, n)| *n == best)
            .map(|(v, _)| v.as_str())
            .collect();
        return Ok(Some(MostCommon::Single(tied.join(" & "))));
    }

    let ranked = counts.into_iter().take(top).collect();
    Ok(Some(MostCommon::Ranked(OrderedCounts(ranked))))
}

/// Most common values of `column` in `table`.
///
/// Cells are compared by display text, so `0` and `"0"` count together.
/// Missing cells are skipped; a column with no values yields `None`.
pub fn most_common(table: &Table, column: &str, top: usize) -> ProcessResult<Option<MostCommon>> {
    table.require_columns(&[column])?;
    most_common_values(table.column(column).filter_map(cell_text), top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(values: Vec<serde_json::Value>) -> Table {
        Table::from_records(values.into_iter().map(|v| json!({ "x": v })).collect())
    }

    #[test]
    fn test_unique_mode() {
        let t = table(vec![json!("a"), json!("b"), json!("a")]);
        let result = most_common(&t, "x", 1).unwrap().unwrap();
        assert_eq!(result, MostCommon::Single("a".into()));
    }

    #[test]
    fn test_tied_mode_joined_in_first_appearance_order() {
        let t = table(vec![json!("b"), json!("a"), json!("a"), json!("b"), json!("c")]);
        let result = most_common(&t, "x", 1).unwrap().unwrap();
        assert_eq!(result.as_single(), Some("b & a"));
    }

    #[test]
    fn test_ranked_top_two() {
        let t = table(vec![
            json!("Maintenance"),
            json!("Human Factors"),
            json!("Maintenance"),
            json!("Engineering and Planning"),
            json!("Engineering and Planning"),
            json!("Maintenance"),
        ]);
        let result = most_common(&t, "x", 2).unwrap().unwrap();
        let ranked = result.as_ranked().unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked.get("Maintenance"), Some(3));
        assert_eq!(ranked.get("Engineering and Planning"), Some(2));
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"Maintenance":3,"Engineering and Planning":2}"#
        );
    }

    #[test]
    fn test_integer_column_mode() {
        let t = table([5, 3, 2, 1, 0, 0, 0, 1].into_iter().map(|n| json!(n)).collect());
        let result = most_common(&t, "x", 1).unwrap().unwrap();
        assert_eq!(result, MostCommon::Single("0".into()));
    }

    #[test]
    fn test_top_two_letters() {
        let t = table(["e", "a", "b", "c", "d", "e", "e", "c"].into_iter().map(|v| json!(v)).collect());
        let result = most_common(&t, "x", 2).unwrap().unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), json!({"e": 3, "c": 2}));
    }

    #[test]
    fn test_even_tie_joined() {
        let values = ["4", "4", "4", "4", "8", "8", "8", "8"];
        let t = table(values.into_iter().map(|v| json!(v)).collect());
        let result = most_common(&t, "x", 1).unwrap().unwrap();
        assert_eq!(result.as_single(), Some("4 & 8"));
    }

    #[test]
    fn test_numbers_and_strings_count_together() {
        let t = table(vec![json!(0), json!("0"), json!("1")]);
        let result = most_common(&t, "x", 1).unwrap().unwrap();
        assert_eq!(result.as_single(), Some("0"));
    }

    #[test]
    fn test_missing_values_skipped() {
        let t = table(vec![json!(null), json!(""), json!("nan")]);
        assert_eq!(most_common(&t, "x", 1).unwrap(), None);
    }

    #[test]
    fn test_top_zero_rejected() {
        let t = table(vec![json!("a")]);
        assert!(matches!(
            most_common(&t, "x", 0),
            Err(ProcessError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_column() {
        let t = table(vec![json!("a")]);
        assert!(matches!(
            most_common(&t, "y", 1),
            Err(ProcessError::MissingColumn(ref c)) if c == "y"
        ));
    }

    #[test]
    fn test_top_larger_than_distinct_values() {
        let result = most_common_values(vec!["a".to_string()], 3).unwrap().unwrap();
        assert_eq!(result.as_ranked().unwrap().len(), 1);
    }
}
