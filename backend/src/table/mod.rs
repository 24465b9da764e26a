//! Row-oriented table shared by every loader and transform.
//!
//! Rows are JSON objects keyed by column name, so the same type holds CSV
//! fixtures (all cells are strings) and warehouse results (typed cells).
//! Missing markers (`null`, empty string, `nan`, `null`) read as "no value".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LoadError, LoadResult, ProcessError, ProcessResult};
use crate::models::{CompanyScope, Domain};

/// One record of a table.
pub type Row = Map<String, Value>;

/// Ordered headers plus ordered rows. Column names are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from JSON objects. Headers follow first appearance of
    /// each key; non-object values are ignored.
    pub fn from_records(records: Vec<Value>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(records.len());

        for record in records {
            if let Value::Object(row) = record {
                for key in row.keys() {
                    if !headers.contains(key) {
                        headers.push(key.clone());
                    }
                }
                rows.push(row);
            }
        }

        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Fail with [`ProcessError::MissingColumn`] unless every column exists.
    pub fn require_columns(&self, columns: &[&str]) -> ProcessResult<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(ProcessError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Cells of one column in row order (`null` where a row lacks the key).
    pub fn column<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |row| row.get(column).unwrap_or(&Value::Null))
    }

    /// Keep the rows matching `keep`.
    pub fn retain<F>(mut self, mut keep: F) -> Self
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(|row| keep(row));
        self
    }

    /// Restrict the table to the companies in `scope`.
    ///
    /// An empty scope keeps every row. Zero remaining rows is an error:
    /// callers must report it rather than emit an empty artifact.
    pub fn scope(self, domain: Domain, scope: &CompanyScope) -> LoadResult<Self> {
        let column = domain.company_column();

        let scoped = if scope.is_all() {
            self
        } else {
            if !self.has_column(column) {
                return Err(LoadError::MissingColumn {
                    domain,
                    column: column.to_string(),
                });
            }
            self.retain(|row| {
                row.get(column)
                    .and_then(|v| v.as_str())
                    .is_some_and(|company| scope.contains(company))
            })
        };

        if scoped.is_empty() {
            return Err(LoadError::EmptyResult {
                domain,
                scope: scope.clone(),
            });
        }

        Ok(scoped)
    }
}

/// Display form of a cell, `None` for missing markers.
///
/// Numbers use their JSON text, so `0` and `"0"` read the same.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Text of `column` in `row`.
pub fn text(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(cell_text)
}

/// Numeric value of `column` in `row`. Thousands separators are accepted.
pub fn number(row: &Row, column: &str) -> Option<f64> {
    match row.get(column)? {
        Value::Number(n) => n.as_f64(),
        Value::String(_) => {
            let raw = text(row, column)?.replace(',', "");
            raw.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Optional numeric cell of `record`: blank reads as `None`, any other
/// non-numeric text is an [`ProcessError::InvalidValue`].
pub fn observation(row: &Row, column: &str, record: &str) -> ProcessResult<Option<f64>> {
    match (text(row, column), number(row, column)) {
        (None, _) => Ok(None),
        (Some(_), Some(v)) => Ok(Some(v)),
        (Some(raw), None) => Err(ProcessError::InvalidValue {
            column: column.to_string(),
            value: raw,
            record: record.to_string(),
        }),
    }
}

/// Items of a multi-valued cell, in first-appearance order without repeats.
///
/// Array cells (warehouse results) are read item by item; text cells are
/// split on `separator`.
pub fn list(row: &Row, column: &str, separator: char) -> Vec<String> {
    let items: Vec<String> = match row.get(column) {
        Some(Value::Array(values)) => values.iter().filter_map(cell_text).collect(),
        Some(value) => cell_text(value)
            .map(|raw| split_list(&raw, separator))
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let mut unique: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

/// Split a multi-valued cell on `separator`, trimming and dropping blanks.
pub fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
        .map(String::from)
        .collect()
}
