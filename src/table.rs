//! Row-oriented table with named columns.
//!
//! Every loader produces a [`Table`] and every metric operation consumes one.
//! Cells are loosely typed: numbers, text, or an explicit missing marker.

use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::error::{MetricsError, Result};

/// A single cell value.
///
/// Numbers read from a file keep their source text, so identifiers such as
/// `0012` or `1e3` display and compare exactly as written.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64, Option<String>),
    Text(String),
    Missing,
}

impl Value {
    /// Infers a cell from its raw text: blank is missing, finite numbers are
    /// numeric, anything else is kept as text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n, Some(trimmed.to_string())),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    /// A computed number with no source text.
    pub fn number(n: f64) -> Self {
        Value::Number(n, None)
    }

    /// Wraps an optional number, mapping `None` and non-finite values to missing.
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(n) if n.is_finite() => Value::number(n),
            _ => Value::Missing,
        }
    }

    /// Returns the numeric value, if this cell holds a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n, _) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(_, Some(raw)) => f.write_str(raw),
            Value::Number(n, None) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Missing => Ok(()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Number(n, _) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Missing => serializer.serialize_none(),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// A table of rows sharing one ordered column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// An empty table with no columns, used when a source fails to load.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends a row. Short rows are padded with missing cells and long rows
    /// are truncated to the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Missing);
        self.rows.push(row);
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.push_row(row);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Looks up a column position.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Schema`] naming the column if it is absent.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| MetricsError::Schema(name.to_string()))
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Value::Missing)
    }

    /// All values of a column in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Numeric view of a column; non-numeric and missing cells become `None`.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_f64()).collect())
    }

    /// Distinct display values of a column in first-appearance order,
    /// skipping missing cells.
    pub fn distinct(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.column_index(name)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            if row[idx].is_missing() {
                continue;
            }
            let key = row[idx].to_string();
            if seen.insert(key.clone()) {
                out.push(key);
            }
        }
        Ok(out)
    }

    /// Keeps the rows matching `keep`, preserving order and columns.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Sets a column, replacing it in place if it exists and appending it
    /// otherwise. `values` must have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(MetricsError::Validation(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.columns.iter().position(|c| c == name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }

        Ok(())
    }

    /// Reorders rows by `compare`. The sort is stable.
    pub fn sort_rows_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&[Value], &[Value]) -> std::cmp::Ordering,
    {
        self.rows.sort_by(|a, b| compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(["Provider_ID", "Region", "Claimed_Hours"])
            .with_row(vec!["P1".into(), "North".into(), 2.0.into()])
            .with_row(vec!["P2".into(), "South".into(), Value::Missing])
            .with_row(vec!["P1".into(), "South".into(), 4.5.into()])
    }

    #[test]
    fn test_parse_infers_types() {
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse("  "), Value::Missing);
        assert_eq!(Value::parse("3.5").as_f64(), Some(3.5));
        assert_eq!(Value::parse("North"), Value::Text("North".into()));
        assert_eq!(Value::parse("inf"), Value::Text("inf".into()));
    }

    #[test]
    fn test_number_display_drops_trailing_zero() {
        assert_eq!(Value::number(1001.0).to_string(), "1001");
        assert_eq!(Value::number(2.5).to_string(), "2.5");
        assert_eq!(Value::Missing.to_string(), "");
    }

    #[test]
    fn test_parsed_numbers_keep_source_text() {
        let padded = Value::parse("0012");
        assert_eq!(padded.as_f64(), Some(12.0));
        assert_eq!(padded.to_string(), "0012");
        assert_eq!(Value::parse("1e3").to_string(), "1e3");
        assert_ne!(Value::parse("0012"), Value::parse("12"));

        let table = Table::new(["Provider_ID"])
            .with_row(vec![Value::parse("0012")])
            .with_row(vec![Value::parse("12")]);
        assert_eq!(table.distinct("Provider_ID").unwrap(), vec!["0012", "12"]);
    }

    #[test]
    fn test_numbers_serialize_as_json_numbers() {
        let row = vec![Value::parse("05"), "North".into(), Value::Missing];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[5.0,"North",null]"#);
    }

    #[test]
    fn test_column_index_missing_is_schema_error() {
        let table = sample();
        assert_eq!(
            table.column_index("Nope"),
            Err(MetricsError::Schema("Nope".into()))
        );
    }

    #[test]
    fn test_distinct_keeps_first_appearance_order() {
        let table = sample();
        assert_eq!(table.distinct("Region").unwrap(), vec!["North", "South"]);
        assert_eq!(table.distinct("Provider_ID").unwrap(), vec!["P1", "P2"]);
    }

    #[test]
    fn test_set_column_replaces_existing() {
        let mut table = sample();
        table
            .set_column("Claimed_Hours", vec![1.0.into(), 1.0.into(), 1.0.into()])
            .unwrap();
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.numeric_column("Claimed_Hours").unwrap(), vec![Some(1.0); 3]);
    }

    #[test]
    fn test_set_column_rejects_wrong_length() {
        let mut table = sample();
        assert!(table.set_column("x", vec![Value::Missing]).is_err());
    }

    #[test]
    fn test_push_row_pads_short_rows() {
        let mut table = Table::new(["a", "b"]);
        table.push_row(vec![1.0.into()]);
        assert_eq!(table.value(0, 1), &Value::Missing);
    }
}
