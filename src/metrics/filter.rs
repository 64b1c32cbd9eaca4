//! Categorical selectors.

use serde::{Deserialize, Serialize};

use crate::columns::ALL;
use crate::error::Result;
use crate::table::Table;

/// One selector chosen by the user, e.g. `Region = North`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub column: String,
    pub value: String,
}

impl Selection {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Builds a selection from an optional CLI value, treating `None` as `"All"`.
    pub fn from_option(column: &str, value: Option<&str>) -> Self {
        Self::new(column, value.unwrap_or(ALL))
    }

    pub fn is_all(&self) -> bool {
        self.value == ALL
    }
}

/// Keeps rows whose `column` displays as `value`. `"All"` returns the table
/// unchanged.
///
/// # Errors
///
/// Returns a schema error if `column` does not exist, even for `"All"`.
pub fn filter_by_category(table: &Table, column: &str, value: &str) -> Result<Table> {
    let idx = table.column_index(column)?;
    if value == ALL {
        return Ok(table.clone());
    }
    Ok(table.filter_rows(|row| row[idx].to_string() == value))
}

/// Applies each selection in turn.
pub fn apply_selections(table: &Table, selections: &[Selection]) -> Result<Table> {
    let mut out = table.clone();
    for selection in selections {
        out = filter_by_category(&out, &selection.column, &selection.value)?;
    }
    Ok(out)
}

/// Selector options for a column: `"All"` followed by its sorted distinct values.
pub fn selector_options(table: &Table, column: &str) -> Result<Vec<String>> {
    let mut values = table.distinct(column)?;
    values.sort();
    let mut options = Vec::with_capacity(values.len() + 1);
    options.push(ALL.to_string());
    options.extend(values);
    Ok(options)
}
