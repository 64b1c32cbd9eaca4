//! Conditional formatting as data: every cell maps to a [`StyleTag`] and the
//! renderer decides what each tag looks like.

use serde::Serialize;

use crate::columns;
use crate::error::Result;
use crate::metrics::flagged::FlagThresholds;
use crate::table::{Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StyleTag {
    Critical,
    Warning,
    Good,
    Neutral,
}

/// Compliance percentage below which a cell is a warning.
const COMPLIANCE_WARNING_PCT: f64 = 90.0;
const COMPLIANCE_GOOD_PCT: f64 = 100.0;

/// Style of a single cell.
pub fn cell_style(column: &str, value: &Value, thresholds: &FlagThresholds) -> StyleTag {
    let Some(v) = value.as_f64() else {
        return StyleTag::Neutral;
    };

    let rating_max = match column {
        columns::OVERALL_STAR_RATING => Some(thresholds.overall_star_max),
        columns::RESIDENTS_EXPERIENCE_RATING => Some(thresholds.residents_experience_max),
        columns::STAFFING_RATING => Some(thresholds.staffing_max),
        columns::QUALITY_MEASURES_RATING => Some(thresholds.quality_measures_max),
        _ => None,
    };

    if let Some(max) = rating_max {
        return if v <= max {
            StyleTag::Critical
        } else {
            StyleTag::Neutral
        };
    }

    match column {
        columns::COMPLIANCE_RATING | columns::JOINED_COMPLIANCE_RATING
            if v == thresholds.compliance_non_compliant_value =>
        {
            StyleTag::Critical
        }
        columns::RN_CARE_COMPLIANCE_PCT | columns::TOTAL_CARE_COMPLIANCE_PCT => {
            if v >= COMPLIANCE_GOOD_PCT {
                StyleTag::Good
            } else if v < COMPLIANCE_WARNING_PCT {
                StyleTag::Warning
            } else {
                StyleTag::Neutral
            }
        }
        _ => StyleTag::Neutral,
    }
}

/// Styles for every cell of row `row`, in column order.
pub fn row_styles(table: &Table, row: usize, thresholds: &FlagThresholds) -> Vec<StyleTag> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| cell_style(column, table.value(row, idx), thresholds))
        .collect()
}

/// Row styles keyed by the display value of `key_column`, in row order.
pub fn styled_rows(
    table: &Table,
    key_column: &str,
    thresholds: &FlagThresholds,
) -> Result<Vec<(String, Vec<StyleTag>)>> {
    let keys = table.column(key_column)?;
    Ok(keys
        .iter()
        .enumerate()
        .map(|(row, key)| (key.to_string(), row_styles(table, row, thresholds)))
        .collect())
}
