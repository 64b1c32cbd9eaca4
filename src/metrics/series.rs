//! Data series behind the dashboard charts.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::columns::{self, WEEKDAYS};
use crate::error::{MetricsError, Result};
use crate::metrics::drilldown::parse_service_date;
use crate::table::Table;

pub const DEFAULT_HISTOGRAM_BINS: usize = 20;
pub const MAX_HISTOGRAM_BINS: usize = 1000;

/// Keywords identifying quality-indicator columns in the detailed sheet.
const INDICATOR_KEYWORDS: &[&str] = &["fall", "weight", "restraint", "medication", "injur"];

/// Total claimed amount per service date, ascending by date.
///
/// Rows with an unparseable date or a missing amount are skipped.
pub fn daily_claimed_totals(claims: &Table) -> Result<Vec<(NaiveDate, f64)>> {
    let dates = claims.column(columns::SERVICE_DATE)?;
    let amounts = claims.numeric_column(columns::CLAIMED_AMOUNT)?;

    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, amount) in dates.into_iter().zip(amounts) {
        if let (Some(date), Some(amount)) = (parse_service_date(date), amount) {
            *totals.entry(date).or_default() += amount;
        }
    }

    Ok(totals.into_iter().collect())
}

/// Claim count per weekday, always seven entries from Monday to Sunday.
pub fn weekday_counts(claims: &Table) -> Result<Vec<(&'static str, usize)>> {
    let days = claims.column(columns::DAY_OF_WEEK)?;
    let mut counts = [0usize; 7];
    for day in days {
        let day = day.to_string();
        if let Some(pos) = WEEKDAYS.iter().position(|w| *w == day) {
            counts[pos] += 1;
        }
    }
    Ok(WEEKDAYS.iter().copied().zip(counts).collect())
}

/// Occurrences of each value of `column`, sorted by value. Numeric values sort
/// numerically, so star ratings come out 1 through 5.
pub fn value_counts(table: &Table, column: &str) -> Result<Vec<(String, usize)>> {
    let idx = table.column_index(column)?;

    let mut numeric: Vec<(f64, String, usize)> = Vec::new();
    let mut text: BTreeMap<String, usize> = BTreeMap::new();

    for row in table.rows() {
        let cell = &row[idx];
        match cell.as_f64() {
            Some(n) => match numeric.iter_mut().find(|(v, _, _)| *v == n) {
                Some(entry) => entry.2 += 1,
                None => numeric.push((n, cell.to_string(), 1)),
            },
            None if !cell.is_missing() => *text.entry(cell.to_string()).or_default() += 1,
            None => {}
        }
    }

    numeric.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(numeric
        .into_iter()
        .map(|(_, label, count)| (label, count))
        .chain(text)
        .collect())
}

/// Values of `value_column` grouped by `category_column`, groups in
/// first-appearance order. Feeds box plots.
pub fn grouped_values(
    table: &Table,
    category_column: &str,
    value_column: &str,
) -> Result<Vec<(String, Vec<f64>)>> {
    let cat_idx = table.column_index(category_column)?;
    let values = table.numeric_column(value_column)?;

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();

    for (row, value) in table.rows().iter().zip(values) {
        let Some(value) = value else { continue };
        if row[cat_idx].is_missing() {
            continue;
        }
        let key = row[cat_idx].to_string();
        let pos = *positions.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[pos].1.push(value);
    }

    Ok(groups)
}

/// One histogram bucket covering `[lower, upper)`; the last bucket is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram of the defined values of `column`.
///
/// # Errors
///
/// Returns a validation error when `bins` is zero or above
/// [`MAX_HISTOGRAM_BINS`].
pub fn histogram(table: &Table, column: &str, bins: usize) -> Result<Vec<Bin>> {
    if bins == 0 || bins > MAX_HISTOGRAM_BINS {
        return Err(MetricsError::Validation(format!(
            "histogram bins must be between 1 and {MAX_HISTOGRAM_BINS}, got {bins}"
        )));
    }
    let values: Vec<f64> = table.numeric_column(column)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return Ok(vec![Bin {
            lower: min,
            upper: max,
            count: values.len(),
        }]);
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }

    Ok(out)
}

/// Columns whose names mention a quality indicator (falls, weight loss,
/// restraint, medication, injuries).
pub fn indicator_columns(table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| {
            let lower = c.to_lowercase();
            INDICATOR_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .cloned()
        .collect()
}
