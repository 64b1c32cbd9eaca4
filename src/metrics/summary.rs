//! Per-provider means, top-N ranking and quality-measure summaries.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{MetricsError, Result};
use crate::metrics::filter::{Selection, filter_by_category};
use crate::metrics::utility::{count_defined, mean, standard_error};
use crate::table::Table;

/// Smallest and largest number of providers a ranking shows.
pub const TOP_N_MIN: usize = 3;
pub const TOP_N_MAX: usize = 20;

/// Mean of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub key: String,
    pub mean: Option<f64>,
    /// Number of rows contributing a defined value.
    pub count: usize,
}

/// Group key to mean, in first-appearance order of the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupMeans {
    entries: Vec<GroupMean>,
}

impl GroupMeans {
    pub fn get(&self, key: &str) -> Option<&GroupMean> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupMean> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Arithmetic mean of `value_column` per distinct `group_column` value.
///
/// Undefined values are left out of both the sum and the count. Rows with a
/// missing group key are skipped.
pub fn summarize_by_provider(
    table: &Table,
    group_column: &str,
    value_column: &str,
) -> Result<GroupMeans> {
    let group_idx = table.column_index(group_column)?;
    let values = table.numeric_column(value_column)?;

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut series: Vec<(String, Vec<Option<f64>>)> = Vec::new();

    for (row, value) in table.rows().iter().zip(values) {
        let cell = &row[group_idx];
        if cell.is_missing() {
            continue;
        }
        let key = cell.to_string();
        let pos = *positions.entry(key.clone()).or_insert_with(|| {
            series.push((key, Vec::new()));
            series.len() - 1
        });
        series[pos].1.push(value);
    }

    let entries = series
        .into_iter()
        .map(|(key, values)| GroupMean {
            key,
            mean: mean(&values),
            count: count_defined(&values),
        })
        .collect();

    Ok(GroupMeans { entries })
}

/// The `n` highest means, descending.
///
/// `n` is clamped to `[TOP_N_MIN, TOP_N_MAX]`. Ties keep first-appearance
/// order; groups with an undefined mean rank last.
///
/// # Errors
///
/// Returns a validation error if `n` is zero.
pub fn top_n(summary: &GroupMeans, n: usize) -> Result<Vec<(String, Option<f64>)>> {
    if n < 1 {
        return Err(MetricsError::Validation(format!(
            "top-n must be at least 1, got {n}"
        )));
    }
    let n = n.clamp(TOP_N_MIN, TOP_N_MAX);

    let mut ranked: Vec<&GroupMean> = summary.entries.iter().collect();
    ranked.sort_by(|a, b| match (a.mean, b.mean) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    Ok(ranked
        .into_iter()
        .take(n)
        .map(|e| (e.key.clone(), e.mean))
        .collect())
}

/// Mean and standard error of one quality measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureSummary {
    pub measure_name: String,
    pub mean: Option<f64>,
    /// `None` when fewer than two values are defined; renderers should omit
    /// the error bar.
    pub standard_error: Option<f64>,
    pub count: usize,
}

/// Summarizes each measure column, optionally restricted to one provider.
pub fn compute_quality_measure_summary(
    table: &Table,
    provider_filter: Option<&Selection>,
    measure_columns: &[&str],
) -> Result<Vec<MeasureSummary>> {
    let scoped = match provider_filter {
        Some(selection) => filter_by_category(table, &selection.column, &selection.value)?,
        None => table.clone(),
    };

    measure_columns
        .iter()
        .map(|name| -> Result<MeasureSummary> {
            let values = scoped.numeric_column(name)?;
            Ok(MeasureSummary {
                measure_name: name.to_string(),
                mean: mean(&values),
                standard_error: standard_error(&values),
                count: count_defined(&values),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn scores() -> Table {
        Table::new(["Provider_ID", "Anomaly_Score"])
            .with_row(vec!["P1".into(), 10.0.into()])
            .with_row(vec!["P2".into(), 3.0.into()])
            .with_row(vec!["P1".into(), Value::Missing])
            .with_row(vec!["P3".into(), 3.0.into()])
            .with_row(vec!["P1".into(), 20.0.into()])
            .with_row(vec!["P4".into(), 8.0.into()])
            .with_row(vec!["P5".into(), Value::Missing])
    }

    #[test]
    fn test_mean_excludes_undefined() {
        let summary = summarize_by_provider(&scores(), "Provider_ID", "Anomaly_Score").unwrap();
        let p1 = summary.get("P1").unwrap();
        assert_eq!(p1.mean, Some(15.0));
        assert_eq!(p1.count, 2);
        assert_eq!(summary.get("P5").unwrap().mean, None);
    }

    #[test]
    fn test_summary_keeps_first_appearance_order() {
        let summary = summarize_by_provider(&scores(), "Provider_ID", "Anomaly_Score").unwrap();
        let keys: Vec<_> = summary.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["P1", "P2", "P3", "P4", "P5"]);
    }

    #[test]
    fn test_zero_padded_ids_stay_separate_groups() {
        let table = Table::new(["Provider_ID", "Anomaly_Score"])
            .with_row(vec![Value::parse("0012"), 1.0.into()])
            .with_row(vec![Value::parse("12"), 3.0.into()]);
        let summary = summarize_by_provider(&table, "Provider_ID", "Anomaly_Score").unwrap();

        assert_eq!(summary.len(), 2);
        assert_eq!(summary.get("0012").unwrap().mean, Some(1.0));
        assert_eq!(summary.get("12").unwrap().mean, Some(3.0));
    }

    #[test]
    fn test_top_n_descending_with_stable_ties() {
        let summary = summarize_by_provider(&scores(), "Provider_ID", "Anomaly_Score").unwrap();
        let top = top_n(&summary, 4).unwrap();
        let keys: Vec<_> = top.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["P1", "P4", "P2", "P3"]);
    }

    #[test]
    fn test_top_n_undefined_ranks_last() {
        let summary = summarize_by_provider(&scores(), "Provider_ID", "Anomaly_Score").unwrap();
        let top = top_n(&summary, 10).unwrap();
        assert_eq!(top.len(), 5);
        assert_eq!(top.last().unwrap(), &("P5".to_string(), None));
    }

    #[test]
    fn test_top_n_clamps() {
        let summary = summarize_by_provider(&scores(), "Provider_ID", "Anomaly_Score").unwrap();
        assert_eq!(top_n(&summary, 1).unwrap().len(), 3);
        assert!(matches!(top_n(&summary, 0), Err(MetricsError::Validation(_))));
    }

    #[test]
    fn test_quality_measure_summary() {
        let table = Table::new(["Service Name", "Falls", "Restraint"])
            .with_row(vec!["A".into(), 1.0.into(), 5.0.into()])
            .with_row(vec!["A".into(), 3.0.into(), Value::Missing])
            .with_row(vec!["B".into(), 10.0.into(), 2.0.into()]);

        let selection = Selection::new("Service Name", "A");
        let summary =
            compute_quality_measure_summary(&table, Some(&selection), &["Falls", "Restraint"])
                .unwrap();

        assert_eq!(summary[0].mean, Some(2.0));
        assert!((summary[0].standard_error.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(summary[1].mean, Some(5.0));
        assert_eq!(summary[1].standard_error, None);
    }

    #[test]
    fn test_quality_measure_summary_unknown_measure() {
        let table = Table::new(["Service Name"]);
        assert_eq!(
            compute_quality_measure_summary(&table, None, &["Falls"]),
            Err(MetricsError::Schema("Falls".into()))
        );
    }
}
