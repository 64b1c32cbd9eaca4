//! Care-minutes compliance percentages.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

use crate::columns;
use crate::error::Result;
use crate::metrics::utility::mean;
use crate::table::{Table, Value};

/// Source columns for the actual/target care-minute pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceColumns {
    pub rn_actual: String,
    pub rn_target: String,
    pub total_actual: String,
    pub total_target: String,
}

impl Default for ComplianceColumns {
    fn default() -> Self {
        Self {
            rn_actual: columns::RN_CARE_MINUTES_ACTUAL.to_string(),
            rn_target: columns::RN_CARE_MINUTES_TARGET.to_string(),
            total_actual: columns::TOTAL_CARE_MINUTES_ACTUAL.to_string(),
            total_target: columns::TOTAL_CARE_MINUTES_TARGET.to_string(),
        }
    }
}

/// Mean compliance over a set of services.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComplianceMetric {
    pub rn_care_compliance_pct: Option<f64>,
    pub total_care_compliance_pct: Option<f64>,
}

/// `100 * actual / target`, or `None` when either side is missing, the
/// target is zero, or the result is not finite.
pub fn compliance_pct(actual: Option<f64>, target: Option<f64>) -> Option<f64> {
    let (actual, target) = (actual?, target?);
    if target == 0.0 || !target.is_finite() || !actual.is_finite() {
        return None;
    }
    let pct = 100.0 * actual / target;
    pct.is_finite().then_some(pct)
}

/// Adds `rn_care_compliance_pct` and `total_care_compliance_pct` using the
/// default source columns.
pub fn compute_compliance_metrics(table: &Table) -> Result<Table> {
    compute_compliance_metrics_with(table, &ComplianceColumns::default())
}

/// Adds the two compliance columns computed from `cols`.
///
/// Existing compliance columns are overwritten, so applying this twice
/// yields the same table.
///
/// # Errors
///
/// Returns a schema error naming the first missing source column.
pub fn compute_compliance_metrics_with(table: &Table, cols: &ComplianceColumns) -> Result<Table> {
    let rn_actual = table.numeric_column(&cols.rn_actual)?;
    let rn_target = table.numeric_column(&cols.rn_target)?;
    let total_actual = table.numeric_column(&cols.total_actual)?;
    let total_target = table.numeric_column(&cols.total_target)?;

    let pct_column = |actual: &[Option<f64>], target: &[Option<f64>]| -> Vec<Value> {
        actual
            .iter()
            .zip(target)
            .map(|(a, t)| Value::from_option(compliance_pct(*a, *t)))
            .collect()
    };

    let rn = pct_column(&rn_actual, &rn_target);
    let total = pct_column(&total_actual, &total_target);

    let undefined_rn = rn.iter().filter(|v| v.is_missing()).count();
    let undefined_total = total.iter().filter(|v| v.is_missing()).count();
    debug!(
        rows = table.len(),
        undefined_rn, undefined_total, "Computed compliance percentages"
    );

    let mut out = table.clone();
    out.set_column(columns::RN_CARE_COMPLIANCE_PCT, rn)?;
    out.set_column(columns::TOTAL_CARE_COMPLIANCE_PCT, total)?;
    Ok(out)
}

/// Borrows `table` when both compliance columns are already present, so
/// percentages computed from configured source columns are kept. Otherwise
/// computes them from the default source columns.
pub fn ensure_compliance_metrics(table: &Table) -> Result<Cow<'_, Table>> {
    if table.has_column(columns::RN_CARE_COMPLIANCE_PCT)
        && table.has_column(columns::TOTAL_CARE_COMPLIANCE_PCT)
    {
        Ok(Cow::Borrowed(table))
    } else {
        compute_compliance_metrics(table).map(Cow::Owned)
    }
}

/// Sector-wide mean compliance, excluding undefined percentages.
pub fn sector_compliance(table: &Table) -> Result<ComplianceMetric> {
    let table = ensure_compliance_metrics(table)?;

    Ok(ComplianceMetric {
        rn_care_compliance_pct: mean(&table.numeric_column(columns::RN_CARE_COMPLIANCE_PCT)?),
        total_care_compliance_pct: mean(
            &table.numeric_column(columns::TOTAL_CARE_COMPLIANCE_PCT)?,
        ),
    })
}
