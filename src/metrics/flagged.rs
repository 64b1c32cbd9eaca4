//! Flagged-service detection.
//!
//! A service is flagged when ANY one of the rating conditions holds.

use serde::{Deserialize, Serialize};

use crate::columns;
use crate::error::Result;
use crate::table::{Table, Value};

/// Rating thresholds that mark a service as concerning.
///
/// Whether a compliance rating of 1 is the worst or the best grade depends on
/// the data dictionary of the deployment, so the non-compliant value is
/// configurable rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlagThresholds {
    pub overall_star_max: f64,
    pub compliance_non_compliant_value: f64,
    pub residents_experience_max: f64,
    pub staffing_max: f64,
    pub quality_measures_max: f64,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            overall_star_max: 2.0,
            compliance_non_compliant_value: 1.0,
            residents_experience_max: 2.0,
            staffing_max: 2.0,
            quality_measures_max: 2.0,
        }
    }
}

/// Why a service was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlagReason {
    OverallStar,
    NonCompliant,
    ResidentsExperience,
    Staffing,
    QualityMeasures,
}

/// Column positions of the five rating fields.
struct RatingColumns {
    overall: usize,
    compliance: usize,
    residents: usize,
    staffing: usize,
    quality: usize,
}

impl RatingColumns {
    fn locate(table: &Table) -> Result<Self> {
        Ok(Self {
            overall: table.column_index(columns::OVERALL_STAR_RATING)?,
            compliance: table.column_index(columns::COMPLIANCE_RATING)?,
            residents: table.column_index(columns::RESIDENTS_EXPERIENCE_RATING)?,
            staffing: table.column_index(columns::STAFFING_RATING)?,
            quality: table.column_index(columns::QUALITY_MEASURES_RATING)?,
        })
    }

    fn reasons(&self, row: &[Value], t: &FlagThresholds) -> Vec<FlagReason> {
        let at_most = |idx: usize, max: f64| row[idx].as_f64().is_some_and(|v| v <= max);

        let mut reasons = Vec::new();
        if at_most(self.overall, t.overall_star_max) {
            reasons.push(FlagReason::OverallStar);
        }
        if row[self.compliance].as_f64() == Some(t.compliance_non_compliant_value) {
            reasons.push(FlagReason::NonCompliant);
        }
        if at_most(self.residents, t.residents_experience_max) {
            reasons.push(FlagReason::ResidentsExperience);
        }
        if at_most(self.staffing, t.staffing_max) {
            reasons.push(FlagReason::Staffing);
        }
        if at_most(self.quality, t.quality_measures_max) {
            reasons.push(FlagReason::QualityMeasures);
        }
        reasons
    }
}

/// Returns the flagged subset of `table` with its original columns and order.
///
/// Missing rating cells never satisfy a condition.
///
/// # Errors
///
/// Returns a schema error if any of the five rating columns is absent.
pub fn detect_flagged_services(table: &Table, thresholds: &FlagThresholds) -> Result<Table> {
    let cols = RatingColumns::locate(table)?;
    Ok(table.filter_rows(|row| !cols.reasons(row, thresholds).is_empty()))
}

/// Flag reasons for every row, in row order.
pub fn flag_reasons(table: &Table, thresholds: &FlagThresholds) -> Result<Vec<Vec<FlagReason>>> {
    let cols = RatingColumns::locate(table)?;
    Ok(table
        .rows()
        .iter()
        .map(|row| cols.reasons(row, thresholds))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;

    fn ratings() -> Table {
        Table::new([
            columns::SERVICE_NAME,
            columns::OVERALL_STAR_RATING,
            columns::COMPLIANCE_RATING,
            columns::RESIDENTS_EXPERIENCE_RATING,
            columns::STAFFING_RATING,
            columns::QUALITY_MEASURES_RATING,
        ])
        .with_row(vec!["Good".into(), 5.0.into(), 5.0.into(), 5.0.into(), 5.0.into(), 5.0.into()])
        .with_row(vec!["LowStar".into(), 1.5.into(), 5.0.into(), 5.0.into(), 5.0.into(), 5.0.into()])
        .with_row(vec!["NonCompliant".into(), 4.0.into(), 1.0.into(), 4.0.into(), 4.0.into(), 4.0.into()])
        .with_row(vec!["Gaps".into(), Value::Missing, Value::Missing, 4.0.into(), 3.0.into(), 2.0.into()])
    }

    #[test]
    fn test_single_condition_flags_row() {
        let flagged = detect_flagged_services(&ratings(), &FlagThresholds::default()).unwrap();
        let names = flagged.distinct(columns::SERVICE_NAME).unwrap();
        assert_eq!(names, vec!["LowStar", "NonCompliant", "Gaps"]);
        assert_eq!(flagged.columns(), ratings().columns());
    }

    #[test]
    fn test_missing_cells_do_not_flag() {
        let table = ratings();
        let reasons = flag_reasons(&table, &FlagThresholds::default()).unwrap();
        assert!(reasons[0].is_empty());
        assert_eq!(reasons[3], vec![FlagReason::QualityMeasures]);
    }

    #[test]
    fn test_custom_non_compliant_value() {
        let thresholds = FlagThresholds {
            compliance_non_compliant_value: 5.0,
            ..Default::default()
        };
        let flagged = detect_flagged_services(&ratings(), &thresholds).unwrap();
        assert_eq!(
            flagged.distinct(columns::SERVICE_NAME).unwrap(),
            vec!["Good", "LowStar", "Gaps"]
        );
    }

    #[test]
    fn test_missing_rating_column_is_schema_error() {
        let table = Table::new([columns::SERVICE_NAME, columns::OVERALL_STAR_RATING]);
        assert_eq!(
            detect_flagged_services(&table, &FlagThresholds::default()),
            Err(MetricsError::Schema(columns::COMPLIANCE_RATING.into()))
        );
    }
}
