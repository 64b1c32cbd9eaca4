//! Provider drill-down: per-provider summaries over the quality data and
//! per-provider claim listings.

use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

use crate::columns;
use crate::error::Result;
use crate::metrics::compliance::ensure_compliance_metrics;
use crate::metrics::filter::filter_by_category;
use crate::metrics::flagged::{FlagThresholds, flag_reasons};
use crate::metrics::summary::summarize_by_provider;
use crate::metrics::tier::{Tier, classify_provider_tier};
use crate::table::{Table, Value};

/// Summary statistics for one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub provider: String,
    pub entry_count: usize,
    pub mean_overall_rating: Option<f64>,
    pub mean_rn_compliance: Option<f64>,
    pub mean_total_compliance: Option<f64>,
    pub tier: Tier,
    pub tier_label: String,
    pub flagged_service_count: usize,
}

/// Builds one [`ProviderSummary`] per distinct `group_column` value, in
/// first-appearance order.
///
/// Compliance percentages already on `table` are used as they are; they are
/// only computed from the default source columns when absent.
pub fn summarize_providers(
    table: &Table,
    group_column: &str,
    thresholds: &FlagThresholds,
) -> Result<Vec<ProviderSummary>> {
    let table = ensure_compliance_metrics(table)?;
    let group_idx = table.column_index(group_column)?;

    let ratings = summarize_by_provider(&table, group_column, columns::OVERALL_STAR_RATING)?;
    let rn = summarize_by_provider(&table, group_column, columns::RN_CARE_COMPLIANCE_PCT)?;
    let total = summarize_by_provider(&table, group_column, columns::TOTAL_CARE_COMPLIANCE_PCT)?;
    let reasons = flag_reasons(&table, thresholds)?;

    let summaries = ratings
        .iter()
        .map(|group| {
            let mut entry_count = 0;
            let mut flagged_service_count = 0;
            for (row, row_reasons) in table.rows().iter().zip(&reasons) {
                if row[group_idx].is_missing() || row[group_idx].to_string() != group.key {
                    continue;
                }
                entry_count += 1;
                if !row_reasons.is_empty() {
                    flagged_service_count += 1;
                }
            }

            let mean_rn_compliance = rn.get(&group.key).and_then(|g| g.mean);
            let mean_total_compliance = total.get(&group.key).and_then(|g| g.mean);
            let tier =
                classify_provider_tier(group.mean, mean_rn_compliance, mean_total_compliance);

            ProviderSummary {
                provider: group.key.clone(),
                entry_count,
                mean_overall_rating: group.mean,
                mean_rn_compliance,
                mean_total_compliance,
                tier,
                tier_label: tier.to_string(),
                flagged_service_count,
            }
        })
        .collect();

    Ok(summaries)
}

/// A single provider's claims.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimsDrilldown {
    /// Claims sorted by service date, newest first, with an added
    /// `Anomaly_Score_Positive` column.
    pub claims: Table,
    /// Compliance and staffing ratings of the matched real service, when the
    /// claims were joined.
    pub compliance_rating: Option<String>,
    pub staffing_rating: Option<String>,
}

/// Selects `provider` from `provider_column` and prepares it for the
/// scatter plot and detail table.
pub fn provider_drilldown(
    claims: &Table,
    provider_column: &str,
    provider: &str,
) -> Result<ClaimsDrilldown> {
    let mut drill = filter_by_category(claims, provider_column, provider)?;

    let positive = drill
        .numeric_column(columns::ANOMALY_SCORE)?
        .into_iter()
        .map(|score| Value::from_option(score.map(f64::abs)))
        .collect();
    drill.set_column(columns::ANOMALY_SCORE_POSITIVE, positive)?;

    let date_idx = drill.column_index(columns::SERVICE_DATE)?;
    drill.sort_rows_by(|a, b| compare_dates_desc(&a[date_idx], &b[date_idx]));

    let header = |column: &str| -> Result<Option<String>> {
        if !drill.has_column(column) {
            return Ok(None);
        }
        Ok(drill.column(column)?.first().map(|v| v.to_string()))
    };

    let compliance_rating = header(columns::JOINED_COMPLIANCE_RATING)?;
    let staffing_rating = header(columns::JOINED_STAFFING_RATING)?;

    Ok(ClaimsDrilldown {
        claims: drill,
        compliance_rating,
        staffing_rating,
    })
}

/// Parses a service date cell. Accepts ISO dates and ISO date-times.
pub fn parse_service_date(value: &Value) -> Option<NaiveDate> {
    let raw = match value {
        Value::Text(s) => s.as_str(),
        _ => return None,
    };
    let date_part = raw.split([' ', 'T']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn compare_dates_desc(a: &Value, b: &Value) -> Ordering {
    match (parse_service_date(a), parse_service_date(b)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
