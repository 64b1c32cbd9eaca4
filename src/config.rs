use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::metrics::compliance::ComplianceColumns;
use crate::metrics::flagged::FlagThresholds;

/// Deployment settings, stored as JSON:
/// ```json
/// {
///   "thresholds": { "overallStarMax": 2.0, "complianceNonCompliantValue": 1 },
///   "compliance_columns": { "rn_target": "RN care minutes - target" },
///   "top_n": 5
/// }
/// ```
/// Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RaterConfig {
    pub thresholds: FlagThresholds,
    pub compliance_columns: ComplianceColumns,
    pub top_n: usize,
}

impl Default for RaterConfig {
    fn default() -> Self {
        Self {
            thresholds: FlagThresholds::default(),
            compliance_columns: ComplianceColumns::default(),
            top_n: 5,
        }
    }
}

impl RaterConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read '{path}'"))?;
        let config: RaterConfig =
            serde_json::from_str(&content).with_context(|| format!("invalid config '{path}'"))?;
        debug!(path, "Config loaded");
        Ok(config)
    }

    /// Loads `path` if given, otherwise the defaults, then applies threshold
    /// overrides from the environment.
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.thresholds = config.thresholds.with_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }
}

pub const ENV_OVERALL_STAR_MAX: &str = "CARE_RATER_OVERALL_STAR_MAX";
pub const ENV_COMPLIANCE_NON_COMPLIANT: &str = "CARE_RATER_COMPLIANCE_NON_COMPLIANT";
pub const ENV_RESIDENTS_EXPERIENCE_MAX: &str = "CARE_RATER_RESIDENTS_EXPERIENCE_MAX";
pub const ENV_STAFFING_MAX: &str = "CARE_RATER_STAFFING_MAX";
pub const ENV_QUALITY_MEASURES_MAX: &str = "CARE_RATER_QUALITY_MEASURES_MAX";

impl FlagThresholds {
    /// Replaces thresholds whose variable is set. `lookup` is
    /// `std::env::var` outside tests; unparseable values are ignored with a
    /// warning.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut f64); 5] = [
            (ENV_OVERALL_STAR_MAX, &mut self.overall_star_max),
            (ENV_COMPLIANCE_NON_COMPLIANT, &mut self.compliance_non_compliant_value),
            (ENV_RESIDENTS_EXPERIENCE_MAX, &mut self.residents_experience_max),
            (ENV_STAFFING_MAX, &mut self.staffing_max),
            (ENV_QUALITY_MEASURES_MAX, &mut self.quality_measures_max),
        ];

        for (key, field) in fields {
            let Some(raw) = lookup(key) else { continue };
            match raw.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => *field = v,
                _ => warn!(key, value = %raw, "Ignoring invalid threshold override"),
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RaterConfig =
            serde_json::from_str(r#"{ "thresholds": { "staffingMax": 3 } }"#).unwrap();
        assert_eq!(config.thresholds.staffing_max, 3.0);
        assert_eq!(config.thresholds.overall_star_max, 2.0);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.compliance_columns, ComplianceColumns::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars = HashMap::from([
            (ENV_OVERALL_STAR_MAX, "1.5"),
            (ENV_COMPLIANCE_NON_COMPLIANT, "5"),
            (ENV_STAFFING_MAX, "not-a-number"),
        ]);
        let thresholds = FlagThresholds::default()
            .with_env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(thresholds.overall_star_max, 1.5);
        assert_eq!(thresholds.compliance_non_compliant_value, 5.0);
        assert_eq!(thresholds.staffing_max, 2.0);
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(RaterConfig::load("/nonexistent/care_rater.json").is_err());
    }
}
