//! Associates simulated claim providers with real services from the star
//! ratings extract.
//!
//! The simulated provider IDs have no natural key into the real-world data,
//! so the pairing is delegated to a [`JoinStrategy`]. [`ExplicitMapping`] is
//! the reproducible default; [`RandomSampleJoin`] is the random
//! demonstration pairing and is only stable when seeded.

use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::columns;
use crate::error::Result;
use crate::table::{Table, Value};

/// Decides which real service each simulated provider is shown as.
pub trait JoinStrategy {
    /// Name used in logs.
    fn label(&self) -> &'static str;

    /// Returns provider ID to service name. Providers left out are shown
    /// under their own ID with unknown ratings.
    fn build_mapping(
        &self,
        provider_ids: &[String],
        service_names: &[String],
    ) -> HashMap<String, String>;
}

/// A caller-supplied provider ID to service name table.
///
/// Stored on disk as a plain JSON object:
/// ```json
/// { "P001": "Sunrise Lodge", "P002": "Harbour View Care" }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExplicitMapping {
    entries: HashMap<String, String>,
}

impl ExplicitMapping {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Loads the mapping from a JSON file at `path`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read provider mapping '{path}'"))?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("invalid provider mapping '{path}'"))?;
        Ok(Self { entries })
    }
}

impl JoinStrategy for ExplicitMapping {
    fn label(&self) -> &'static str {
        "explicit"
    }

    fn build_mapping(
        &self,
        provider_ids: &[String],
        service_names: &[String],
    ) -> HashMap<String, String> {
        provider_ids
            .iter()
            .filter_map(|id| {
                let name = self.entries.get(id)?;
                service_names
                    .contains(name)
                    .then(|| (id.clone(), name.clone()))
            })
            .collect()
    }
}

/// Pairs the i-th distinct provider with the i-th distinct service.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedJoin;

impl JoinStrategy for OrderedJoin {
    fn label(&self) -> &'static str {
        "ordered"
    }

    fn build_mapping(
        &self,
        provider_ids: &[String],
        service_names: &[String],
    ) -> HashMap<String, String> {
        provider_ids
            .iter()
            .cloned()
            .zip(service_names.iter().cloned())
            .collect()
    }
}

/// Demo mode: samples services without replacement.
///
/// Without a seed the pairing changes on every run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSampleJoin {
    pub seed: Option<u64>,
}

impl JoinStrategy for RandomSampleJoin {
    fn label(&self) -> &'static str {
        "random-sample"
    }

    fn build_mapping(
        &self,
        provider_ids: &[String],
        service_names: &[String],
    ) -> HashMap<String, String> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                warn!("Random sample join without a seed is not reproducible");
                StdRng::from_entropy()
            }
        };

        let amount = provider_ids.len().min(service_names.len());
        let sample: Vec<&String> = service_names.choose_multiple(&mut rng, amount).collect();

        provider_ids
            .iter()
            .cloned()
            .zip(sample.into_iter().cloned())
            .collect()
    }
}

/// Adds `Real_Provider_Name`, `Compliance_Rating` and `Staffing_Rating` to the
/// claims table.
///
/// An empty quality table maps every provider to itself with `"Unknown"`
/// ratings. Missing rating cells also become `"Unknown"`.
///
/// # Errors
///
/// Returns a schema error if the claims lack `Provider_ID` or a non-empty
/// quality table lacks the service name or rating columns.
pub fn join_synthetic_to_real(
    claims: &Table,
    quality: &Table,
    strategy: &dyn JoinStrategy,
) -> Result<Table> {
    let provider_idx = claims.column_index(columns::PROVIDER_ID)?;

    let mut ratings: HashMap<String, (Value, Value)> = HashMap::new();
    let mut mapping: HashMap<String, String> = HashMap::new();

    if quality.is_empty() {
        warn!("Quality table is empty, using provider IDs with unknown ratings");
    } else {
        let name_idx = quality.column_index(columns::SERVICE_NAME)?;
        let compliance_idx = quality.column_index(columns::COMPLIANCE_RATING)?;
        let staffing_idx = quality.column_index(columns::STAFFING_RATING)?;

        for row in quality.rows() {
            if row[name_idx].is_missing() {
                continue;
            }
            ratings
                .entry(row[name_idx].to_string())
                .or_insert_with(|| (row[compliance_idx].clone(), row[staffing_idx].clone()));
        }

        let provider_ids = claims.distinct(columns::PROVIDER_ID)?;
        let service_names = quality.distinct(columns::SERVICE_NAME)?;
        mapping = strategy.build_mapping(&provider_ids, &service_names);

        info!(
            strategy = strategy.label(),
            providers = provider_ids.len(),
            services = service_names.len(),
            mapped = mapping.len(),
            "Joined simulated providers to real services"
        );
    }

    let unknown = || Value::Text(columns::UNKNOWN.to_string());
    let known = |v: &Value| if v.is_missing() { unknown() } else { v.clone() };

    let mut names = Vec::with_capacity(claims.len());
    let mut compliance = Vec::with_capacity(claims.len());
    let mut staffing = Vec::with_capacity(claims.len());

    for row in claims.rows() {
        let id = &row[provider_idx];
        let resolved = mapping
            .get(&id.to_string())
            .and_then(|name| ratings.get(name).map(|r| (name, r)));

        match resolved {
            Some((name, (c, s))) => {
                names.push(Value::Text(name.clone()));
                compliance.push(known(c));
                staffing.push(known(s));
            }
            None => {
                names.push(id.clone());
                compliance.push(unknown());
                staffing.push(unknown());
            }
        }
    }

    let mut out = claims.clone();
    out.set_column(columns::REAL_PROVIDER_NAME, names)?;
    out.set_column(columns::JOINED_COMPLIANCE_RATING, compliance)?;
    out.set_column(columns::JOINED_STAFFING_RATING, staffing)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;

    fn claims() -> Table {
        Table::new([columns::PROVIDER_ID, columns::CLAIMED_AMOUNT])
            .with_row(vec!["P1".into(), 100.0.into()])
            .with_row(vec!["P2".into(), 50.0.into()])
            .with_row(vec!["P1".into(), 75.0.into()])
            .with_row(vec!["P3".into(), 20.0.into()])
    }

    fn quality() -> Table {
        Table::new([
            columns::SERVICE_NAME,
            columns::COMPLIANCE_RATING,
            columns::STAFFING_RATING,
        ])
        .with_row(vec!["Sunrise Lodge".into(), 4.0.into(), 3.0.into()])
        .with_row(vec!["Harbour View".into(), 1.0.into(), Value::Missing])
    }

    fn strings(table: &Table, column: &str) -> Vec<String> {
        table
            .column(column)
            .unwrap()
            .iter()
            .map(|v| v.to_string())
            .collect()
    }

    #[test]
    fn test_ordered_join_is_deterministic() {
        let out = join_synthetic_to_real(&claims(), &quality(), &OrderedJoin).unwrap();
        assert_eq!(
            strings(&out, columns::REAL_PROVIDER_NAME),
            vec!["Sunrise Lodge", "Harbour View", "Sunrise Lodge", "P3"]
        );
        assert_eq!(
            strings(&out, columns::JOINED_COMPLIANCE_RATING),
            vec!["4", "1", "4", "Unknown"]
        );
        assert_eq!(
            strings(&out, columns::JOINED_STAFFING_RATING),
            vec!["3", "Unknown", "3", "Unknown"]
        );
    }

    #[test]
    fn test_empty_quality_falls_back_to_identity() {
        let out = join_synthetic_to_real(&claims(), &Table::empty(), &OrderedJoin).unwrap();
        assert_eq!(
            strings(&out, columns::REAL_PROVIDER_NAME),
            vec!["P1", "P2", "P1", "P3"]
        );
        assert!(
            strings(&out, columns::JOINED_COMPLIANCE_RATING)
                .iter()
                .all(|v| v == "Unknown")
        );
    }

    #[test]
    fn test_explicit_mapping_ignores_unknown_services() {
        let mapping = ExplicitMapping::new(HashMap::from([
            ("P2".to_string(), "Sunrise Lodge".to_string()),
            ("P3".to_string(), "Nowhere House".to_string()),
        ]));
        let out = join_synthetic_to_real(&claims(), &quality(), &mapping).unwrap();
        assert_eq!(
            strings(&out, columns::REAL_PROVIDER_NAME),
            vec!["P1", "Sunrise Lodge", "P1", "P3"]
        );
    }

    #[test]
    fn test_seeded_random_join_is_reproducible() {
        let strategy = RandomSampleJoin { seed: Some(42) };
        let first = join_synthetic_to_real(&claims(), &quality(), &strategy).unwrap();
        let second = join_synthetic_to_real(&claims(), &quality(), &strategy).unwrap();
        assert_eq!(first, second);

        // two services for three providers: exactly one provider stays unmapped
        let names = strings(&first, columns::REAL_PROVIDER_NAME);
        let distinct: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_random_join_unmapped_provider_has_unknown_ratings() {
        for seed in 0..8 {
            let out =
                join_synthetic_to_real(&claims(), &quality(), &RandomSampleJoin { seed: Some(seed) })
                    .unwrap();
            let ids = strings(&out, columns::PROVIDER_ID);
            let names = strings(&out, columns::REAL_PROVIDER_NAME);
            let compliance = strings(&out, columns::JOINED_COMPLIANCE_RATING);
            let staffing = strings(&out, columns::JOINED_STAFFING_RATING);

            let unmapped: std::collections::HashSet<_> = (0..out.len())
                .filter(|&row| names[row] == ids[row])
                .map(|row| {
                    assert_eq!(compliance[row], columns::UNKNOWN);
                    assert_eq!(staffing[row], columns::UNKNOWN);
                    ids[row].clone()
                })
                .collect();
            assert_eq!(unmapped.len(), 1, "seed {seed}");
        }
    }

    #[test]
    fn test_explicit_mapping_rejects_malformed_json() {
        let path = std::env::temp_dir().join("care_rater_test_bad_mapping.json");
        std::fs::write(&path, r#"{ "P1": ["Sunrise Lodge"] "#).unwrap();

        let err = ExplicitMapping::load(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("invalid provider mapping"));

        std::fs::remove_file(&path).unwrap();
        assert!(ExplicitMapping::load(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_missing_provider_column() {
        let table = Table::new([columns::CLAIMED_AMOUNT]);
        assert_eq!(
            join_synthetic_to_real(&table, &quality(), &OrderedJoin),
            Err(MetricsError::Schema(columns::PROVIDER_ID.into()))
        );
    }
}
