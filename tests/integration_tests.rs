use care_rater::columns;
use care_rater::loader::{DataCache, Source, load_csv};
use care_rater::metrics::compliance::sector_compliance;
use care_rater::metrics::filter::{Selection, apply_selections};
use care_rater::metrics::series::weekday_counts;
use care_rater::metrics::{
    ExplicitMapping, FlagThresholds, Tier, compute_compliance_metrics, detect_flagged_services,
    filter_by_category, join_synthetic_to_real, provider_drilldown, summarize_by_provider,
    summarize_providers, top_n,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn test_sector_pipeline() {
    let quality = load_csv(&fixture("quality.csv")).expect("Failed to load quality fixture");
    let detail = compute_compliance_metrics(&quality).unwrap();

    // Riverbend's RN target is zero: undefined, not 0% or infinite
    let riverbend = filter_by_category(&detail, columns::SERVICE_NAME, "Riverbend Home").unwrap();
    assert_eq!(
        riverbend.numeric_column(columns::RN_CARE_COMPLIANCE_PCT).unwrap(),
        vec![None]
    );

    let sector = sector_compliance(&detail).unwrap();
    let rn = sector.rn_care_compliance_pct.unwrap();
    assert!((rn - 280.0 / 3.0).abs() < 1e-9);
    assert!((sector.total_care_compliance_pct.unwrap() - 93.125).abs() < 1e-9);

    let summaries =
        summarize_providers(&detail, columns::SERVICE_NAME, &FlagThresholds::default()).unwrap();
    let tiers: Vec<_> = summaries.iter().map(|s| s.tier).collect();
    assert_eq!(
        tiers,
        vec![Tier::Excellent, Tier::Good, Tier::AtRisk, Tier::AtRisk]
    );

    let flagged = detect_flagged_services(&detail, &FlagThresholds::default()).unwrap();
    assert_eq!(
        flagged.distinct(columns::SERVICE_NAME).unwrap(),
        vec!["Bushland Haven"]
    );
    assert_eq!(flagged.columns(), detail.columns());
}

#[test]
fn test_state_filter_scopes_sector_metrics() {
    let quality = load_csv(&fixture("quality.csv")).unwrap();
    let vic = apply_selections(&quality, &[Selection::new(columns::STATE_TERRITORY, "VIC")]).unwrap();
    assert_eq!(vic.len(), 2);

    let sector = sector_compliance(&vic).unwrap();
    assert_eq!(sector.rn_care_compliance_pct, Some(75.0));
}

#[test]
fn test_claims_pipeline_with_explicit_mapping() {
    let mut cache = DataCache::new();
    let claims = cache.load_once(&Source::csv(fixture("claims.csv")));
    let quality = cache.load_once(&Source::csv(fixture("quality.csv")));
    assert!(claims.is_ok() && quality.is_ok());

    let mapping = ExplicitMapping::load(fixture("mapping.json").to_str().unwrap()).unwrap();
    let joined = join_synthetic_to_real(&claims.table, &quality.table, &mapping).unwrap();
    assert_eq!(joined.len(), claims.table.len());

    let scores =
        summarize_by_provider(&joined, columns::REAL_PROVIDER_NAME, columns::ANOMALY_SCORE)
            .unwrap();
    let top: Vec<String> = top_n(&scores, 3)
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    assert_eq!(top, vec!["Bushland Haven", "Sunrise Lodge", "P004"]);

    let north = filter_by_category(&joined, columns::REGION, "North").unwrap();
    assert_eq!(north.len(), 4);

    let weekdays = weekday_counts(&joined).unwrap();
    assert_eq!(weekdays[0], ("Monday", 2));
    assert_eq!(weekdays.iter().map(|(_, c)| c).sum::<usize>(), 8);

    let drill = provider_drilldown(&joined, columns::REAL_PROVIDER_NAME, "Sunrise Lodge").unwrap();
    assert_eq!(drill.claims.len(), 2);
    assert_eq!(drill.claims.value(0, 3).to_string(), "2024-01-02");
    assert_eq!(drill.compliance_rating.as_deref(), Some("5"));

    // second load is served from the cache
    cache.load_once(&Source::csv(fixture("claims.csv")));
    assert_eq!(cache.parse_count(), 2);
}

#[test]
fn test_missing_quality_source_degrades_to_unknown() {
    let mut cache = DataCache::new();
    let claims = cache.load_once(&Source::csv(fixture("claims.csv")));
    let quality = cache.load_once(&Source::sheet(
        fixture("missing.xlsx"),
        columns::DETAILED_DATA_SHEET,
    ));
    assert!(quality.diagnostic.is_some());

    let joined =
        join_synthetic_to_real(&claims.table, &quality.table, &ExplicitMapping::default()).unwrap();
    let ratings = joined.distinct(columns::JOINED_STAFFING_RATING).unwrap();
    assert_eq!(ratings, vec![columns::UNKNOWN]);
    assert_eq!(
        joined.distinct(columns::REAL_PROVIDER_NAME).unwrap(),
        vec!["P001", "P002", "P003", "P004"]
    );
}
