//! CLI entry point for the care rater.
//!
//! Each subcommand is one dashboard page: it loads the sources, applies the
//! filter selections given as flags, runs the metrics and logs the results.
//! Metric errors are reported per panel and do not abort the page.

use anyhow::Result;
use care_rater::columns;
use care_rater::config::RaterConfig;
use care_rater::loader::{DataCache, Source};
use care_rater::metrics::filter::{Selection, apply_selections, selector_options};
use care_rater::metrics::series::{
    DEFAULT_HISTOGRAM_BINS, MAX_HISTOGRAM_BINS, daily_claimed_totals, grouped_values, histogram,
    indicator_columns, value_counts, weekday_counts,
};
use care_rater::metrics::style::styled_rows;
use care_rater::metrics::summary::{GroupMeans, TOP_N_MAX, TOP_N_MIN};
use care_rater::metrics::{
    ExplicitMapping, JoinStrategy, OrderedJoin, RandomSampleJoin,
    compliance::{compute_compliance_metrics_with, sector_compliance},
    compute_quality_measure_summary, detect_flagged_services, join_synthetic_to_real,
    provider_drilldown, summarize_by_provider, summarize_providers, top_n,
};
use care_rater::output::{append_records, print_json, print_pretty, write_table};
use care_rater::table::Table;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "care_rater")]
#[command(about = "Aged care claims and service quality metrics", long_about = None)]
struct Cli {
    /// JSON config with flag thresholds and column names
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Claims overview: time series, benchmarking, weekday pattern and top
    /// providers by average anomaly score
    Claims {
        #[command(flatten)]
        sources: ClaimsSources,

        /// Region filter
        #[arg(long, default_value = columns::ALL)]
        region: String,

        /// Item code filter
        #[arg(long, default_value = columns::ALL)]
        item_code: String,

        /// Number of top providers to show (clamped to 3..=20)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// CSV file to write the filtered claims to
        #[arg(short, long)]
        output: Option<String>,

        /// Gzip compress the exported CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Claims of a single provider, newest first
    Drilldown {
        #[command(flatten)]
        sources: ClaimsSources,

        /// Provider to show (real service name after the join)
        #[arg(short, long)]
        provider: String,

        /// CSV file to write the provider's claims to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Sector performance from the star ratings workbook
    Sector {
        /// Star ratings workbook or CSV export of the detailed sheet
        #[arg(
            short,
            long,
            default_value = "star-ratings-quarterly-data-extract-february-2025.xlsx"
        )]
        quality: String,

        /// State/Territory filter
        #[arg(long, default_value = columns::ALL)]
        state: String,

        /// Provider (service name) to summarize
        #[arg(short, long, default_value = columns::ALL)]
        provider: String,

        /// Quality indicator column to plot as a histogram
        #[arg(long)]
        indicator: Option<String>,

        /// Histogram bin count (1..=1000)
        #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS, value_parser = parse_bins)]
        bins: usize,

        /// CSV file to append provider summaries to
        #[arg(short, long)]
        output: Option<String>,

        /// CSV file to write flagged services to
        #[arg(long)]
        flagged_output: Option<String>,
    },
}

#[derive(Args)]
struct ClaimsSources {
    /// Simulated claims CSV
    #[arg(short, long, default_value = "simulated_aged_care_claims_balanced.csv")]
    claims: String,

    /// Star ratings workbook (or CSV) to join real services from
    #[arg(
        short,
        long,
        default_value = "star-ratings-quarterly-data-extract-february-2025.xlsx"
    )]
    quality: String,

    /// How simulated providers are paired with real services
    #[arg(long, value_enum, default_value_t = JoinMode::Explicit)]
    join: JoinMode,

    /// JSON provider mapping for the explicit join
    #[arg(long)]
    mapping: Option<String>,

    /// Seed for the random-sample join
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum JoinMode {
    /// Provider mapping file; providers without an entry keep their ID
    Explicit,
    /// Pair providers and services in order of appearance
    Ordered,
    /// Demo mode: random sample of services (reproducible only with --seed)
    Random,
}

fn parse_bins(raw: &str) -> std::result::Result<usize, String> {
    let bins: usize = raw.parse().map_err(|e| format!("invalid bin count: {e}"))?;
    if (1..=MAX_HISTOGRAM_BINS).contains(&bins) {
        Ok(bins)
    } else {
        Err(format!("bin count must be between 1 and {MAX_HISTOGRAM_BINS}"))
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/care_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("care_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = RaterConfig::resolve(cli.config.as_deref())?;
    let mut cache = DataCache::new();

    match cli.command {
        Commands::Claims {
            sources,
            region,
            item_code,
            top_n,
            output,
            gzip,
        } => {
            let claims = load_joined_claims(&mut cache, &sources)?;
            let selections = vec![
                Selection::new(columns::REGION, region),
                Selection::new(columns::ITEM_CODE, item_code),
            ];
            let n = top_n.unwrap_or(config.top_n);
            claims_page(&claims, &selections, n, output.as_deref(), gzip)?;
        }
        Commands::Drilldown {
            sources,
            provider,
            output,
        } => {
            let claims = load_joined_claims(&mut cache, &sources)?;
            drilldown_page(&claims, &provider, output.as_deref())?;
        }
        Commands::Sector {
            quality,
            state,
            provider,
            indicator,
            bins,
            output,
            flagged_output,
        } => {
            let page = SectorPage {
                quality: &quality,
                state: &state,
                provider: &provider,
                indicator: indicator.as_deref(),
                bins,
                output: output.as_deref(),
                flagged_output: flagged_output.as_deref(),
            };
            sector_page(&mut cache, &config, &page)?;
        }
    }

    Ok(())
}

/// Logs a panel's result, or its error if the metric could not be computed.
fn report<T: Serialize>(panel: &str, result: care_rater::error::Result<T>) -> Option<T> {
    match result {
        Ok(value) => {
            info!(panel, "Panel ready");
            if let Err(e) = print_json(&value) {
                warn!(panel, error = %e, "Failed to render panel as JSON");
            }
            Some(value)
        }
        Err(e) => {
            error!(panel, error = %e, "Panel unavailable");
            None
        }
    }
}

/// Loads the claims and quality sources and joins them with the selected
/// strategy. Load failures leave an empty table and are logged.
#[tracing::instrument(skip(cache, sources), fields(claims = %sources.claims, quality = %sources.quality))]
fn load_joined_claims(cache: &mut DataCache, sources: &ClaimsSources) -> Result<Table> {
    let claims = cache.load_once(&Source::csv(&sources.claims));
    if let Some(diagnostic) = &claims.diagnostic {
        error!(%diagnostic, "Claims data unavailable");
    }

    let quality = cache.load_once(&Source::detect(
        &sources.quality,
        columns::DETAILED_DATA_SHEET,
    ));
    if let Some(diagnostic) = &quality.diagnostic {
        warn!(%diagnostic, "Quality data unavailable, joining with unknown ratings");
    }

    let strategy: Box<dyn JoinStrategy> = match sources.join {
        JoinMode::Explicit => match &sources.mapping {
            Some(path) => Box::new(ExplicitMapping::load(path)?),
            None => {
                warn!("No provider mapping given, providers keep their IDs");
                Box::new(ExplicitMapping::default())
            }
        },
        JoinMode::Ordered => Box::new(OrderedJoin),
        JoinMode::Random => Box::new(RandomSampleJoin { seed: sources.seed }),
    };

    match join_synthetic_to_real(&claims.table, &quality.table, strategy.as_ref()) {
        Ok(joined) => Ok(joined),
        Err(e) => {
            error!(error = %e, "Join failed, showing an empty claims table");
            Ok(Table::empty())
        }
    }
}

#[tracing::instrument(skip(claims, selections, output))]
fn claims_page(
    claims: &Table,
    selections: &[Selection],
    top: usize,
    output: Option<&str>,
    gzip: bool,
) -> Result<()> {
    let filtered = match apply_selections(claims, selections) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Filter failed, showing an empty table");
            Table::empty()
        }
    };
    info!(rows = filtered.len(), "Claims after filters");

    report("region_options", selector_options(claims, columns::REGION));
    report("item_code_options", selector_options(claims, columns::ITEM_CODE));

    report("daily_claimed_amount", daily_claimed_totals(&filtered));
    report(
        "claimed_hours_by_item",
        grouped_values(&filtered, columns::ITEM_CODE, columns::CLAIMED_HOURS),
    );
    report("claims_by_weekday", weekday_counts(&filtered));

    if !(TOP_N_MIN..=TOP_N_MAX).contains(&top) {
        warn!(top, min = TOP_N_MIN, max = TOP_N_MAX, "Top-n outside slider range, clamping");
    }
    let scores: Option<GroupMeans> = report(
        "mean_anomaly_by_provider",
        summarize_by_provider(&filtered, columns::REAL_PROVIDER_NAME, columns::ANOMALY_SCORE),
    );
    if let Some(scores) = scores {
        report("top_providers_by_anomaly", top_n(&scores, top));
    }

    if let Some(path) = output {
        write_table(path, &filtered, gzip)?;
    }

    Ok(())
}

#[tracing::instrument(skip(claims, output))]
fn drilldown_page(claims: &Table, provider: &str, output: Option<&str>) -> Result<()> {
    let drill = match provider_drilldown(claims, columns::REAL_PROVIDER_NAME, provider) {
        Ok(drill) => drill,
        Err(e) => {
            error!(error = %e, "Drilldown unavailable");
            return Ok(());
        }
    };

    info!(
        provider,
        claims = drill.claims.len(),
        compliance_rating = drill.compliance_rating.as_deref().unwrap_or(columns::UNKNOWN),
        staffing_rating = drill.staffing_rating.as_deref().unwrap_or(columns::UNKNOWN),
        "Provider drilldown"
    );
    print_pretty(&drill.claims);

    if let Some(path) = output {
        write_table(path, &drill.claims, false)?;
    }

    Ok(())
}

struct SectorPage<'a> {
    quality: &'a str,
    state: &'a str,
    provider: &'a str,
    indicator: Option<&'a str>,
    bins: usize,
    output: Option<&'a str>,
    flagged_output: Option<&'a str>,
}

#[tracing::instrument(skip_all, fields(quality = page.quality, state = page.state, provider = page.provider))]
fn sector_page(cache: &mut DataCache, config: &RaterConfig, page: &SectorPage<'_>) -> Result<()> {
    let state_filter = [Selection::new(columns::STATE_TERRITORY, page.state)];

    if let Source::Sheet { path, .. } = Source::detect(page.quality, columns::DETAILED_DATA_SHEET) {
        cache.preload_workbook(&path);
    }

    // Star Ratings sheet: distribution of overall ratings
    let stars = cache.load_once(&Source::detect(page.quality, columns::STAR_RATINGS_SHEET));
    if let Some(diagnostic) = &stars.diagnostic {
        error!(%diagnostic, "Star ratings unavailable");
    }
    match apply_selections(&stars.table, &state_filter) {
        Ok(star_table) => {
            report(
                "overall_star_distribution",
                value_counts(&star_table, columns::OVERALL_STAR_RATING),
            );
        }
        Err(e) => error!(error = %e, "Star ratings filter failed"),
    }

    // Detailed data sheet: compliance, summaries, flags and indicators
    let detailed = cache.load_once(&Source::detect(page.quality, columns::DETAILED_DATA_SHEET));
    if let Some(diagnostic) = &detailed.diagnostic {
        error!(%diagnostic, "Detailed data unavailable");
    }

    let detail = match apply_selections(&detailed.table, &state_filter)
        .and_then(|t| compute_compliance_metrics_with(&t, &config.compliance_columns))
    {
        Ok(detail) => detail,
        Err(e) => {
            error!(error = %e, "Detailed data panels unavailable");
            return Ok(());
        }
    };
    info!(rows = detail.len(), "Detailed rows after filters");

    report(
        "state_options",
        selector_options(&detailed.table, columns::STATE_TERRITORY),
    );
    report(
        "provider_options",
        selector_options(&detail, columns::SERVICE_NAME),
    );

    report("sector_compliance", sector_compliance(&detail));

    let summaries = report(
        "provider_summaries",
        summarize_providers(&detail, columns::SERVICE_NAME, &config.thresholds),
    );

    if page.provider != columns::ALL {
        if let Some(summary) = summaries
            .as_ref()
            .and_then(|all| all.iter().find(|s| s.provider == page.provider))
        {
            let tier = summary.tier;
            info!(provider = page.provider, tier = %tier, "{}", tier.summary(page.provider));
        } else {
            warn!(provider = page.provider, "Provider not found in detailed data");
        }
    }

    if let (Some(path), Some(summaries)) = (page.output, &summaries) {
        append_records(path, summaries)?;
    }

    match detect_flagged_services(&detail, &config.thresholds) {
        Ok(flagged) => {
            info!(flagged = flagged.len(), total = detail.len(), "Flagged services");
            report("flagged_services", flagged.distinct(columns::SERVICE_NAME));
            report(
                "flagged_service_styles",
                styled_rows(&flagged, columns::SERVICE_NAME, &config.thresholds),
            );
            if let Some(path) = page.flagged_output {
                write_table(path, &flagged, false)?;
            }
        }
        Err(e) => error!(error = %e, "Flagged services unavailable"),
    }

    let mut measures = indicator_columns(&detail);
    if measures.is_empty() {
        measures = columns::QUALITY_MEASURES
            .iter()
            .filter(|m| detail.has_column(m))
            .map(|m| m.to_string())
            .collect();
    }
    let measure_refs: Vec<&str> = measures.iter().map(String::as_str).collect();
    let provider_filter =
        (page.provider != columns::ALL).then(|| Selection::new(columns::SERVICE_NAME, page.provider));
    report(
        "quality_measure_summary",
        compute_quality_measure_summary(&detail, provider_filter.as_ref(), &measure_refs),
    );

    if let Some(indicator) = page.indicator.or(measure_refs.first().copied()) {
        report("indicator_histogram", histogram(&detail, indicator, page.bins));
    } else {
        warn!("No recognised indicators found in detailed data");
    }

    Ok(())
}
