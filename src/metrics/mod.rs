//! Derived metrics over claims and service-quality tables.
//!
//! Every function here is pure: it reads a [`Table`](crate::table::Table)
//! and returns a fresh table, summary or classification. Errors are returned
//! to the caller, and undefined numbers (zero or missing denominators) are
//! carried as `None` and left out of means.

pub mod compliance;
pub mod drilldown;
pub mod filter;
pub mod flagged;
pub mod join;
pub mod series;
pub mod style;
pub mod summary;
pub mod tier;
pub mod utility;

pub use compliance::{ComplianceColumns, ComplianceMetric, compute_compliance_metrics};
pub use drilldown::{ProviderSummary, provider_drilldown, summarize_providers};
pub use filter::{Selection, filter_by_category};
pub use flagged::{FlagThresholds, detect_flagged_services};
pub use join::{ExplicitMapping, JoinStrategy, OrderedJoin, RandomSampleJoin, join_synthetic_to_real};
pub use summary::{compute_quality_measure_summary, summarize_by_provider, top_n};
pub use tier::{Tier, classify_provider_tier};
