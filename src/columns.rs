//! Column names of the claims extract and the star-ratings workbook.

// Simulated claims CSV
pub const PROVIDER_ID: &str = "Provider_ID";
pub const REGION: &str = "Region";
pub const ITEM_CODE: &str = "Item_Code";
pub const SERVICE_DATE: &str = "Service_Date";
pub const CLAIMED_HOURS: &str = "Claimed_Hours";
pub const CLAIMED_AMOUNT: &str = "Claimed_Amount";
pub const DAY_OF_WEEK: &str = "Day_of_Week";
pub const ANOMALY_SCORE: &str = "Anomaly_Score";

// Added by the synthetic-to-real join and the drilldown
pub const REAL_PROVIDER_NAME: &str = "Real_Provider_Name";
pub const JOINED_COMPLIANCE_RATING: &str = "Compliance_Rating";
pub const JOINED_STAFFING_RATING: &str = "Staffing_Rating";
pub const ANOMALY_SCORE_POSITIVE: &str = "Anomaly_Score_Positive";

// Star ratings workbook
pub const STAR_RATINGS_SHEET: &str = "Star Ratings";
pub const DETAILED_DATA_SHEET: &str = "Detailed data";

pub const SERVICE_NAME: &str = "Service Name";
pub const STATE_TERRITORY: &str = "State/Territory";
pub const SERVICE_SUBURB: &str = "Service Suburb";
pub const SIZE: &str = "Size";
pub const OVERALL_STAR_RATING: &str = "Overall Star Rating";
pub const COMPLIANCE_RATING: &str = "Compliance rating";
pub const STAFFING_RATING: &str = "Staffing rating";
pub const RESIDENTS_EXPERIENCE_RATING: &str = "Residents' Experience rating";
pub const QUALITY_MEASURES_RATING: &str = "Quality Measures rating";

pub const RN_CARE_MINUTES_ACTUAL: &str = "RN Care Minutes Actual";
pub const RN_CARE_MINUTES_TARGET: &str = "RN Care Minutes Target";
pub const TOTAL_CARE_MINUTES_ACTUAL: &str = "Total Care Minutes Actual";
pub const TOTAL_CARE_MINUTES_TARGET: &str = "Total Care Minutes Target";

pub const RN_CARE_COMPLIANCE_PCT: &str = "rn_care_compliance_pct";
pub const TOTAL_CARE_COMPLIANCE_PCT: &str = "total_care_compliance_pct";

/// Quality-measure percentage fields reported per service.
pub const QUALITY_MEASURES: &[&str] = &[
    "Pressure injuries",
    "Physical restraint",
    "Unplanned weight loss - significant",
    "Unplanned weight loss - consecutive",
    "Falls and major injury - falls",
    "Falls and major injury - major injury from a fall",
    "Medication management - polypharmacy",
    "Medication management - antipsychotic",
];

/// Weekday labels in display order.
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Sentinel selector value meaning "no filter".
pub const ALL: &str = "All";

/// Label used when a joined rating cannot be resolved.
pub const UNKNOWN: &str = "Unknown";
