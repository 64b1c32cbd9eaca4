use serde::Serialize;
use std::fmt;

/// Coarse provider classification.
///
/// | Tier      | Star rating | RN compliance | Total compliance |
/// |-----------|-------------|---------------|------------------|
/// | Excellent | >= 5        | >= 100%       | >= 100%          |
/// | Good      | >= 3        | >= 90%        | >= 90%           |
/// | AtRisk    | otherwise   |               |                  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    Excellent,
    Good,
    AtRisk,
}

impl Tier {
    /// Short compliance summary for a provider in this tier.
    pub fn summary(&self, provider: &str) -> String {
        match self {
            Tier::Excellent => format!(
                "{provider} is performing excellently, meeting or exceeding all care-minute targets."
            ),
            Tier::Good => format!(
                "{provider} is performing well but has room to improve care-minute compliance."
            ),
            Tier::AtRisk => format!(
                "{provider} is at risk: ratings or care-minute compliance fall below expectations."
            ),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Excellent => "Excellent",
            Tier::Good => "Good",
            Tier::AtRisk => "At Risk",
        })
    }
}

fn meets(value: Option<f64>, min: f64) -> bool {
    value.is_some_and(|v| v >= min)
}

/// Checks Excellent first, then Good, else AtRisk. An undefined input fails
/// every threshold.
pub fn classify_provider_tier(
    mean_star_rating: Option<f64>,
    mean_rn_compliance: Option<f64>,
    mean_total_compliance: Option<f64>,
) -> Tier {
    let ladder = |star: f64, pct: f64| {
        meets(mean_star_rating, star)
            && meets(mean_rn_compliance, pct)
            && meets(mean_total_compliance, pct)
    };

    if ladder(5.0, 100.0) {
        Tier::Excellent
    } else if ladder(3.0, 90.0) {
        Tier::Good
    } else {
        Tier::AtRisk
    }
}
