//! Benchmark assignment policy.
//!
//! Which benchmark(s) apply to a portfolio is configuration driven by the
//! portfolio's declared currency and region, not logic inside the
//! comparator. The policy is serde-deserializable so deployments can ship
//! their own mapping.

use serde::{Deserialize, Serialize};

use crate::assets::Region;

/// Maps one portfolio currency to its benchmark instruments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkAssignment {
    /// Portfolio currency this assignment applies to (e.g., "KRW", "USD").
    pub currency: String,
    /// Optional region refinement; `None` matches any region.
    #[serde(default)]
    pub region: Option<Region>,
    /// Instrument symbols, in display order (e.g., domestic index first,
    /// currency-adjusted foreign index second).
    pub instruments: Vec<String>,
}

/// Full benchmark assignment table plus a fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkPolicy {
    #[serde(default)]
    pub assignments: Vec<BenchmarkAssignment>,
    /// Instruments used when no assignment matches the portfolio currency.
    #[serde(default)]
    pub default_instruments: Vec<String>,
}

impl BenchmarkPolicy {
    /// Instruments for a portfolio. A region-specific assignment wins over a
    /// currency-only one; the default list is the last resort.
    pub fn instruments_for(&self, currency: &str, region: Option<Region>) -> &[String] {
        if let Some(region) = region {
            if let Some(assignment) = self
                .assignments
                .iter()
                .find(|a| a.currency == currency && a.region == Some(region))
            {
                return &assignment.instruments;
            }
        }
        if let Some(assignment) = self
            .assignments
            .iter()
            .find(|a| a.currency == currency && a.region.is_none())
        {
            return &assignment.instruments;
        }
        &self.default_instruments
    }
}
