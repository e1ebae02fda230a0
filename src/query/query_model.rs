//! Response shapes and query parameters.
//!
//! This is the only layer aware of presentation-facing naming; all financial
//! logic lives in the performance, attribution, benchmark, and risk modules.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::attribution::{
    AssetClassContribution, AssetContribution, PortfolioReturnPoint,
};
use crate::benchmark::{BenchmarkComparisonSeries, BenchmarkReturn};
use crate::errors::{Result, ValidationError};
use crate::performance::{ReturnPoint, TrailingReturns};
use crate::risk::RiskMetrics;

pub use crate::attribution::AssetFilter;

/// Period selector: all-time, a trailing window, or an explicit date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PeriodSpec {
    AllTime,
    TrailingDays { days: u32 },
    TrailingWeeks { weeks: u32 },
    TrailingMonths { months: u32 },
    Explicit { start: NaiveDate, end: NaiveDate },
}

impl PeriodSpec {
    /// Resolves to concrete dates against the portfolio's available range:
    /// all-time clamps to the inception date, trailing windows count
    /// back from the latest snapshot, and explicit ranges are clipped to the
    /// data actually present. Months count as 30 days, weeks as 7.
    pub fn resolve(&self, inception: NaiveDate, latest: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let (start, end) = match *self {
            PeriodSpec::AllTime => (inception, latest),
            PeriodSpec::TrailingDays { days } => (latest - Duration::days(days as i64), latest),
            PeriodSpec::TrailingWeeks { weeks } => {
                (latest - Duration::weeks(weeks as i64), latest)
            }
            PeriodSpec::TrailingMonths { months } => {
                (latest - Duration::days(30 * months as i64), latest)
            }
            PeriodSpec::Explicit { start, end } => (start, end.min(latest)),
        };
        let start = start.max(inception);
        if start > end {
            return Err(ValidationError::InvalidDateRange { start, end }.into());
        }
        Ok((start, end))
    }
}

/// Which response section a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseSection {
    Returns,
    Attribution,
    Benchmark,
    Risk,
    Allocation,
}

/// An explicit "this section is unavailable / degraded" marker. The facade
/// never substitutes a fabricated zero for a section it could not compute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryWarning {
    pub section: ResponseSection,
    pub message: String,
}

impl QueryWarning {
    pub fn new(section: ResponseSection, message: impl Into<String>) -> Self {
        Self {
            section,
            message: message.into(),
        }
    }
}

/// Attribution payload for one (portfolio, period, filter) query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionResponse {
    pub portfolio_id: String,
    pub period: PeriodSpec,
    pub asset_filter: AssetFilter,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_twr: Decimal,
    pub daily_returns: Vec<PortfolioReturnPoint>,
    pub asset_class_contributions: Vec<AssetClassContribution>,
    pub top_contributors: Vec<AssetContribution>,
    pub top_detractors: Vec<AssetContribution>,
    pub total_contribution_check: Decimal,
    pub benchmarks: Vec<BenchmarkReturn>,
    pub warnings: Vec<QueryWarning>,
}

/// Performance payload: return series, rollups, and benchmark rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceResponse {
    pub portfolio_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `None` (with a warning) when the period holds fewer than 2 snapshots.
    pub cumulative_return: Option<Decimal>,
    pub annualized_return: Option<Decimal>,
    pub returns: Vec<ReturnPoint>,
    pub trailing: TrailingReturns,
    pub benchmarks: Vec<BenchmarkReturn>,
    pub comparisons: Vec<BenchmarkComparisonSeries>,
    pub warnings: Vec<QueryWarning>,
}

/// Risk payload. The dashboard shows VaR at both confidence levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskResponse {
    pub portfolio_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `None` (with a warning) when the sample is below the VaR floor.
    pub metrics: Option<RiskMetrics>,
    pub var_95: Option<Decimal>,
    pub var_99: Option<Decimal>,
    pub warnings: Vec<QueryWarning>,
}

/// One asset row of the current allocation breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetAllocation {
    pub asset_id: String,
    pub ticker: String,
    pub name: String,
    pub quantity: Decimal,
    pub market_value: Decimal,
    pub weight: Decimal,
}

/// Allocation of one asset class as of the latest snapshot date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassAllocation {
    pub asset_class: String,
    pub total_value: Decimal,
    pub weight: Decimal,
    /// Constituents sorted by market value descending.
    pub assets: Vec<AssetAllocation>,
}

/// Current allocation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResponse {
    pub portfolio_id: String,
    pub as_of_date: Option<NaiveDate>,
    pub total_value: Decimal,
    pub classes: Vec<ClassAllocation>,
    pub warnings: Vec<QueryWarning>,
}
