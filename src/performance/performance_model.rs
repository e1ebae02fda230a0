use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One day in a portfolio return series.
///
/// `daily_return` is `None` on the first day of a series - there is no prior
/// point to measure against, and zero would be a fabricated value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub daily_return: Option<Decimal>,
    /// Geometric compounding of all daily returns up to this date.
    pub cumulative_return: Decimal,
    /// False when flow data was missing for this day and the return fell
    /// back to the unadjusted NAV change.
    pub cash_flow_adjusted: bool,
}

/// Trailing-window return rollup for the dashboard's recent-returns card.
/// Windows are counted in trading-day records, not calendar days, matching
/// how the snapshot series is sampled. `None` when the series is too short.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrailingReturns {
    pub day_1: Option<Decimal>,
    pub week_1: Option<Decimal>,
    pub month_1: Option<Decimal>,
}
