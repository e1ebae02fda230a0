use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assets::Region;

/// Universe restriction applied before weight normalization: filtered-out
/// assets leave both the numerator and the denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetFilter {
    #[default]
    All,
    Domestic,
    Foreign,
}

impl AssetFilter {
    pub fn matches(&self, region: Region) -> bool {
        match self {
            AssetFilter::All => true,
            AssetFilter::Domestic => region == Region::Domestic,
            AssetFilter::Foreign => region == Region::Foreign,
        }
    }
}

/// One day of the portfolio return series inside an attribution result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReturnPoint {
    pub date: NaiveDate,
    /// `None` on the first day of the period.
    pub daily_return: Option<Decimal>,
    /// Total market value of the (filtered) universe on this day.
    pub portfolio_value: Decimal,
}

/// Contribution of one asset to the portfolio's period return.
/// Weights and returns are decimal fractions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetContribution {
    pub asset_id: String,
    pub ticker: String,
    pub name: String,
    pub asset_class: String,
    pub region: Region,
    /// Weight on the last day of the period (zero when liquidated).
    pub current_allocation: Decimal,
    /// Mean of the day-start weights over the period.
    pub avg_weight: Decimal,
    /// Price-relative return over the sub-period the asset was held.
    pub period_return: Decimal,
    /// Share of the portfolio's compounded period return.
    pub contribution: Decimal,
}

/// Weight of one asset class on one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight: Decimal,
}

/// Daily and cumulative return of one asset class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassReturnPoint {
    pub date: NaiveDate,
    pub daily_return: Decimal,
    pub cumulative_return: Decimal,
}

/// Contribution of one asset class: the sum of its constituents, plus the
/// per-class chart series the dashboard's drill-down renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetClassContribution {
    pub asset_class: String,
    pub current_allocation: Decimal,
    pub avg_weight: Decimal,
    pub contribution: Decimal,
    pub weight_trend: Vec<WeightPoint>,
    pub return_trend: Vec<ClassReturnPoint>,
    pub assets: Vec<AssetContribution>,
}

/// Full attribution of one (portfolio, period, filter) query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionResult {
    /// Compounded period TWR of the (filtered) universe.
    pub total_twr: Decimal,
    pub daily_returns: Vec<PortfolioReturnPoint>,
    pub asset_class_contributions: Vec<AssetClassContribution>,
    /// Assets with positive contribution, descending; ties by asset id.
    pub top_contributors: Vec<AssetContribution>,
    /// Assets with negative contribution, ascending; ties by asset id.
    pub top_detractors: Vec<AssetContribution>,
    /// Sum of all class contributions. Callers assert this is within a
    /// small epsilon of `total_twr`; a gap indicates a weighting-method
    /// bug and is surfaced in `reconciliation_gap`, never raised.
    pub total_contribution_check: Decimal,
    /// `|total_contribution_check - total_twr|`, kept as a diagnostic.
    pub reconciliation_gap: Decimal,
}

/// Indexed price performance of one asset over a period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricePerformancePoint {
    pub date: NaiveDate,
    /// Price-relative return since the period base, as a decimal fraction.
    pub performance: Decimal,
}

/// Drill-down detail for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDetail {
    pub asset_id: String,
    pub ticker: String,
    pub name: String,
    pub asset_class: String,
    pub region: Region,
    pub current_allocation: Decimal,
    pub current_price: Decimal,
    pub period_return: Decimal,
    pub contribution: Decimal,
    pub price_performance: Vec<PricePerformancePoint>,
}
