use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::constants::{TRADING_DAYS_PER_YEAR, VAR_SAMPLE_FLOOR};

/// Configuration for risk metric computation.
///
/// The annualization factor is configuration rather than a hardcoded 252 so
/// that non-daily series (weekly, monthly) can reuse the same math.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskConfig {
    /// Number of periods per year for annualization (252 for daily series).
    pub annualization_factor: u32,
    /// Annual risk-free rate as a decimal fraction (e.g., 0.025).
    pub risk_free_rate: Decimal,
    /// VaR confidence level as a decimal fraction (e.g., 0.95).
    pub confidence: Decimal,
    /// Minimum observation count below which VaR computation fails.
    pub var_sample_floor: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            annualization_factor: TRADING_DAYS_PER_YEAR,
            risk_free_rate: dec!(0.025),
            confidence: dec!(0.95),
            var_sample_floor: VAR_SAMPLE_FLOOR,
        }
    }
}

/// Computed risk metrics for one return series.
///
/// Sign conventions: `max_drawdown` and `value_at_risk` are positive loss
/// magnitudes; a chart that wants to plot the drawdown below zero negates
/// it at the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    /// Annualized sample standard deviation of the daily returns.
    pub volatility: Decimal,
    /// `None` when volatility is zero (e.g., an all-cash fund) - a valid
    /// portfolio state, not an error and never ±infinity.
    pub sharpe_ratio: Option<Decimal>,
    /// Largest peak-to-trough decline of the compounded NAV index, in [0, 1].
    pub max_drawdown: Decimal,
    /// Historical-simulation VaR at the configured confidence level.
    pub value_at_risk: Decimal,
    /// Confidence level the VaR was computed at.
    pub confidence: Decimal,
    /// Number of daily observations the metrics were computed from.
    pub sample_size: usize,
}
