//! Risk metric computation over daily return series.

use num_traits::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::errors::{Result, RiskError};

use super::{RiskConfig, RiskMetrics};

// sqrt(252), used when the exact square root is unavailable
const SQRT_TRADING_DAYS_APPROX: Decimal = dec!(15.874507866);

/// Annualized sample standard deviation of a daily return series.
/// Returns zero for fewer than 2 observations.
pub fn volatility(daily_returns: &[Decimal], annualization_factor: u32) -> Decimal {
    if daily_returns.len() < 2 {
        return Decimal::ZERO;
    }

    let count = Decimal::from(daily_returns.len());
    let sum: Decimal = daily_returns.iter().sum();
    let mean = sum / count;

    let sum_squared_diff: Decimal = daily_returns
        .iter()
        .map(|&r| {
            let diff = r - mean;
            diff * diff
        })
        .sum();

    let variance = sum_squared_diff / (count - Decimal::ONE);
    if variance.is_sign_negative() {
        return Decimal::ZERO;
    }

    let daily_volatility = variance.sqrt().unwrap_or(Decimal::ZERO);

    let annualization = Decimal::from(annualization_factor)
        .sqrt()
        .unwrap_or(SQRT_TRADING_DAYS_APPROX);

    daily_volatility * annualization
}

/// Annualized Sharpe ratio: `(mean * factor - risk_free_rate) / volatility`.
/// `None` when volatility is zero - a flat series (all-cash fund) is a valid
/// state with no defined risk-adjusted return.
pub fn sharpe_ratio(
    daily_returns: &[Decimal],
    annualized_volatility: Decimal,
    config: &RiskConfig,
) -> Option<Decimal> {
    if annualized_volatility.is_zero() || daily_returns.is_empty() {
        return None;
    }
    let count = Decimal::from(daily_returns.len());
    let mean = daily_returns.iter().sum::<Decimal>() / count;
    let annualized_mean = mean * Decimal::from(config.annualization_factor);
    Some((annualized_mean - config.risk_free_rate) / annualized_volatility)
}

/// Maximum drawdown of the NAV index compounded from daily returns:
/// `max over t of (peak[t] - nav[t]) / peak[t]`. Always reported as a
/// non-negative magnitude.
pub fn max_drawdown(daily_returns: &[Decimal]) -> Decimal {
    if daily_returns.is_empty() {
        return Decimal::ZERO;
    }

    let mut cumulative_value = Decimal::ONE;
    let mut peak_value = Decimal::ONE;
    let mut max_dd = Decimal::ZERO;

    for &daily_return in daily_returns {
        cumulative_value *= Decimal::ONE + daily_return;
        peak_value = peak_value.max(cumulative_value);
        if peak_value.is_zero() {
            max_dd = max_dd.max(Decimal::ONE);
        } else {
            let drawdown = (peak_value - cumulative_value) / peak_value;
            max_dd = max_dd.max(drawdown);
        }
    }

    max_dd.max(Decimal::ZERO)
}

/// Historical-simulation VaR: the loss magnitude at the `(1 - confidence)`
/// percentile of the observed daily return distribution.
///
/// Fails with `InsufficientSample` below `sample_floor` - a percentile of a
/// ten-point sample is a statistically meaningless number, not a metric.
pub fn historical_var(
    daily_returns: &[Decimal],
    confidence: Decimal,
    sample_floor: usize,
) -> Result<Decimal> {
    if daily_returns.len() < sample_floor {
        return Err(RiskError::InsufficientSample {
            floor: sample_floor,
            actual: daily_returns.len(),
        }
        .into());
    }

    // Sort ascending - worst returns first
    let mut sorted = daily_returns.to_vec();
    sorted.sort();

    let index = ((Decimal::ONE - confidence) * Decimal::from(sorted.len()))
        .floor()
        .to_usize()
        .unwrap_or(0)
        .min(sorted.len() - 1);

    let var_return = sorted[index];

    // A positive percentile return means no loss at this confidence.
    Ok((-var_return).max(Decimal::ZERO))
}

/// Computes the full metric set for one daily return series.
/// Fails with `InsufficientSample` when the series is below the VaR floor;
/// callers wanting partial metrics use the individual functions.
pub fn compute(daily_returns: &[Decimal], config: &RiskConfig) -> Result<RiskMetrics> {
    let value_at_risk = historical_var(daily_returns, config.confidence, config.var_sample_floor)?;
    let annualized_volatility = volatility(daily_returns, config.annualization_factor);

    Ok(RiskMetrics {
        volatility: annualized_volatility,
        sharpe_ratio: sharpe_ratio(daily_returns, annualized_volatility, config),
        max_drawdown: max_drawdown(daily_returns),
        value_at_risk,
        confidence: config.confidence,
        sample_size: daily_returns.len(),
    })
}
