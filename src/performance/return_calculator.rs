//! Return calculation over ordered NAV series.
//!
//! All returns are decimal fractions (0.012, not "1.2%"); formatting to
//! percentage is a presentation concern. Period returns always compound
//! geometrically - arithmetic summation is reserved for the attribution
//! engine's first-order daily terms, never for headline numbers.

use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::errors::{CalculatorError, Result};
use crate::snapshot::DailySnapshot;

use super::{ReturnPoint, TrailingReturns};

const DAYS_PER_YEAR_DECIMAL: Decimal = dec!(365.25);

/// Daily simple return between two consecutive snapshots, excluding any
/// external cash flow recorded on the later day (time-weighted convention):
/// `(nav[t] - flow[t]) / nav[t-1] - 1`.
///
/// When flow data is unavailable the unadjusted NAV return is used and the
/// second tuple element is `false` so callers can flag the series.
pub fn daily_return_between(prev: &DailySnapshot, curr: &DailySnapshot) -> (Decimal, bool) {
    if prev.nav.is_zero() {
        // A freshly funded portfolio has no meaningful prior base.
        return (Decimal::ZERO, curr.net_external_flow.is_some());
    }
    match curr.net_external_flow {
        Some(flow) => (((curr.nav - flow) / prev.nav) - Decimal::ONE, true),
        None => ((curr.nav / prev.nav) - Decimal::ONE, false),
    }
}

/// Lazily walks an ordered NAV series, yielding one `ReturnPoint` per
/// snapshot. The first point carries `daily_return: None`. An empty series
/// yields nothing.
pub fn daily_returns(snapshots: &[DailySnapshot]) -> impl Iterator<Item = ReturnPoint> + '_ {
    let mut cumulative = Decimal::ONE;
    snapshots.iter().enumerate().map(move |(i, snapshot)| {
        if i == 0 {
            ReturnPoint {
                date: snapshot.snapshot_date,
                daily_return: None,
                cumulative_return: Decimal::ZERO,
                cash_flow_adjusted: true,
            }
        } else {
            let (daily, adjusted) = daily_return_between(&snapshots[i - 1], snapshot);
            cumulative *= Decimal::ONE + daily;
            ReturnPoint {
                date: snapshot.snapshot_date,
                daily_return: Some(daily),
                cumulative_return: cumulative - Decimal::ONE,
                cash_flow_adjusted: adjusted,
            }
        }
    })
}

/// Cumulative period return over the whole series: `∏(1+r_i) - 1`.
/// Fails with `InsufficientData` when fewer than 2 snapshots exist.
pub fn period_return(snapshots: &[DailySnapshot]) -> Result<Decimal> {
    if snapshots.len() < 2 {
        return Err(CalculatorError::InsufficientData {
            required: 2,
            actual: snapshots.len(),
        }
        .into());
    }
    let compounded = daily_returns(snapshots)
        .filter_map(|p| p.daily_return)
        .fold(Decimal::ONE, |acc, r| acc * (Decimal::ONE + r));
    Ok(compounded - Decimal::ONE)
}

/// Geometric compounding of a plain daily-return slice.
pub fn compound(daily: &[Decimal]) -> Decimal {
    daily
        .iter()
        .fold(Decimal::ONE, |acc, r| acc * (Decimal::ONE + *r))
        - Decimal::ONE
}

/// Annualizes a total return over the elapsed calendar days.
/// Periods under one year are returned as-is; total losses are capped at
/// -100% before exponentiation.
pub fn annualized_return(
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_return: Decimal,
) -> Decimal {
    if start_date > end_date {
        return Decimal::ZERO;
    }

    if total_return <= dec!(-1.0) {
        return dec!(-1.0);
    }

    let days = (end_date - start_date).num_days();
    if days <= 0 {
        return total_return;
    }

    let years = Decimal::from(days) / DAYS_PER_YEAR_DECIMAL;
    if years < Decimal::ONE {
        return total_return;
    }

    let base = Decimal::ONE + total_return;
    if base <= Decimal::ZERO {
        return dec!(-1.0);
    }

    let exponent = Decimal::ONE / years;
    base.powd(exponent) - Decimal::ONE
}

/// Trailing 1-day / 1-week / 1-month returns off the end of the series,
/// using record offsets (1, 7, and 30 trading-day records back). Each is
/// `None` when the series is too short - never a fabricated zero.
pub fn trailing_returns(snapshots: &[DailySnapshot]) -> TrailingReturns {
    let Some(latest) = snapshots.last() else {
        return TrailingReturns::default();
    };

    let window = |offset: usize| -> Option<Decimal> {
        if snapshots.len() <= offset {
            return None;
        }
        let base = &snapshots[snapshots.len() - 1 - offset];
        if base.nav.is_zero() {
            return None;
        }
        Some((latest.nav - base.nav) / base.nav)
    };

    TrailingReturns {
        day_1: window(1),
        week_1: window(7),
        month_1: window(30),
    }
}
