//! Benchmark return computation and portfolio comparison.

use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::{BenchmarkError, Result};
use crate::snapshot::DailySnapshot;

use super::{BenchmarkComparisonSeries, BenchmarkReturn, BenchmarkSeries, IndexedPoint};

/// Benchmark cumulative return over `[start, end]`, computed the same way
/// as the portfolio's: close-to-close changes compounded geometrically.
///
/// The base level is the last known close on or before `start` (carry
/// forward, no look-ahead); when the series only begins inside the window,
/// the first in-window close is the base. The final level is the last known
/// close on or before `end`. Fails with `NoBenchmarkData` when the window
/// holds no points at all.
pub fn benchmark_return(series: &BenchmarkSeries, start: NaiveDate, end: NaiveDate) -> Result<Decimal> {
    let window = series.prices_between(start, end);
    if window.is_empty() {
        return Err(BenchmarkError::NoBenchmarkData {
            instrument_id: series.instrument_id.clone(),
            start,
            end,
        }
        .into());
    }

    let base = series
        .close_on_or_before(start)
        .unwrap_or(window.first().map(|p| p.close).unwrap_or(Decimal::ZERO));
    let last = window.last().map(|p| p.close).unwrap_or(base);

    if base.is_zero() {
        warn!(
            "Benchmark '{}' has a zero base level at {}; returning zero return.",
            series.instrument_id, start
        );
        return Ok(Decimal::ZERO);
    }

    Ok(last / base - Decimal::ONE)
}

/// Compares a portfolio's cumulative period return against one benchmark.
/// `excess_return` is the simple difference of the two geometric returns,
/// never a ratio.
pub fn compare(
    portfolio_return: Decimal,
    series: &BenchmarkSeries,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BenchmarkReturn> {
    let return_pct = benchmark_return(series, start, end)?;
    Ok(BenchmarkReturn {
        instrument_id: series.instrument_id.clone(),
        name: series.name.clone(),
        return_pct,
        excess_return: portfolio_return - return_pct,
    })
}

/// Builds the portfolio-vs-benchmark chart series: both legs rebased to 100
/// at the first common date. Portfolio dates drive the x-axis; a benchmark
/// holiday gap carries the last known close forward rather than dropping
/// the day or inventing a phantom move.
pub fn indexed_comparison(
    snapshots: &[DailySnapshot],
    series: &BenchmarkSeries,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BenchmarkComparisonSeries> {
    let window: Vec<&DailySnapshot> = snapshots
        .iter()
        .filter(|s| s.snapshot_date >= start && s.snapshot_date <= end)
        .collect();

    // First portfolio date with a benchmark level on or before it.
    let first_common = window
        .iter()
        .find(|s| series.close_on_or_before(s.snapshot_date).is_some())
        .map(|s| s.snapshot_date)
        .ok_or_else(|| BenchmarkError::NoBenchmarkData {
            instrument_id: series.instrument_id.clone(),
            start,
            end,
        })?;

    let mut portfolio_points = Vec::new();
    let mut benchmark_points = Vec::new();
    let mut base_nav = Decimal::ZERO;
    let mut base_close = Decimal::ZERO;
    let hundred = dec!(100);

    for snapshot in window {
        if snapshot.snapshot_date < first_common {
            continue;
        }
        let close = match series.close_on_or_before(snapshot.snapshot_date) {
            Some(close) => close,
            None => continue,
        };
        if base_nav.is_zero() {
            base_nav = snapshot.nav;
            base_close = close;
        }
        if base_nav.is_zero() || base_close.is_zero() {
            continue;
        }
        portfolio_points.push(IndexedPoint {
            date: snapshot.snapshot_date,
            value: snapshot.nav / base_nav * hundred,
        });
        benchmark_points.push(IndexedPoint {
            date: snapshot.snapshot_date,
            value: close / base_close * hundred,
        });
    }

    Ok(BenchmarkComparisonSeries {
        instrument_id: series.instrument_id.clone(),
        name: series.name.clone(),
        portfolio: portfolio_points,
        benchmark: benchmark_points,
    })
}
