//! TWR attribution over daily position snapshots.
//!
//! Weighting method (used consistently everywhere): **daily re-weighting**.
//! Each day's asset contribution is its day-start weight times its daily
//! price return; daily contributions are then reconciled to the compounded
//! period TWR by logarithmic linking, so per-asset contributions sum to the
//! geometric period return instead of its arithmetic approximation.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use log::warn;
use rust_decimal::{Decimal, MathematicalOps};

use crate::assets::Region;
use crate::constants::{CONTRIBUTION_CHECK_EPSILON, DECIMAL_PRECISION};
use crate::errors::{CalculatorError, Error, Result, ValidationError};
use crate::snapshot::PortfolioDataset;
use crate::utils::CancellationToken;

use super::{
    AssetClassContribution, AssetContribution, AssetDetail, AssetFilter, AttributionResult,
    ClassReturnPoint, PortfolioReturnPoint, PricePerformancePoint, WeightPoint,
};

const UNKNOWN_ASSET_CLASS: &str = "Unknown";

/// Decomposes the portfolio's period TWR into per-asset and per-class
/// contributions over `[start, end]`.
///
/// The filter restricts the universe before weight normalization:
/// filtered-out assets leave both the numerator and the denominator. An
/// asset that was fully liquidated mid-period still appears with its
/// pro-rated partial-period contribution. The token is checked between
/// per-asset computations.
pub fn attribute(
    dataset: &PortfolioDataset,
    start: NaiveDate,
    end: NaiveDate,
    filter: AssetFilter,
    cancel: &CancellationToken,
) -> Result<AttributionResult> {
    if start > end {
        return Err(ValidationError::InvalidDateRange { start, end }.into());
    }

    let dates = dataset.position_dates_between(start, end);
    if dates.len() < 2 {
        return Err(CalculatorError::InsufficientData {
            required: 2,
            actual: dates.len(),
        }
        .into());
    }

    let included = |asset_id: &str| -> bool {
        match filter {
            AssetFilter::All => true,
            _ => dataset
                .assets
                .get(asset_id)
                .map(|a| filter.matches(a.region))
                .unwrap_or(false),
        }
    };

    // Universe: every filtered asset with market value at any point in the
    // period, in id order for deterministic iteration and tie-breaking.
    let mut universe: BTreeSet<String> = BTreeSet::new();
    for date in &dates {
        if let Some(day) = dataset.positions_by_date.get(date) {
            for (asset_id, position) in day {
                if !position.market_value.is_zero() && included(asset_id) {
                    universe.insert(asset_id.clone());
                }
            }
        }
    }

    let market_value = |t: usize, asset_id: &str| -> Decimal {
        dataset
            .positions_by_date
            .get(&dates[t])
            .and_then(|day| day.get(asset_id))
            .map(|p| p.market_value)
            .unwrap_or(Decimal::ZERO)
    };
    let price = |t: usize, asset_id: &str| -> Option<Decimal> {
        dataset
            .positions_by_date
            .get(&dates[t])
            .and_then(|day| day.get(asset_id))
            .map(|p| p.market_price)
            .filter(|p| !p.is_zero())
    };

    // Day totals over the filtered universe (the renormalized denominator).
    let totals: Vec<Decimal> = (0..dates.len())
        .map(|t| universe.iter().map(|a| market_value(t, a)).sum())
        .collect();

    // First pass: unscaled daily contributions and the portfolio daily
    // return series. Prices carry forward over gaps (no look-ahead), so a
    // liquidated asset stops contributing instead of producing phantom
    // moves.
    let mut last_price: HashMap<&str, Decimal> = HashMap::new();
    for asset_id in &universe {
        if let Some(p) = price(0, asset_id) {
            last_price.insert(asset_id.as_str(), p);
        }
    }

    let mut contrib_by_day: Vec<HashMap<&str, Decimal>> = Vec::with_capacity(dates.len());
    contrib_by_day.push(HashMap::new());
    let mut daily_portfolio_returns: Vec<Option<Decimal>> = vec![None]; // day 0 has no return
    let mut points = vec![PortfolioReturnPoint {
        date: dates[0],
        daily_return: None,
        portfolio_value: totals[0],
    }];

    for t in 1..dates.len() {
        let prev_total = totals[t - 1];
        let mut day_contrib: HashMap<&str, Decimal> = HashMap::new();
        let mut day_return: Option<Decimal> = None;

        if prev_total > Decimal::ZERO {
            let mut sum = Decimal::ZERO;
            for asset_id in &universe {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                let weight = market_value(t - 1, asset_id) / prev_total;
                let prev_price = last_price.get(asset_id.as_str()).copied();
                let curr_price = price(t, asset_id);
                if let Some(p) = curr_price {
                    last_price.insert(asset_id.as_str(), p);
                }

                let asset_return = match (prev_price, curr_price) {
                    (Some(prev), Some(curr)) if !prev.is_zero() => curr / prev - Decimal::ONE,
                    _ => Decimal::ZERO,
                };

                if !weight.is_zero() && !asset_return.is_zero() {
                    let contribution = weight * asset_return;
                    day_contrib.insert(asset_id.as_str(), contribution);
                    sum += contribution;
                }
            }
            day_return = Some(sum);
        } else {
            // Nothing held the day before: there is no base to measure a
            // return against, but prices still carry forward.
            for asset_id in &universe {
                if let Some(p) = price(t, asset_id) {
                    last_price.insert(asset_id.as_str(), p);
                }
            }
        }

        daily_portfolio_returns.push(day_return);
        points.push(PortfolioReturnPoint {
            date: dates[t],
            daily_return: day_return,
            portfolio_value: totals[t],
        });
        contrib_by_day.push(day_contrib);
    }

    let total_twr = daily_portfolio_returns
        .iter()
        .flatten()
        .fold(Decimal::ONE, |acc, r| acc * (Decimal::ONE + *r))
        - Decimal::ONE;

    // Second pass: logarithmic linking. Each day is scaled by
    // ln(1+r_t)/r_t, normalized by ln(1+R)/R, which makes the per-asset
    // contributions sum to the compounded period return exactly.
    let day_factors: Vec<Decimal> = daily_portfolio_returns
        .iter()
        .map(|r| match r {
            Some(r) if !r.is_zero() => log_link_factor(*r),
            _ => Decimal::ONE,
        })
        .collect();
    let period_factor = if total_twr.is_zero() {
        Decimal::ONE
    } else {
        log_link_factor(total_twr)
    };

    let mut contributions: HashMap<&str, Decimal> = HashMap::new();
    for (t, day_contrib) in contrib_by_day.iter().enumerate() {
        for (asset_id, contribution) in day_contrib {
            *contributions.entry(*asset_id).or_insert(Decimal::ZERO) +=
                *contribution * day_factors[t] / period_factor;
        }
    }

    // Per-asset aggregates. Day-start weights exclude the last day; the
    // last day's weight is the current allocation.
    let mut asset_rows: Vec<AssetContribution> = Vec::with_capacity(universe.len());
    let last = dates.len() - 1;
    for asset_id in &universe {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut weight_sum = Decimal::ZERO;
        let mut weight_count = 0u32;
        for t in 0..last {
            if totals[t] > Decimal::ZERO {
                weight_sum += market_value(t, asset_id) / totals[t];
                weight_count += 1;
            }
        }
        let avg_weight = if weight_count > 0 {
            weight_sum / Decimal::from(weight_count)
        } else {
            Decimal::ZERO
        };

        let current_allocation = if totals[last] > Decimal::ZERO {
            market_value(last, asset_id) / totals[last]
        } else {
            Decimal::ZERO
        };

        let period_return = asset_period_return(&dates, asset_id, &price);

        let (ticker, name, asset_class, region) = match dataset.assets.get(asset_id) {
            Some(asset) => (
                asset.ticker.clone(),
                asset.display_name().to_string(),
                asset.asset_class.clone(),
                asset.region,
            ),
            None => (
                asset_id.clone(),
                asset_id.clone(),
                UNKNOWN_ASSET_CLASS.to_string(),
                Region::default(),
            ),
        };

        asset_rows.push(AssetContribution {
            asset_id: asset_id.clone(),
            ticker,
            name,
            asset_class,
            region,
            current_allocation: current_allocation.round_dp(DECIMAL_PRECISION),
            avg_weight: avg_weight.round_dp(DECIMAL_PRECISION),
            period_return: period_return.round_dp(DECIMAL_PRECISION),
            contribution: contributions
                .get(asset_id.as_str())
                .copied()
                .unwrap_or(Decimal::ZERO)
                .round_dp(DECIMAL_PRECISION),
        });
    }

    let class_rows = rollup_by_class(dataset, &asset_rows, &dates, &totals, &contrib_by_day);

    let mut top_contributors: Vec<AssetContribution> = asset_rows
        .iter()
        .filter(|a| a.contribution > Decimal::ZERO)
        .cloned()
        .collect();
    top_contributors.sort_by(|a, b| {
        b.contribution
            .cmp(&a.contribution)
            .then_with(|| a.asset_id.cmp(&b.asset_id))
    });

    let mut top_detractors: Vec<AssetContribution> = asset_rows
        .iter()
        .filter(|a| a.contribution < Decimal::ZERO)
        .cloned()
        .collect();
    top_detractors.sort_by(|a, b| {
        a.contribution
            .cmp(&b.contribution)
            .then_with(|| a.asset_id.cmp(&b.asset_id))
    });

    let total_contribution_check: Decimal = class_rows.iter().map(|c| c.contribution).sum();
    let reconciliation_gap = (total_contribution_check - total_twr).abs();
    let epsilon = Decimal::from_str_radix(CONTRIBUTION_CHECK_EPSILON, 10)
        .unwrap_or_else(|_| Decimal::new(1, 4));
    if reconciliation_gap > epsilon {
        warn!(
            "Attribution reconciliation gap {} exceeds {} for portfolio '{}' ({} to {})",
            reconciliation_gap, epsilon, dataset.portfolio_id, start, end
        );
    }

    Ok(AttributionResult {
        total_twr: total_twr.round_dp(DECIMAL_PRECISION),
        daily_returns: points,
        asset_class_contributions: class_rows,
        top_contributors,
        top_detractors,
        total_contribution_check: total_contribution_check.round_dp(DECIMAL_PRECISION),
        reconciliation_gap,
    })
}

/// `ln(1+r)/r`, the per-day linking coefficient. Falls back to 1 when the
/// logarithm is undefined (a -100% day), which keeps the computation alive
/// on pathological data.
fn log_link_factor(r: Decimal) -> Decimal {
    let base = Decimal::ONE + r;
    if base <= Decimal::ZERO {
        warn!("Log-linking undefined for return {}; using identity factor", r);
        return Decimal::ONE;
    }
    match base.checked_ln() {
        Some(ln) => ln / r,
        None => Decimal::ONE,
    }
}

/// Price-relative return over the sub-period the asset has prices for.
fn asset_period_return(
    dates: &[NaiveDate],
    asset_id: &str,
    price: &impl Fn(usize, &str) -> Option<Decimal>,
) -> Decimal {
    let mut first: Option<Decimal> = None;
    let mut last: Option<Decimal> = None;
    for t in 0..dates.len() {
        if let Some(p) = price(t, asset_id) {
            if first.is_none() {
                first = Some(p);
            }
            last = Some(p);
        }
    }
    match (first, last) {
        (Some(first), Some(last)) if !first.is_zero() => last / first - Decimal::ONE,
        _ => Decimal::ZERO,
    }
}

/// Groups asset rows into class rollups and builds the per-class chart
/// series (weight trend and daily/cumulative return trend).
fn rollup_by_class(
    dataset: &PortfolioDataset,
    asset_rows: &[AssetContribution],
    dates: &[NaiveDate],
    totals: &[Decimal],
    contrib_by_day: &[HashMap<&str, Decimal>],
) -> Vec<AssetClassContribution> {
    let mut by_class: HashMap<String, Vec<AssetContribution>> = HashMap::new();
    for row in asset_rows {
        by_class
            .entry(row.asset_class.clone())
            .or_default()
            .push(row.clone());
    }

    let mut class_rows: Vec<AssetClassContribution> = Vec::with_capacity(by_class.len());
    for (asset_class, assets) in by_class {
        let asset_ids: BTreeSet<&str> = assets.iter().map(|a| a.asset_id.as_str()).collect();

        let class_mv = |t: usize| -> Decimal {
            dataset
                .positions_by_date
                .get(&dates[t])
                .map(|day| {
                    day.iter()
                        .filter(|(id, _)| asset_ids.contains(id.as_str()))
                        .map(|(_, p)| p.market_value)
                        .sum()
                })
                .unwrap_or(Decimal::ZERO)
        };

        let mut weight_trend = Vec::with_capacity(dates.len());
        let mut return_trend = Vec::with_capacity(dates.len());
        let mut cumulative = Decimal::ONE;

        for t in 0..dates.len() {
            let weight = if totals[t] > Decimal::ZERO {
                class_mv(t) / totals[t]
            } else {
                Decimal::ZERO
            };
            weight_trend.push(WeightPoint {
                date: dates[t],
                weight: weight.round_dp(DECIMAL_PRECISION),
            });

            // Class daily return: the class's share of the portfolio's
            // daily return, renormalized by the class's day-start weight.
            let daily = if t == 0 {
                Decimal::ZERO
            } else {
                let class_weight_prev = if totals[t - 1] > Decimal::ZERO {
                    class_mv(t - 1) / totals[t - 1]
                } else {
                    Decimal::ZERO
                };
                if class_weight_prev.is_zero() {
                    Decimal::ZERO
                } else {
                    let class_contrib: Decimal = contrib_by_day[t]
                        .iter()
                        .filter(|(id, _)| asset_ids.contains(*id))
                        .map(|(_, c)| *c)
                        .sum();
                    class_contrib / class_weight_prev
                }
            };
            cumulative *= Decimal::ONE + daily;
            return_trend.push(ClassReturnPoint {
                date: dates[t],
                daily_return: daily.round_dp(DECIMAL_PRECISION),
                cumulative_return: (cumulative - Decimal::ONE).round_dp(DECIMAL_PRECISION),
            });
        }

        class_rows.push(AssetClassContribution {
            asset_class,
            current_allocation: assets.iter().map(|a| a.current_allocation).sum(),
            avg_weight: assets.iter().map(|a| a.avg_weight).sum(),
            contribution: assets.iter().map(|a| a.contribution).sum(),
            weight_trend,
            return_trend,
            assets,
        });
    }

    // Largest contributors first, deterministic on ties.
    class_rows.sort_by(|a, b| {
        b.contribution
            .cmp(&a.contribution)
            .then_with(|| a.asset_class.cmp(&b.asset_class))
    });
    class_rows
}

/// Drill-down detail for one asset: allocation and price performance over
/// the period, plus its contribution from a full (unfiltered) attribution
/// run.
pub fn asset_detail(
    dataset: &PortfolioDataset,
    asset_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    cancel: &CancellationToken,
) -> Result<AssetDetail> {
    let asset = dataset.assets.get(asset_id).ok_or_else(|| {
        Error::Validation(ValidationError::InvalidInput(format!(
            "asset '{}' not found",
            asset_id
        )))
    })?;

    let dates = dataset.position_dates_between(start, end);
    let mut price_points: Vec<(NaiveDate, Decimal)> = Vec::new();
    for date in &dates {
        if let Some(position) = dataset
            .positions_by_date
            .get(date)
            .and_then(|day| day.get(asset_id))
        {
            if !position.market_price.is_zero() {
                price_points.push((*date, position.market_price));
            }
        }
    }

    if price_points.is_empty() {
        return Err(CalculatorError::InsufficientData {
            required: 1,
            actual: 0,
        }
        .into());
    }

    let base_price = price_points[0].1;
    let current_price = price_points[price_points.len() - 1].1;
    let price_performance: Vec<PricePerformancePoint> = price_points
        .iter()
        .map(|(date, price)| PricePerformancePoint {
            date: *date,
            performance: (*price / base_price - Decimal::ONE).round_dp(DECIMAL_PRECISION),
        })
        .collect();

    // Allocation on the latest day of the period, against the full universe.
    let current_allocation = dates
        .last()
        .and_then(|date| dataset.positions_by_date.get(date))
        .map(|day| {
            let total: Decimal = day.values().map(|p| p.market_value).sum();
            let own = day
                .get(asset_id)
                .map(|p| p.market_value)
                .unwrap_or(Decimal::ZERO);
            if total > Decimal::ZERO {
                own / total
            } else {
                Decimal::ZERO
            }
        })
        .unwrap_or(Decimal::ZERO);

    let contribution = match attribute(dataset, start, end, AssetFilter::All, cancel) {
        Ok(result) => result
            .top_contributors
            .iter()
            .chain(result.top_detractors.iter())
            .find(|a| a.asset_id == asset_id)
            .map(|a| a.contribution)
            .unwrap_or(Decimal::ZERO),
        Err(Error::Cancelled) => return Err(Error::Cancelled),
        Err(_) => Decimal::ZERO,
    };

    Ok(AssetDetail {
        asset_id: asset_id.to_string(),
        ticker: asset.ticker.clone(),
        name: asset.display_name().to_string(),
        asset_class: asset.asset_class.clone(),
        region: asset.region,
        current_allocation: current_allocation.round_dp(DECIMAL_PRECISION),
        current_price,
        period_return: (current_price / base_price - Decimal::ONE).round_dp(DECIMAL_PRECISION),
        contribution,
        price_performance,
    })
}
