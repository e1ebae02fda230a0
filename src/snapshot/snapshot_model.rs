//! Snapshot domain models: daily NAV records and per-asset positions.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::assets::Asset;
use crate::constants::NAV_CONSISTENCY_TOLERANCE;

/// One portfolio-level valuation record per trading day.
/// Immutable once written; the ingestion process is append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySnapshot {
    pub id: String, // "PORTFOLIOID_YYYY-MM-DD"
    pub portfolio_id: String,
    pub snapshot_date: NaiveDate,
    /// Net asset value: positions + cash, in the portfolio currency.
    pub nav: Decimal,
    pub cash_balance: Decimal,
    /// Signed external cash flow recorded against this day (deposits
    /// positive, withdrawals negative). `None` when flow data is not
    /// tracked; returns computed from such a day are flagged as not
    /// cash-flow-adjusted.
    #[serde(default)]
    pub net_external_flow: Option<Decimal>,
    pub currency: String,
}

impl DailySnapshot {
    pub fn new(
        portfolio_id: &str,
        snapshot_date: NaiveDate,
        nav: Decimal,
        cash_balance: Decimal,
        net_external_flow: Option<Decimal>,
        currency: &str,
    ) -> Self {
        Self {
            id: format!("{}_{}", portfolio_id, snapshot_date),
            portfolio_id: portfolio_id.to_string(),
            snapshot_date,
            nav,
            cash_balance,
            net_external_flow,
            currency: currency.to_string(),
        }
    }
}

/// One held asset on one day. Many per `DailySnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub portfolio_id: String,
    pub as_of_date: NaiveDate,
    pub asset_id: String,
    pub quantity: Decimal,
    /// Average cost per unit in the asset's currency.
    pub average_cost: Decimal,
    pub market_price: Decimal,
    pub market_value: Decimal,
}

/// A non-fatal data-quality issue found while ingesting a portfolio dataset.
/// Ingestion continues; the warning is logged and kept for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotConsistencyWarning {
    pub portfolio_id: String,
    pub date: NaiveDate,
    pub message: String,
}

impl std::fmt::Display for SnapshotConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Portfolio {} on {}: {}",
            self.portfolio_id, self.date, self.message
        )
    }
}

/// Everything the engine needs about one portfolio, pre-indexed for reads.
/// Built once at ingestion; treated as immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDataset {
    pub portfolio_id: String,
    pub currency: String,
    /// Daily NAV records, sorted strictly by ascending date.
    pub snapshots: Vec<DailySnapshot>,
    /// Position records grouped by date, each day's map keyed by asset id.
    pub positions_by_date: HashMap<NaiveDate, HashMap<String, PositionRecord>>,
    /// Reference data for every asset appearing in `positions_by_date`.
    pub assets: HashMap<String, Asset>,
}

impl PortfolioDataset {
    /// Builds a dataset from raw ingestion rows, sorting snapshots and
    /// indexing positions. Row order does not matter.
    pub fn from_rows(
        portfolio_id: &str,
        currency: &str,
        mut snapshots: Vec<DailySnapshot>,
        positions: Vec<PositionRecord>,
        assets: Vec<Asset>,
    ) -> Self {
        snapshots.sort_by_key(|s| s.snapshot_date);
        snapshots.dedup_by_key(|s| s.snapshot_date);

        let mut positions_by_date: HashMap<NaiveDate, HashMap<String, PositionRecord>> =
            HashMap::new();
        for position in positions {
            positions_by_date
                .entry(position.as_of_date)
                .or_default()
                .insert(position.asset_id.clone(), position);
        }

        Self {
            portfolio_id: portfolio_id.to_string(),
            currency: currency.to_string(),
            snapshots,
            positions_by_date,
            assets: assets.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    /// First snapshot date - the portfolio's inception for all-time queries.
    pub fn inception_date(&self) -> Option<NaiveDate> {
        self.snapshots.first().map(|s| s.snapshot_date)
    }

    /// Latest snapshot date available.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.snapshots.last().map(|s| s.snapshot_date)
    }

    /// Snapshots inside `[start, end]`, still sorted by date.
    pub fn snapshots_between(&self, start: NaiveDate, end: NaiveDate) -> &[DailySnapshot] {
        let from = self.snapshots.partition_point(|s| s.snapshot_date < start);
        let to = self.snapshots.partition_point(|s| s.snapshot_date <= end);
        &self.snapshots[from..to]
    }

    /// Dates inside `[start, end]` that carry position data, ascending.
    pub fn position_dates_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .positions_by_date
            .keys()
            .copied()
            .filter(|d| *d >= start && *d <= end)
            .collect();
        dates.sort();
        dates
    }

    /// Checks the `sum(market_value) + cash_balance == nav` invariant for
    /// every day, within the configured rounding tolerance. Violations are
    /// data-quality warnings, never fatal: an external ingestion bug should
    /// not take queries down.
    pub fn check_consistency(&self) -> Vec<SnapshotConsistencyWarning> {
        let tolerance = Decimal::from_str_radix(NAV_CONSISTENCY_TOLERANCE, 10)
            .unwrap_or_else(|_| Decimal::new(1, 2));
        let mut warnings = Vec::new();

        for snapshot in &self.snapshots {
            let Some(day_positions) = self.positions_by_date.get(&snapshot.snapshot_date) else {
                continue;
            };
            let position_total: Decimal = day_positions.values().map(|p| p.market_value).sum();
            let implied_nav = position_total + snapshot.cash_balance;
            if (implied_nav - snapshot.nav).abs() > tolerance {
                warnings.push(SnapshotConsistencyWarning {
                    portfolio_id: self.portfolio_id.clone(),
                    date: snapshot.snapshot_date,
                    message: format!(
                        "positions ({}) + cash ({}) = {} differs from nav {}",
                        position_total, snapshot.cash_balance, implied_nav, snapshot.nav
                    ),
                });
            }
        }

        warnings
    }
}
