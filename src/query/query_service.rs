//! Query facade: resolves periods, orchestrates the calculators, and
//! assembles presentation-facing responses. Recoverable section failures
//! become warnings on a partial response; only a failure of the section a
//! query is actually about propagates as an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, warn};
use rayon::prelude::*;
use rust_decimal::Decimal;

use crate::attribution::{attribute, asset_detail, AssetDetail};
use crate::benchmark::{compare, indexed_comparison, BenchmarkPolicy, BenchmarkReturn};
use crate::constants::DECIMAL_PRECISION;
use crate::errors::{BenchmarkError, CalculatorError, Error, Result, StoreError};
use crate::performance::{
    annualized_return, daily_returns, period_return, trailing_returns,
};
use crate::risk::{compute as compute_risk, historical_var, RiskConfig};
use crate::snapshot::{PortfolioDataset, SnapshotLoaderTrait, SnapshotStore};
use crate::utils::CancellationToken;

use super::{
    AllocationResponse, AssetAllocation, AssetFilter, AttributionResponse, ClassAllocation,
    PeriodSpec, PerformanceResponse, QueryCache, QueryKey, QueryWarning, ResponseSection,
    RiskResponse,
};

const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait for the query facade, the single entry point consumed by the
/// presentation layer.
#[async_trait]
pub trait QueryServiceTrait: Send + Sync {
    async fn get_attribution(
        &self,
        portfolio_id: &str,
        period: PeriodSpec,
        filter: AssetFilter,
        cancel: CancellationToken,
    ) -> Result<Arc<AttributionResponse>>;

    async fn get_performance(
        &self,
        portfolio_id: &str,
        period: PeriodSpec,
    ) -> Result<PerformanceResponse>;

    async fn get_risk(&self, portfolio_id: &str, period: PeriodSpec) -> Result<RiskResponse>;

    async fn get_allocation(&self, portfolio_id: &str) -> Result<AllocationResponse>;

    async fn get_asset_detail(
        &self,
        portfolio_id: &str,
        asset_id: &str,
        period: PeriodSpec,
        cancel: CancellationToken,
    ) -> Result<AssetDetail>;
}

pub struct QueryService {
    store: Arc<SnapshotStore>,
    loader: Option<Arc<dyn SnapshotLoaderTrait>>,
    benchmark_policy: BenchmarkPolicy,
    risk_config: RiskConfig,
    load_timeout: Duration,
    cache: QueryCache,
}

impl QueryService {
    pub fn new(
        store: Arc<SnapshotStore>,
        benchmark_policy: BenchmarkPolicy,
        risk_config: RiskConfig,
    ) -> Self {
        Self {
            store,
            loader: None,
            benchmark_policy,
            risk_config,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            cache: QueryCache::new(),
        }
    }

    /// Attaches a loader so missing portfolios are fetched on demand.
    pub fn with_loader(mut self, loader: Arc<dyn SnapshotLoaderTrait>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Loads several portfolios through the loader seam concurrently, e.g.
    /// at startup. Each load has its own timeout; failures are per-portfolio.
    pub async fn warm(&self, portfolio_ids: &[String]) -> Vec<Result<u64>> {
        let Some(loader) = &self.loader else {
            return portfolio_ids
                .iter()
                .map(|id| Err(StoreError::PortfolioNotFound(id.clone()).into()))
                .collect();
        };
        futures::future::join_all(portfolio_ids.iter().map(|id| {
            self.store
                .load_portfolio_with_timeout(loader.as_ref(), id, self.load_timeout)
        }))
        .await
    }

    /// Installs new portfolio data and drops the portfolio's cache entries.
    /// This is the engine's single serialization point.
    pub fn ingest_portfolio(&self, dataset: PortfolioDataset) -> u64 {
        let portfolio_id = dataset.portfolio_id.clone();
        let version = self.store.ingest_portfolio(dataset);
        self.cache.invalidate_portfolio(&portfolio_id);
        version
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Computes attribution for many queries in parallel. Queries are
    /// independent reads over immutable data, so this is a plain data-parallel
    /// fan-out.
    pub fn get_attribution_batch(
        &self,
        requests: &[(String, PeriodSpec, AssetFilter)],
        cancel: CancellationToken,
    ) -> Vec<Result<Arc<AttributionResponse>>> {
        requests
            .par_iter()
            .map(|(portfolio_id, period, filter)| {
                self.attribution_sync(portfolio_id, *period, *filter, &cancel)
            })
            .collect()
    }

    async fn dataset(&self, portfolio_id: &str) -> Result<Arc<PortfolioDataset>> {
        match self.store.get_portfolio(portfolio_id) {
            Ok(dataset) => Ok(dataset),
            Err(Error::Store(StoreError::PortfolioNotFound(_))) => {
                let Some(loader) = &self.loader else {
                    return Err(StoreError::PortfolioNotFound(portfolio_id.to_string()).into());
                };
                debug!("Portfolio '{}' not in store; loading", portfolio_id);
                self.store
                    .load_portfolio_with_timeout(loader.as_ref(), portfolio_id, self.load_timeout)
                    .await?;
                self.store.get_portfolio(portfolio_id)
            }
            Err(e) => Err(e),
        }
    }

    fn resolve_period(
        dataset: &PortfolioDataset,
        period: PeriodSpec,
    ) -> Result<(NaiveDate, NaiveDate)> {
        let (Some(inception), Some(latest)) = (dataset.inception_date(), dataset.latest_date())
        else {
            return Err(CalculatorError::InsufficientData {
                required: 2,
                actual: 0,
            }
            .into());
        };
        period.resolve(inception, latest)
    }

    /// Benchmark rows for one portfolio over a resolved period. Missing
    /// instruments and empty windows degrade to warnings, never to 0% rows.
    fn benchmark_rows(
        &self,
        dataset: &PortfolioDataset,
        portfolio_return: Decimal,
        start: NaiveDate,
        end: NaiveDate,
        warnings: &mut Vec<QueryWarning>,
    ) -> Vec<BenchmarkReturn> {
        let mut rows = Vec::new();
        for instrument_id in self
            .benchmark_policy
            .instruments_for(&dataset.currency, None)
        {
            let Some(series) = self.store.get_benchmark(instrument_id) else {
                warnings.push(QueryWarning::new(
                    ResponseSection::Benchmark,
                    BenchmarkError::InstrumentNotFound(instrument_id.clone()).to_string(),
                ));
                continue;
            };
            match compare(portfolio_return, &series, start, end) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!(
                        "Benchmark '{}' skipped for portfolio '{}': {}",
                        instrument_id, dataset.portfolio_id, e
                    );
                    warnings.push(QueryWarning::new(ResponseSection::Benchmark, e.to_string()));
                }
            }
        }
        rows
    }

    fn attribution_sync(
        &self,
        portfolio_id: &str,
        period: PeriodSpec,
        filter: AssetFilter,
        cancel: &CancellationToken,
    ) -> Result<Arc<AttributionResponse>> {
        let dataset = self.store.get_portfolio(portfolio_id)?;
        let (start, end) = Self::resolve_period(&dataset, period)?;

        let key = QueryKey {
            portfolio_id: portfolio_id.to_string(),
            period,
            filter,
            version: self.store.version(),
        };
        if let Some(hit) = self.cache.get(&key) {
            debug!("Attribution cache hit for '{}'", portfolio_id);
            return Ok(hit);
        }

        let result = attribute(&dataset, start, end, filter, cancel)?;

        let mut warnings = Vec::new();
        // Benchmark rows compare the whole portfolio's NAV-based return,
        // not the filtered universe's price-based TWR.
        let portfolio_return = match period_return(dataset.snapshots_between(start, end)) {
            Ok(r) => Some(r),
            Err(e) => {
                warnings.push(QueryWarning::new(ResponseSection::Returns, e.to_string()));
                None
            }
        };
        let benchmarks = match portfolio_return {
            Some(r) => self.benchmark_rows(&dataset, r, start, end, &mut warnings),
            None => Vec::new(),
        };

        let response = Arc::new(AttributionResponse {
            portfolio_id: portfolio_id.to_string(),
            period,
            asset_filter: filter,
            start_date: start,
            end_date: end,
            total_twr: result.total_twr,
            daily_returns: result.daily_returns,
            asset_class_contributions: result.asset_class_contributions,
            top_contributors: result.top_contributors,
            top_detractors: result.top_detractors,
            total_contribution_check: result.total_contribution_check,
            benchmarks,
            warnings,
        });
        self.cache.insert(key, response.clone());
        Ok(response)
    }
}

#[async_trait]
impl QueryServiceTrait for QueryService {
    async fn get_attribution(
        &self,
        portfolio_id: &str,
        period: PeriodSpec,
        filter: AssetFilter,
        cancel: CancellationToken,
    ) -> Result<Arc<AttributionResponse>> {
        self.dataset(portfolio_id).await?;
        self.attribution_sync(portfolio_id, period, filter, &cancel)
    }

    async fn get_performance(
        &self,
        portfolio_id: &str,
        period: PeriodSpec,
    ) -> Result<PerformanceResponse> {
        let dataset = self.dataset(portfolio_id).await?;
        let (start, end) = Self::resolve_period(&dataset, period)?;
        let window = dataset.snapshots_between(start, end);

        let mut warnings = Vec::new();
        let points: Vec<_> = daily_returns(window).collect();
        if points
            .iter()
            .any(|p| p.daily_return.is_some() && !p.cash_flow_adjusted)
        {
            warnings.push(QueryWarning::new(
                ResponseSection::Returns,
                "cash-flow data missing for part of the period; returns are not cash-flow-adjusted",
            ));
        }

        let cumulative_return = match period_return(window) {
            Ok(r) => Some(r.round_dp(DECIMAL_PRECISION)),
            Err(e) => {
                warn!(
                    "Performance for '{}' degraded to partial response: {}",
                    portfolio_id, e
                );
                warnings.push(QueryWarning::new(ResponseSection::Returns, e.to_string()));
                None
            }
        };
        let annualized = cumulative_return.map(|r| annualized_return(start, end, r));

        let (benchmarks, comparisons) = match cumulative_return {
            Some(r) => {
                let rows = self.benchmark_rows(&dataset, r, start, end, &mut warnings);
                let charts = rows
                    .iter()
                    .filter_map(|row| {
                        self.store.get_benchmark(&row.instrument_id).and_then(|s| {
                            indexed_comparison(window, &s, start, end).ok()
                        })
                    })
                    .collect();
                (rows, charts)
            }
            None => (Vec::new(), Vec::new()),
        };

        Ok(PerformanceResponse {
            portfolio_id: portfolio_id.to_string(),
            start_date: start,
            end_date: end,
            cumulative_return,
            annualized_return: annualized,
            returns: points,
            trailing: trailing_returns(window),
            benchmarks,
            comparisons,
            warnings,
        })
    }

    async fn get_risk(&self, portfolio_id: &str, period: PeriodSpec) -> Result<RiskResponse> {
        let dataset = self.dataset(portfolio_id).await?;
        let (start, end) = Self::resolve_period(&dataset, period)?;
        let window = dataset.snapshots_between(start, end);

        let daily: Vec<Decimal> = daily_returns(window)
            .filter_map(|p| p.daily_return)
            .collect();

        let mut warnings = Vec::new();
        let metrics = match compute_risk(&daily, &self.risk_config) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(
                    "Risk metrics for '{}' unavailable: {}",
                    portfolio_id, e
                );
                warnings.push(QueryWarning::new(ResponseSection::Risk, e.to_string()));
                None
            }
        };

        let floor = self.risk_config.var_sample_floor;
        let var_95 = historical_var(&daily, Decimal::new(95, 2), floor).ok();
        let var_99 = historical_var(&daily, Decimal::new(99, 2), floor).ok();

        Ok(RiskResponse {
            portfolio_id: portfolio_id.to_string(),
            start_date: start,
            end_date: end,
            metrics,
            var_95,
            var_99,
            warnings,
        })
    }

    async fn get_allocation(&self, portfolio_id: &str) -> Result<AllocationResponse> {
        let dataset = self.dataset(portfolio_id).await?;

        let mut warnings = Vec::new();
        let as_of_date = dataset.positions_by_date.keys().max().copied();
        let Some(as_of) = as_of_date else {
            warnings.push(QueryWarning::new(
                ResponseSection::Allocation,
                "no position data available",
            ));
            return Ok(AllocationResponse {
                portfolio_id: portfolio_id.to_string(),
                as_of_date: None,
                total_value: Decimal::ZERO,
                classes: Vec::new(),
                warnings,
            });
        };

        let day = &dataset.positions_by_date[&as_of];
        let total_value: Decimal = day.values().map(|p| p.market_value).sum();

        let mut by_class: std::collections::HashMap<String, Vec<AssetAllocation>> =
            std::collections::HashMap::new();
        for (asset_id, position) in day {
            if position.quantity.is_zero() {
                continue;
            }
            let (ticker, name, class) = match dataset.assets.get(asset_id) {
                Some(asset) => (
                    asset.ticker.clone(),
                    asset.display_name().to_string(),
                    asset.asset_class.clone(),
                ),
                None => (asset_id.clone(), asset_id.clone(), "Unknown".to_string()),
            };
            let weight = if total_value > Decimal::ZERO {
                position.market_value / total_value
            } else {
                Decimal::ZERO
            };
            by_class.entry(class).or_default().push(AssetAllocation {
                asset_id: asset_id.clone(),
                ticker,
                name,
                quantity: position.quantity,
                market_value: position.market_value,
                weight: weight.round_dp(DECIMAL_PRECISION),
            });
        }

        let mut classes: Vec<ClassAllocation> = by_class
            .into_iter()
            .map(|(asset_class, mut assets)| {
                assets.sort_by(|a, b| {
                    b.market_value
                        .cmp(&a.market_value)
                        .then_with(|| a.asset_id.cmp(&b.asset_id))
                });
                ClassAllocation {
                    asset_class,
                    total_value: assets.iter().map(|a| a.market_value).sum(),
                    weight: assets.iter().map(|a| a.weight).sum(),
                    assets,
                }
            })
            .collect();
        classes.sort_by(|a, b| {
            b.total_value
                .cmp(&a.total_value)
                .then_with(|| a.asset_class.cmp(&b.asset_class))
        });

        Ok(AllocationResponse {
            portfolio_id: portfolio_id.to_string(),
            as_of_date,
            total_value,
            classes,
            warnings,
        })
    }

    async fn get_asset_detail(
        &self,
        portfolio_id: &str,
        asset_id: &str,
        period: PeriodSpec,
        cancel: CancellationToken,
    ) -> Result<AssetDetail> {
        let dataset = self.dataset(portfolio_id).await?;
        let (start, end) = Self::resolve_period(&dataset, period)?;
        asset_detail(&dataset, asset_id, start, end, &cancel)
    }
}
