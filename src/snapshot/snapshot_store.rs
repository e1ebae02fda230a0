//! Versioned, read-optimized store of immutable snapshot data.
//!
//! Queries are computation over immutable state: ingestion builds a fresh
//! `StoreState` and swaps the shared pointer under a short write lock, so
//! in-flight readers keep whatever `Arc` they already cloned and never
//! observe a half-updated dataset. The version counter feeds the query
//! cache key.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, warn};

use crate::benchmark::BenchmarkSeries;
use crate::errors::{Result, StoreError};

use super::{PortfolioDataset, SnapshotLoaderTrait};

#[derive(Debug, Default)]
struct StoreState {
    version: u64,
    portfolios: HashMap<String, Arc<PortfolioDataset>>,
    benchmarks: HashMap<String, Arc<BenchmarkSeries>>,
}

/// In-memory snapshot store. Single writer (ingestion), many readers.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    state: RwLock<Arc<StoreState>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current store version. Bumped on every ingestion.
    pub fn version(&self) -> u64 {
        self.state.read().unwrap().version
    }

    /// Installs (or replaces) a portfolio dataset and bumps the version.
    /// Runs the NAV consistency check; violations are logged and returned,
    /// never fatal. Returns the new store version.
    pub fn ingest_portfolio(&self, dataset: PortfolioDataset) -> u64 {
        let warnings = dataset.check_consistency();
        for warning in &warnings {
            warn!("Snapshot consistency: {}", warning);
        }

        let mut guard = self.state.write().unwrap();
        let mut next = StoreState {
            version: guard.version + 1,
            portfolios: guard.portfolios.clone(),
            benchmarks: guard.benchmarks.clone(),
        };
        debug!(
            "Ingesting portfolio '{}' ({} snapshots, {} position days) as store version {}",
            dataset.portfolio_id,
            dataset.snapshots.len(),
            dataset.positions_by_date.len(),
            next.version
        );
        next.portfolios
            .insert(dataset.portfolio_id.clone(), Arc::new(dataset));
        *guard = Arc::new(next);
        guard.version
    }

    /// Installs (or replaces) a benchmark price series and bumps the version.
    pub fn ingest_benchmark(&self, series: BenchmarkSeries) -> u64 {
        let mut guard = self.state.write().unwrap();
        let mut next = StoreState {
            version: guard.version + 1,
            portfolios: guard.portfolios.clone(),
            benchmarks: guard.benchmarks.clone(),
        };
        next.benchmarks
            .insert(series.instrument_id.clone(), Arc::new(series));
        *guard = Arc::new(next);
        guard.version
    }

    /// Returns the dataset for a portfolio, or `PortfolioNotFound`.
    pub fn get_portfolio(&self, portfolio_id: &str) -> Result<Arc<PortfolioDataset>> {
        self.state
            .read()
            .unwrap()
            .portfolios
            .get(portfolio_id)
            .cloned()
            .ok_or_else(|| StoreError::PortfolioNotFound(portfolio_id.to_string()).into())
    }

    pub fn get_benchmark(&self, instrument_id: &str) -> Option<Arc<BenchmarkSeries>> {
        self.state
            .read()
            .unwrap()
            .benchmarks
            .get(instrument_id)
            .cloned()
    }

    /// Available snapshot date range for a portfolio, if it has any data.
    pub fn available_range(&self, portfolio_id: &str) -> Option<(NaiveDate, NaiveDate)> {
        let dataset = self.get_portfolio(portfolio_id).ok()?;
        Some((dataset.inception_date()?, dataset.latest_date()?))
    }

    /// Loads a portfolio through the loader seam with a timeout and ingests
    /// it. Expiry maps to `StoreError::DataUnavailable`.
    pub async fn load_portfolio_with_timeout(
        &self,
        loader: &dyn SnapshotLoaderTrait,
        portfolio_id: &str,
        timeout: Duration,
    ) -> Result<u64> {
        let dataset = tokio::time::timeout(timeout, loader.load_portfolio(portfolio_id))
            .await
            .map_err(|_| StoreError::DataUnavailable {
                key: portfolio_id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })??;
        Ok(self.ingest_portfolio(dataset))
    }

    /// Loads a benchmark series through the loader seam with a timeout.
    pub async fn load_benchmark_with_timeout(
        &self,
        loader: &dyn SnapshotLoaderTrait,
        instrument_id: &str,
        timeout: Duration,
    ) -> Result<u64> {
        let series = tokio::time::timeout(timeout, loader.load_benchmark(instrument_id))
            .await
            .map_err(|_| StoreError::DataUnavailable {
                key: instrument_id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })??;
        Ok(self.ingest_benchmark(series))
    }
}
