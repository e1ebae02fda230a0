//! Trait seam between the engine and the backing store.

use async_trait::async_trait;

use crate::benchmark::BenchmarkSeries;
use crate::errors::Result;

use super::PortfolioDataset;

/// Loads snapshot data from the backing store (database, API, file dump -
/// not this crate's concern). Loading is the engine's only suspend point;
/// the store wraps these calls in a timeout.
#[async_trait]
pub trait SnapshotLoaderTrait: Send + Sync {
    /// Loads the full dataset for one portfolio.
    async fn load_portfolio(&self, portfolio_id: &str) -> Result<PortfolioDataset>;

    /// Loads the full price series for one benchmark instrument.
    async fn load_benchmark(&self, instrument_id: &str) -> Result<BenchmarkSeries>;
}
