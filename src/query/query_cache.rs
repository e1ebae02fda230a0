//! Typed memoization cache for attribution queries.
//!
//! Keys are explicit structs scoped by portfolio id - invalidation is a
//! direct match on the portfolio, not a substring scan over stringified
//! keys. The store version inside the key makes stale entries unreachable
//! the moment new data is ingested; invalidation then only reclaims memory.

use std::sync::Arc;

use dashmap::DashMap;

use super::{AssetFilter, AttributionResponse, PeriodSpec};

/// Cache key: one entry per (portfolio, period, filter) at one store version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub portfolio_id: String,
    pub period: PeriodSpec,
    pub filter: AssetFilter,
    pub version: u64,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<QueryKey, Arc<AttributionResponse>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &QueryKey) -> Option<Arc<AttributionResponse>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: QueryKey, response: Arc<AttributionResponse>) {
        self.entries.insert(key, response);
    }

    /// Drops every entry for one portfolio, across all periods and filters.
    pub fn invalidate_portfolio(&self, portfolio_id: &str) {
        self.entries
            .retain(|key, _| key.portfolio_id != portfolio_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
