//! Query module - the facade consumed by the presentation layer.

mod query_cache;
mod query_model;
mod query_service;

pub use query_cache::*;
pub use query_model::*;
pub use query_service::*;

#[cfg(test)]
mod query_service_tests;
