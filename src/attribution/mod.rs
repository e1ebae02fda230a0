//! Attribution module - decomposition of portfolio TWR into per-asset and
//! per-asset-class contributions.

mod attribution_engine;
mod attribution_model;

pub use attribution_engine::*;
pub use attribution_model::*;
