//! Asset reference entities.

mod assets_model;

pub use assets_model::*;
