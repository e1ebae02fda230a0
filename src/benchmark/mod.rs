//! Benchmark module - index alignment, excess return, and assignment policy.

mod benchmark_comparator;
mod benchmark_model;
mod benchmark_policy;

pub use benchmark_comparator::*;
pub use benchmark_model::*;
pub use benchmark_policy::*;
