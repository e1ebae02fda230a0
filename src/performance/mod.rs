//! Performance module - daily, period, and annualized return calculation.

mod performance_model;
mod return_calculator;

pub use performance_model::*;
pub use return_calculator::*;

#[cfg(test)]
mod return_calculator_tests;
