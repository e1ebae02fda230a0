//! Risk module - volatility, Sharpe ratio, max drawdown, and historical VaR.

mod risk_calculator;
mod risk_model;

pub use risk_calculator::*;
pub use risk_model::*;
