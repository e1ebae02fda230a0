//! Core error types for the attribution engine.
//!
//! This module defines storage-agnostic error types. Errors raised by a
//! concrete backing store are converted to these types behind the loader
//! trait seam.

use chrono::{NaiveDate, ParseError as ChronoParseError};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
///
/// Every variant is recoverable by the query facade: an affected response
/// section is omitted or replaced by an explicit "unavailable" marker,
/// never by a fabricated zero.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Snapshot store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Return calculation failed: {0}")]
    Calculation(#[from] CalculatorError),

    #[error("Benchmark comparison failed: {0}")]
    Benchmark(#[from] BenchmarkError),

    #[error("Risk metrics computation failed: {0}")]
    Risk(#[from] RiskError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Computation cancelled by caller")]
    Cancelled,
}

/// Errors raised by the snapshot store and its loader seam.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested portfolio has no data in the store.
    #[error("Portfolio '{0}' not found in snapshot store")]
    PortfolioNotFound(String),

    /// The backing store did not answer within the configured timeout.
    #[error("Backing store did not respond within {timeout_ms}ms while loading '{key}'")]
    DataUnavailable { key: String, timeout_ms: u64 },

    /// The loader failed for a reason other than a timeout.
    #[error("Snapshot load failed: {0}")]
    LoadFailed(String),
}

/// Errors that occur during return calculations.
#[derive(Error, Debug)]
pub enum CalculatorError {
    #[error("Insufficient data: {required} snapshots required, {actual} available")]
    InsufficientData { required: usize, actual: usize },

    #[error("Calculation failed: {0}")]
    Calculation(String),
}

/// Errors that occur during benchmark comparison.
#[derive(Error, Debug)]
pub enum BenchmarkError {
    /// The benchmark series has no points inside the requested window.
    #[error("No benchmark data for instrument '{instrument_id}' between {start} and {end}")]
    NoBenchmarkData {
        instrument_id: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// The assigned instrument is not present in the store.
    #[error("Benchmark instrument '{0}' not found in snapshot store")]
    InstrumentNotFound(String),
}

/// Errors that occur during risk metric computation.
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Insufficient sample: {floor} observations required, {actual} available")]
    InsufficientSample { floor: usize, actual: usize },
}

/// Validation errors for caller input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Start date {start} must not be after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
