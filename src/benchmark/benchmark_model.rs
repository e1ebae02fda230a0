use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One closing level of a benchmark instrument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkPrice {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Full price history of one benchmark instrument (index, FX rate, rate
/// series). Independent of any portfolio; multi-currency comparison takes
/// pre-converted series in - the engine never converts currency itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkSeries {
    pub instrument_id: String,
    pub name: String,
    pub currency: String,
    /// Closing levels, sorted strictly by ascending date.
    pub prices: Vec<BenchmarkPrice>,
}

impl BenchmarkSeries {
    pub fn new(instrument_id: &str, name: &str, currency: &str, mut prices: Vec<BenchmarkPrice>) -> Self {
        prices.sort_by_key(|p| p.date);
        prices.dedup_by_key(|p| p.date);
        Self {
            instrument_id: instrument_id.to_string(),
            name: name.to_string(),
            currency: currency.to_string(),
            prices,
        }
    }

    /// Last known close on or before `date` (no look-ahead).
    pub fn close_on_or_before(&self, date: NaiveDate) -> Option<Decimal> {
        let idx = self.prices.partition_point(|p| p.date <= date);
        if idx == 0 {
            None
        } else {
            Some(self.prices[idx - 1].close)
        }
    }

    /// Prices with dates inside `[start, end]`.
    pub fn prices_between(&self, start: NaiveDate, end: NaiveDate) -> &[BenchmarkPrice] {
        let from = self.prices.partition_point(|p| p.date < start);
        let to = self.prices.partition_point(|p| p.date <= end);
        &self.prices[from..to]
    }
}

/// One benchmark row of a performance/attribution response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReturn {
    pub instrument_id: String,
    pub name: String,
    /// Benchmark cumulative return over the period, as a decimal fraction.
    pub return_pct: Decimal,
    /// Portfolio return minus benchmark return (simple difference).
    pub excess_return: Decimal,
}

/// One point of an indexed (rebased-to-100) comparison series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexedPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Portfolio-vs-benchmark chart data: both legs rebased to 100 at the first
/// common date, restricted to the common date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkComparisonSeries {
    pub instrument_id: String,
    pub name: String,
    pub portfolio: Vec<IndexedPoint>,
    pub benchmark: Vec<IndexedPoint>,
}
