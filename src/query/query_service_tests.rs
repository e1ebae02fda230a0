use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::assets::{Asset, Region};
use crate::benchmark::{BenchmarkPolicy, BenchmarkPrice, BenchmarkSeries};
use crate::errors::{Error, Result, StoreError};
use crate::query::{
    AssetFilter, PeriodSpec, QueryService, QueryServiceTrait, ResponseSection,
};
use crate::risk::RiskConfig;
use crate::snapshot::{
    DailySnapshot, PortfolioDataset, PositionRecord, SnapshotLoaderTrait, SnapshotStore,
};
use crate::utils::CancellationToken;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
}

fn asset(id: &str, class: &str, region: Region) -> Asset {
    Asset {
        id: id.to_string(),
        ticker: id.to_string(),
        name: format!("{} Inc", id),
        asset_class: class.to_string(),
        region,
        currency: "USD".to_string(),
    }
}

fn position(day: u32, asset_id: &str, quantity: Decimal, price: Decimal) -> PositionRecord {
    PositionRecord {
        portfolio_id: "PF1".to_string(),
        as_of_date: date(day),
        asset_id: asset_id.to_string(),
        quantity,
        average_cost: price,
        market_price: price,
        market_value: quantity * price,
    }
}

/// Two assets over five days, NAV consistent with positions, no cash.
fn sample_dataset() -> PortfolioDataset {
    let assets = vec![
        asset("AAA", "Equity", Region::Domestic),
        asset("BBB", "Bond", Region::Foreign),
    ];
    let prices_a = [dec!(100), dec!(101), dec!(103), dec!(102), dec!(105)];
    let prices_b = [dec!(50), dec!(50.2), dec!(49.9), dec!(50.1), dec!(50.4)];
    let mut positions = Vec::new();
    let mut snapshots = Vec::new();
    for day in 1..=5u32 {
        let pa = prices_a[day as usize - 1];
        let pb = prices_b[day as usize - 1];
        positions.push(position(day, "AAA", dec!(10), pa));
        positions.push(position(day, "BBB", dec!(20), pb));
        let nav = dec!(10) * pa + dec!(20) * pb;
        snapshots.push(DailySnapshot::new("PF1", date(day), nav, Decimal::ZERO, None, "USD"));
    }
    PortfolioDataset::from_rows("PF1", "USD", snapshots, positions, assets)
}

fn benchmark_series() -> BenchmarkSeries {
    BenchmarkSeries::new(
        "SPX",
        "S&P 500",
        "USD",
        (1..=5u32)
            .map(|day| BenchmarkPrice {
                date: date(day),
                close: dec!(5000) + Decimal::from(day * 10),
            })
            .collect(),
    )
}

fn policy() -> BenchmarkPolicy {
    serde_json::from_str(
        r#"{"assignments": [{"currency": "USD", "instruments": ["SPX"]}]}"#,
    )
    .unwrap()
}

fn service() -> QueryService {
    let store = Arc::new(SnapshotStore::new());
    store.ingest_benchmark(benchmark_series());
    let service = QueryService::new(store, policy(), RiskConfig::default());
    service.ingest_portfolio(sample_dataset());
    service
}

#[tokio::test]
async fn test_attribution_response_shape() {
    let service = service();
    let response = service
        .get_attribution(
            "PF1",
            PeriodSpec::AllTime,
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.start_date, date(1));
    assert_eq!(response.end_date, date(5));
    assert_eq!(response.asset_class_contributions.len(), 2);
    assert_eq!(response.benchmarks.len(), 1);
    assert!(response.warnings.is_empty());
    // Benchmark rose 40/5010 from day-1 base; excess is the difference.
    let row = &response.benchmarks[0];
    assert_eq!(row.instrument_id, "SPX");
}

#[tokio::test]
async fn test_attribution_is_cached_per_version() {
    let service = service();
    assert_eq!(service.cache_len(), 0);

    let first = service
        .get_attribution(
            "PF1",
            PeriodSpec::AllTime,
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(service.cache_len(), 1);

    let second = service
        .get_attribution(
            "PF1",
            PeriodSpec::AllTime,
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    // Same Arc - the second call was served from cache.
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_ingestion_invalidates_portfolio_cache() {
    let service = service();
    service
        .get_attribution(
            "PF1",
            PeriodSpec::AllTime,
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(service.cache_len(), 1);

    service.ingest_portfolio(sample_dataset());
    assert_eq!(service.cache_len(), 0);
}

#[tokio::test]
async fn test_trailing_period_resolution() {
    let service = service();
    let response = service
        .get_attribution(
            "PF1",
            PeriodSpec::TrailingDays { days: 2 },
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(response.start_date, date(3));
    assert_eq!(response.end_date, date(5));
}

#[tokio::test]
async fn test_all_time_clamps_to_inception() {
    let service = service();
    let response = service
        .get_attribution(
            "PF1",
            PeriodSpec::Explicit {
                start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end: date(5),
            },
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(response.start_date, date(1));
}

#[tokio::test]
async fn test_missing_benchmark_degrades_to_warning() {
    let store = Arc::new(SnapshotStore::new());
    // No benchmark ingested at all.
    let service = QueryService::new(store, policy(), RiskConfig::default());
    service.ingest_portfolio(sample_dataset());

    let response = service
        .get_attribution(
            "PF1",
            PeriodSpec::AllTime,
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(response.benchmarks.is_empty());
    assert!(response
        .warnings
        .iter()
        .any(|w| w.section == ResponseSection::Benchmark));
}

#[tokio::test]
async fn test_unknown_portfolio_without_loader() {
    let service = service();
    match service
        .get_attribution(
            "NOPE",
            PeriodSpec::AllTime,
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
    {
        Err(Error::Store(StoreError::PortfolioNotFound(id))) => assert_eq!(id, "NOPE"),
        other => panic!("expected PortfolioNotFound, got {:?}", other.map(|_| ())),
    }
}

struct FixtureLoader;

#[async_trait]
impl SnapshotLoaderTrait for FixtureLoader {
    async fn load_portfolio(&self, portfolio_id: &str) -> Result<PortfolioDataset> {
        let mut dataset = sample_dataset();
        dataset.portfolio_id = portfolio_id.to_string();
        Ok(dataset)
    }

    async fn load_benchmark(&self, _instrument_id: &str) -> Result<BenchmarkSeries> {
        Ok(benchmark_series())
    }
}

struct SlowLoader;

#[async_trait]
impl SnapshotLoaderTrait for SlowLoader {
    async fn load_portfolio(&self, _portfolio_id: &str) -> Result<PortfolioDataset> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        unreachable!("the timeout fires first")
    }

    async fn load_benchmark(&self, _instrument_id: &str) -> Result<BenchmarkSeries> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        unreachable!("the timeout fires first")
    }
}

#[tokio::test]
async fn test_loader_timeout_maps_to_data_unavailable() {
    let store = Arc::new(SnapshotStore::new());
    let service = QueryService::new(store, policy(), RiskConfig::default())
        .with_loader(Arc::new(SlowLoader))
        .with_load_timeout(Duration::from_millis(20));

    match service
        .get_attribution(
            "PF9",
            PeriodSpec::AllTime,
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
    {
        Err(Error::Store(StoreError::DataUnavailable { key, .. })) => assert_eq!(key, "PF9"),
        other => panic!("expected DataUnavailable, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_warm_loads_portfolios_concurrently() {
    let store = Arc::new(SnapshotStore::new());
    let service = QueryService::new(store, policy(), RiskConfig::default())
        .with_loader(Arc::new(FixtureLoader));

    let results = service
        .warm(&["PF1".to_string(), "PF2".to_string()])
        .await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_ok()));

    let response = service
        .get_attribution(
            "PF2",
            PeriodSpec::AllTime,
            AssetFilter::All,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(response.portfolio_id, "PF2");
}

#[tokio::test]
async fn test_performance_partial_when_too_short() {
    let store = Arc::new(SnapshotStore::new());
    let service = QueryService::new(store, policy(), RiskConfig::default());
    let dataset = PortfolioDataset::from_rows(
        "PF1",
        "USD",
        vec![DailySnapshot::new(
            "PF1",
            date(1),
            dec!(1000),
            Decimal::ZERO,
            None,
            "USD",
        )],
        Vec::new(),
        Vec::new(),
    );
    service.ingest_portfolio(dataset);

    let response = service
        .get_performance("PF1", PeriodSpec::AllTime)
        .await
        .unwrap();
    assert_eq!(response.cumulative_return, None);
    assert!(response
        .warnings
        .iter()
        .any(|w| w.section == ResponseSection::Returns));
}

#[tokio::test]
async fn test_performance_full_response() {
    let service = service();
    let response = service
        .get_performance("PF1", PeriodSpec::AllTime)
        .await
        .unwrap();

    let expected = (dec!(10) * dec!(105) + dec!(20) * dec!(50.4))
        / (dec!(10) * dec!(100) + dec!(20) * dec!(50))
        - Decimal::ONE;
    let cumulative = response.cumulative_return.unwrap();
    assert!((cumulative - expected).abs() < dec!(0.000001));
    // Under a year: annualized equals the unannualized return.
    assert_eq!(response.annualized_return.unwrap(), cumulative);
    assert_eq!(response.returns.len(), 5);
    assert_eq!(response.benchmarks.len(), 1);
    assert_eq!(response.comparisons.len(), 1);
    assert_eq!(response.comparisons[0].portfolio.len(), 5);
    // Returns were not flow-adjusted (no flow data in the fixture).
    assert!(response
        .warnings
        .iter()
        .any(|w| w.section == ResponseSection::Returns));
}

#[tokio::test]
async fn test_risk_below_floor_is_partial() {
    // Five daily returns against the default floor of 20.
    let service = service();
    let response = service.get_risk("PF1", PeriodSpec::AllTime).await.unwrap();
    assert!(response.metrics.is_none());
    assert_eq!(response.var_95, None);
    assert!(response
        .warnings
        .iter()
        .any(|w| w.section == ResponseSection::Risk));
}

#[tokio::test]
async fn test_risk_with_enough_observations() {
    let store = Arc::new(SnapshotStore::new());
    let service = QueryService::new(store, policy(), RiskConfig::default());

    let mut snapshots = Vec::new();
    let mut nav = dec!(1000);
    for i in 0..30u32 {
        let day = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + chrono::Duration::days(i as i64);
        nav += if i % 2 == 0 { dec!(5) } else { dec!(-3) };
        snapshots.push(DailySnapshot::new("PF1", day, nav, Decimal::ZERO, None, "USD"));
    }
    service.ingest_portfolio(PortfolioDataset::from_rows(
        "PF1",
        "USD",
        snapshots,
        Vec::new(),
        Vec::new(),
    ));

    let response = service.get_risk("PF1", PeriodSpec::AllTime).await.unwrap();
    let metrics = response.metrics.expect("metrics should be available");
    assert!(metrics.volatility > Decimal::ZERO);
    assert!(metrics.sharpe_ratio.is_some());
    assert!(response.var_95.is_some());
    assert!(response.var_99.is_some());
    assert!(response.warnings.is_empty());
}

#[tokio::test]
async fn test_allocation_breakdown() {
    let service = service();
    let response = service.get_allocation("PF1").await.unwrap();

    assert_eq!(response.as_of_date, Some(date(5)));
    assert_eq!(response.classes.len(), 2);
    let total_weight: Decimal = response.classes.iter().map(|c| c.weight).sum();
    assert!((total_weight - Decimal::ONE).abs() < dec!(0.0001));
    // Equity (1050) outweighs Bond (1008) and sorts first.
    assert_eq!(response.classes[0].asset_class, "Equity");
    assert_eq!(response.classes[0].assets[0].asset_id, "AAA");
}

#[tokio::test]
async fn test_asset_detail_through_facade() {
    let service = service();
    let detail = service
        .get_asset_detail("PF1", "AAA", PeriodSpec::AllTime, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(detail.asset_id, "AAA");
    assert_eq!(detail.current_price, dec!(105));
    assert_eq!(detail.price_performance.len(), 5);
}

#[test]
fn test_attribution_batch_parallel() {
    let service = service();
    let requests = vec![
        ("PF1".to_string(), PeriodSpec::AllTime, AssetFilter::All),
        (
            "PF1".to_string(),
            PeriodSpec::TrailingDays { days: 2 },
            AssetFilter::Domestic,
        ),
        ("MISSING".to_string(), PeriodSpec::AllTime, AssetFilter::All),
    ];
    let results = service.get_attribution_batch(&requests, CancellationToken::new());
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].is_err());
}
