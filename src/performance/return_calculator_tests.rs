use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::errors::{CalculatorError, Error};
use crate::performance::{
    annualized_return, compound, daily_returns, period_return, trailing_returns,
};
use crate::snapshot::DailySnapshot;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn nav_series(navs: &[Decimal]) -> Vec<DailySnapshot> {
    navs.iter()
        .enumerate()
        .map(|(i, nav)| {
            DailySnapshot::new("PF1", date(i as u32 + 1), *nav, Decimal::ZERO, None, "USD")
        })
        .collect()
}

#[test]
fn test_first_day_has_no_return() {
    let snapshots = nav_series(&[dec!(100), dec!(110)]);
    let points: Vec<_> = daily_returns(&snapshots).collect();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].daily_return, None);
    assert_eq!(points[0].cumulative_return, Decimal::ZERO);
}

#[test]
fn test_scenario_a_nav_100_110_99() {
    // NAV [100, 110, 99] -> daily [None, +0.10, -0.10], cumulative -0.01.
    let snapshots = nav_series(&[dec!(100), dec!(110), dec!(99)]);
    let points: Vec<_> = daily_returns(&snapshots).collect();

    assert_eq!(points[0].daily_return, None);
    assert_eq!(points[1].daily_return, Some(dec!(0.10)));
    assert_eq!(points[2].daily_return, Some(dec!(-0.10)));
    assert_eq!(points[2].cumulative_return, dec!(-0.01));

    let total = period_return(&snapshots).unwrap();
    assert_eq!(total, dec!(-0.01));
}

#[test]
fn test_no_flow_compounding_equals_nav_ratio() {
    let navs = [dec!(100), dec!(103.5), dec!(101.2), dec!(108.9), dec!(107)];
    let snapshots = nav_series(&navs);
    let total = period_return(&snapshots).unwrap();
    let expected = navs[4] / navs[0] - Decimal::ONE;
    assert!((total - expected).abs() < dec!(0.0000001));
}

#[test]
fn test_cash_flow_excluded_from_return() {
    // 100 -> 210 with a 100 deposit on day 2: the gain is 10 on a base of
    // 100, not 110%.
    let mut snapshots = nav_series(&[dec!(100), dec!(210)]);
    snapshots[1].net_external_flow = Some(dec!(100));
    let points: Vec<_> = daily_returns(&snapshots).collect();
    assert_eq!(points[1].daily_return, Some(dec!(0.10)));
    assert!(points[1].cash_flow_adjusted);
}

#[test]
fn test_withdrawal_excluded_from_return() {
    // 200 -> 110 with a 100 withdrawal: (110 - (-100)) / 200 - 1 = 0.05.
    let mut snapshots = nav_series(&[dec!(200), dec!(110)]);
    snapshots[1].net_external_flow = Some(dec!(-100));
    let points: Vec<_> = daily_returns(&snapshots).collect();
    assert_eq!(points[1].daily_return, Some(dec!(0.05)));
}

#[test]
fn test_missing_flow_data_flags_point() {
    let snapshots = nav_series(&[dec!(100), dec!(110)]);
    let points: Vec<_> = daily_returns(&snapshots).collect();
    assert!(!points[1].cash_flow_adjusted);
    assert_eq!(points[1].daily_return, Some(dec!(0.10)));
}

#[test]
fn test_period_return_insufficient_data() {
    let snapshots = nav_series(&[dec!(100)]);
    match period_return(&snapshots) {
        Err(Error::Calculation(CalculatorError::InsufficientData { required, actual })) => {
            assert_eq!(required, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("expected InsufficientData, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_empty_series_yields_nothing() {
    let snapshots = nav_series(&[]);
    assert_eq!(daily_returns(&snapshots).count(), 0);
}

#[test]
fn test_compound_matches_manual_product() {
    let daily = [dec!(0.10), dec!(-0.10)];
    assert_eq!(compound(&daily), dec!(-0.01));
}

#[test]
fn test_annualized_return_under_one_year_is_identity() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    assert_eq!(annualized_return(start, end, dec!(0.08)), dec!(0.08));
}

#[test]
fn test_annualized_return_two_years() {
    // 21% over exactly two years annualizes to 10%: 1.1^2 = 1.21.
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let annualized = annualized_return(start, end, dec!(0.21));
    assert!((annualized - dec!(0.1)).abs() < dec!(0.001));
}

#[test]
fn test_annualized_return_caps_total_loss() {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert_eq!(annualized_return(start, end, dec!(-1.0)), dec!(-1.0));
}

#[test]
fn test_trailing_returns_short_series() {
    let snapshots = nav_series(&[dec!(100), dec!(102)]);
    let trailing = trailing_returns(&snapshots);
    assert_eq!(trailing.day_1, Some(dec!(0.02)));
    assert_eq!(trailing.week_1, None);
    assert_eq!(trailing.month_1, None);
}

#[test]
fn test_trailing_returns_full_windows() {
    let navs: Vec<Decimal> = (0..31).map(|i| Decimal::from(100 + i)).collect();
    let snapshots = nav_series(&navs);
    let trailing = trailing_returns(&snapshots);
    assert_eq!(trailing.day_1, Some(dec!(1) / dec!(129)));
    assert_eq!(trailing.week_1, Some(dec!(7) / dec!(123)));
    assert_eq!(trailing.month_1, Some(dec!(30) / dec!(100)));
}
