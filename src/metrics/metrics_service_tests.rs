use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::mapping::{AssetClass, Region, Sector};
use crate::store::{HoldingRecord, PricePoint};

use super::metrics_model::AlignedSeries;
use super::metrics_service::{
    align_on_union_calendar, allocation_weights, annualized_return, cumulative_return,
    log_return_volatility, max_drawdown, AllocationDimension,
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn point(fund: &str, on: &str, price: Decimal) -> PricePoint {
    PricePoint {
        id: format!("{}-{}", fund, on),
        fund_id: fund.to_string(),
        date: date(on),
        price,
        currency: "AUD".to_string(),
        generation: 0,
        created_at: Utc::now().naive_utc(),
    }
}

fn holding(
    fund: &str,
    as_of: &str,
    class: AssetClass,
    sector: Option<Sector>,
    region: Region,
    weight: Decimal,
) -> HoldingRecord {
    HoldingRecord {
        id: uuid::Uuid::new_v4().to_string(),
        fund_id: fund.to_string(),
        as_of_date: date(as_of),
        row_index: 0,
        asset_class: class,
        sector,
        geography: region,
        weight,
        currency: "AUD".to_string(),
        management_kind: None,
        holding_name: None,
        generation: 0,
        created_at: Utc::now().naive_utc(),
    }
}

fn series_for<'a>(set: &'a [AlignedSeries], fund: &str) -> &'a AlignedSeries {
    set.iter().find(|s| s.fund_id == fund).unwrap()
}

#[test]
fn test_cumulative_return_is_exact() {
    let aligned = align_on_union_calendar(vec![
        point("fund-a", "2024-07-01", dec!(100)),
        point("fund-a", "2024-07-08", dec!(110)),
    ]);
    let series = series_for(&aligned, "fund-a");

    let value =
        cumulative_return(series, date("2024-07-01"), date("2024-07-08"), 7).unwrap();

    assert_eq!(value, dec!(0.10));
}

#[test]
fn test_union_calendar_marks_sparse_fund_stale() {
    // Fund A reports Mon/Wed/Fri, fund B daily.
    let aligned = align_on_union_calendar(vec![
        point("fund-a", "2024-07-01", dec!(1.00)),
        point("fund-a", "2024-07-03", dec!(1.02)),
        point("fund-a", "2024-07-05", dec!(1.04)),
        point("fund-b", "2024-07-01", dec!(2.00)),
        point("fund-b", "2024-07-02", dec!(2.01)),
        point("fund-b", "2024-07-03", dec!(2.02)),
        point("fund-b", "2024-07-04", dec!(2.03)),
        point("fund-b", "2024-07-05", dec!(2.04)),
    ]);

    let fund_a = series_for(&aligned, "fund-a");
    let fund_b = series_for(&aligned, "fund-b");

    // Both series cover the full 5-day union calendar.
    assert_eq!(fund_a.points.len(), 5);
    assert_eq!(fund_b.points.len(), 5);

    // Fund A's Tuesday carries Monday's price, flagged stale.
    let tuesday = &fund_a.points[1];
    assert_eq!(tuesday.date, date("2024-07-02"));
    assert!(tuesday.stale);
    assert_eq!(tuesday.price, dec!(1.00));
    assert_eq!(tuesday.observed_date, date("2024-07-01"));

    assert!(fund_b.points.iter().all(|p| !p.stale));
}

#[test]
fn test_fund_series_starts_at_first_observation() {
    let aligned = align_on_union_calendar(vec![
        point("fund-a", "2024-07-01", dec!(1.00)),
        point("fund-b", "2024-07-03", dec!(2.00)),
        point("fund-a", "2024-07-05", dec!(1.10)),
    ]);

    let fund_b = series_for(&aligned, "fund-b");
    // No leading stale-fill before fund B's first observation.
    assert_eq!(fund_b.points.first().unwrap().date, date("2024-07-03"));
}

#[test]
fn test_stale_endpoint_outside_window_not_computable() {
    let aligned = align_on_union_calendar(vec![
        point("fund-a", "2024-07-01", dec!(1.00)),
        point("fund-a", "2024-07-02", dec!(1.01)),
        // fund-b stops observing early; the union calendar keeps going.
        point("fund-b", "2024-06-01", dec!(2.00)),
        point("fund-b", "2024-06-02", dec!(2.01)),
    ]);
    let fund_b = series_for(&aligned, "fund-b");

    let result = cumulative_return(fund_b, date("2024-06-01"), date("2024-07-02"), 7);

    assert!(result.is_err());
}

#[test]
fn test_endpoint_before_first_observation_not_computable() {
    let aligned = align_on_union_calendar(vec![
        point("fund-a", "2024-07-03", dec!(1.00)),
        point("fund-a", "2024-07-04", dec!(1.01)),
    ]);
    let series = series_for(&aligned, "fund-a");

    let result = cumulative_return(series, date("2024-07-01"), date("2024-07-04"), 7);

    assert!(result.is_err());
}

#[test]
fn test_volatility_not_computable_below_minimum_observations() {
    // 2 observations in a 30-observation window, minimum 10.
    let aligned = align_on_union_calendar(vec![
        point("fund-a", "2024-07-01", dec!(1.00)),
        point("fund-a", "2024-07-02", dec!(1.05)),
    ]);
    let series = series_for(&aligned, "fund-a");

    assert_eq!(log_return_volatility(series, 30, 10), None);
}

#[test]
fn test_volatility_of_constant_series_is_zero() {
    let points: Vec<PricePoint> = (1..=12)
        .map(|day| point("fund-a", &format!("2024-07-{:02}", day), dec!(1.00)))
        .collect();
    let aligned = align_on_union_calendar(points);
    let series = series_for(&aligned, "fund-a");

    let volatility = log_return_volatility(series, 30, 10).unwrap();

    assert_eq!(volatility, Decimal::ZERO);
}

#[test]
fn test_volatility_ignores_stale_filled_points() {
    // Fund A observes twice; fund B's daily calendar pads A with stale
    // fills. Stale points must not enter the volatility window.
    let mut points: Vec<PricePoint> = (1..=12)
        .map(|day| point("fund-b", &format!("2024-07-{:02}", day), dec!(2.00)))
        .collect();
    points.push(point("fund-a", "2024-07-01", dec!(1.00)));
    points.push(point("fund-a", "2024-07-12", dec!(1.10)));

    let aligned = align_on_union_calendar(points);
    let fund_a = series_for(&aligned, "fund-a");

    assert_eq!(fund_a.points.len(), 12);
    assert_eq!(log_return_volatility(fund_a, 30, 10), None);
}

#[test]
fn test_annualized_return_under_a_year_is_unannualized() {
    let start = date("2024-01-01");
    let end = date("2024-06-30");

    assert_eq!(annualized_return(start, end, dec!(0.05)), dec!(0.05));
}

#[test]
fn test_annualized_return_over_two_years() {
    let start = date("2022-07-01");
    let end = date("2024-07-01");

    // 21% over ~2 years annualizes to ~10%.
    let annualized = annualized_return(start, end, dec!(0.21));

    assert!(annualized > dec!(0.095) && annualized < dec!(0.105));
}

#[test]
fn test_max_drawdown() {
    let aligned = align_on_union_calendar(vec![
        point("fund-a", "2024-07-01", dec!(1.00)),
        point("fund-a", "2024-07-02", dec!(1.20)),
        point("fund-a", "2024-07-03", dec!(0.90)),
        point("fund-a", "2024-07-04", dec!(1.10)),
    ]);
    let series = series_for(&aligned, "fund-a");

    let drawdown = max_drawdown(series).unwrap();

    assert_eq!(drawdown, dec!(0.25));
}

#[test]
fn test_allocation_sum_is_order_independent() {
    let rows = vec![
        holding("fund-a", "2024-06-30", AssetClass::Equity, Some(Sector::Financials), Region::Australia, dec!(0.3)),
        holding("fund-a", "2024-06-30", AssetClass::Equity, Some(Sector::Energy), Region::NorthAmerica, dec!(0.25)),
        holding("fund-a", "2024-06-30", AssetClass::Cash, None, Region::Australia, dec!(0.45)),
    ];
    let refs: Vec<&HoldingRecord> = rows.iter().collect();
    let mut reversed: Vec<&HoldingRecord> = rows.iter().collect();
    reversed.reverse();

    let forward = allocation_weights(&refs, AllocationDimension::AssetClass);
    let backward = allocation_weights(&reversed, AllocationDimension::AssetClass);

    assert_eq!(forward, backward);
    assert_eq!(forward.get("EQUITY"), Some(&dec!(0.55)));
    assert_eq!(forward.get("CASH"), Some(&dec!(0.45)));

    let by_sector = allocation_weights(&refs, AllocationDimension::Sector);
    assert_eq!(by_sector.get("UNKNOWN"), Some(&dec!(0.45)));

    let by_region = allocation_weights(&refs, AllocationDimension::Geography);
    assert_eq!(by_region.get("AU"), Some(&dec!(0.75)));
}
