use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::mapping::{AssetClass, CandidateHolding, CandidatePrice, Region};
use crate::store::{
    holdings_group_digest, CanonicalStoreTrait, DateRange, FundSelector, GroupAppendOutcome,
    HoldingRecord, NewQuarantineEntry, PriceAppendOutcome, PricePoint, QuarantineEntry,
    Result as StoreResult, StoreError,
};

use super::validation_model::{ValidationConfig, ValidationReport};
use super::validation_service::{ValidationService, ValidationServiceTrait};

/// In-memory canonical store with the same append semantics as the SQLite
/// repository.
#[derive(Default)]
struct MemoryStore {
    holdings: Mutex<Vec<(String, NaiveDate, i64, String, Vec<CandidateHolding>)>>,
    prices: Mutex<Vec<PricePoint>>,
    quarantine: Mutex<Vec<NewQuarantineEntry>>,
}

impl MemoryStore {
    fn quarantine_checks(&self) -> Vec<String> {
        self.quarantine
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.check_name.clone())
            .collect()
    }

    fn price_point(point: &CandidatePrice, generation: i64) -> PricePoint {
        PricePoint {
            id: format!("p-{}-{}", point.fund_id, point.date),
            fund_id: point.fund_id.clone(),
            date: point.date,
            price: point.price,
            currency: point.currency.clone(),
            generation,
            created_at: Utc::now().naive_utc(),
        }
    }
}

impl CanonicalStoreTrait for MemoryStore {
    fn append_holdings_group(
        &self,
        rows: &[CandidateHolding],
        supersede: bool,
    ) -> StoreResult<GroupAppendOutcome> {
        let first = rows.first().expect("non-empty group");
        let digest = holdings_group_digest(rows);
        let mut groups = self.holdings.lock().unwrap();

        let latest = groups
            .iter()
            .filter(|(f, d, ..)| *f == first.fund_id && *d == first.as_of_date)
            .max_by_key(|(_, _, g, ..)| *g);

        let generation = match latest {
            Some((_, _, _, stored_digest, _)) if *stored_digest == digest => {
                return Ok(GroupAppendOutcome::AlreadyPresent);
            }
            Some((_, _, g, ..)) if supersede => g + 1,
            Some((f, d, ..)) => {
                return Err(StoreError::DuplicateKey {
                    kind: "holdings",
                    fund_id: f.clone(),
                    date: d.to_string(),
                })
            }
            None => 0,
        };

        groups.push((
            first.fund_id.clone(),
            first.as_of_date,
            generation,
            digest,
            rows.to_vec(),
        ));
        Ok(GroupAppendOutcome::Inserted {
            generation,
            rows: rows.len(),
        })
    }

    fn append_prices(
        &self,
        points: &[CandidatePrice],
        supersede: bool,
    ) -> StoreResult<PriceAppendOutcome> {
        let mut stored = self.prices.lock().unwrap();
        let mut outcome = PriceAppendOutcome::default();

        for point in points {
            let latest = stored
                .iter()
                .filter(|p| p.fund_id == point.fund_id && p.date == point.date)
                .max_by_key(|p| p.generation)
                .cloned();

            let generation = match latest {
                Some(ref existing)
                    if existing.price == point.price && existing.currency == point.currency =>
                {
                    outcome.already_present += 1;
                    continue;
                }
                Some(ref existing) if supersede => existing.generation + 1,
                Some(_) => {
                    return Err(StoreError::DuplicateKey {
                        kind: "unit_prices",
                        fund_id: point.fund_id.clone(),
                        date: point.date.to_string(),
                    })
                }
                None => 0,
            };

            stored.push(Self::price_point(point, generation));
            outcome.inserted += 1;
        }
        Ok(outcome)
    }

    fn latest_price_date(&self, fund_id: &str) -> StoreResult<Option<NaiveDate>> {
        Ok(self
            .prices
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.fund_id == fund_id)
            .map(|p| p.date)
            .max())
    }

    fn get_price(&self, fund_id: &str, date: NaiveDate) -> StoreResult<Option<PricePoint>> {
        Ok(self
            .prices
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.fund_id == fund_id && p.date == date)
            .max_by_key(|p| p.generation)
            .cloned())
    }

    fn append_quarantine(&self, entries: Vec<NewQuarantineEntry>) -> StoreResult<usize> {
        let count = entries.len();
        self.quarantine.lock().unwrap().extend(entries);
        Ok(count)
    }

    fn get_holdings_page(
        &self,
        _selector: &FundSelector,
        _range: &DateRange,
        _limit: i64,
        _offset: i64,
    ) -> StoreResult<Vec<HoldingRecord>> {
        unimplemented!("not exercised by validation tests")
    }

    fn get_prices_page(
        &self,
        _selector: &FundSelector,
        _range: &DateRange,
        _limit: i64,
        _offset: i64,
    ) -> StoreResult<Vec<PricePoint>> {
        unimplemented!("not exercised by validation tests")
    }

    fn get_holding_generations(
        &self,
        _fund_id: &str,
        _as_of_date: NaiveDate,
    ) -> StoreResult<Vec<HoldingRecord>> {
        unimplemented!("not exercised by validation tests")
    }

    fn get_price_generations(
        &self,
        _fund_id: &str,
        _date: NaiveDate,
    ) -> StoreResult<Vec<PricePoint>> {
        unimplemented!("not exercised by validation tests")
    }

    fn list_quarantine(
        &self,
        _selector: &FundSelector,
        _range: &DateRange,
    ) -> StoreResult<Vec<QuarantineEntry>> {
        unimplemented!("not exercised by validation tests")
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn holding(fund: &str, as_of: &str, weight: Decimal) -> CandidateHolding {
    CandidateHolding {
        fund_id: fund.to_string(),
        as_of_date: date(as_of),
        asset_class: AssetClass::Equity,
        sector: None,
        geography: Region::Australia,
        weight,
        currency: "AUD".to_string(),
        management_kind: None,
        holding_name: None,
        line_number: 1,
    }
}

fn price(fund: &str, on: &str, value: Decimal) -> CandidatePrice {
    CandidatePrice {
        fund_id: fund.to_string(),
        date: date(on),
        price: value,
        currency: "AUD".to_string(),
        line_number: 1,
    }
}

fn tolerant_config(tolerance: Decimal) -> ValidationConfig {
    ValidationConfig {
        weight_sum_tolerance: tolerance,
        ..Default::default()
    }
}

fn run_holdings(
    service: &ValidationService,
    rows: Vec<CandidateHolding>,
    config: &ValidationConfig,
) -> ValidationReport {
    let fund = rows[0].fund_id.clone();
    let mut report = service.submit_holdings(rows, config).unwrap();
    let close_report = service.close_groups(&fund, config).unwrap();
    report.merge(&close_report);
    report
}

#[test]
fn test_group_within_tolerance_accepted() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());
    let config = tolerant_config(dec!(0.01));

    // 0.5 + 0.3 + 0.19 = 0.99, within 1% of 1.0
    let rows = vec![
        holding("fund-a", "2024-06-30", dec!(0.5)),
        holding("fund-a", "2024-06-30", dec!(0.3)),
        holding("fund-a", "2024-06-30", dec!(0.19)),
    ];

    let report = run_holdings(&service, rows, &config);

    assert_eq!(report.accepted, 3);
    assert_eq!(report.quarantined, 0);
}

#[test]
fn test_group_outside_tolerance_quarantined_whole() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());
    let config = tolerant_config(dec!(0.01));

    // Sums to 0.9: every row is individually in range, the group fails.
    let rows = vec![
        holding("fund-a", "2024-06-30", dec!(0.5)),
        holding("fund-a", "2024-06-30", dec!(0.3)),
        holding("fund-a", "2024-06-30", dec!(0.1)),
    ];

    let report = run_holdings(&service, rows, &config);

    assert_eq!(report.accepted, 0);
    assert_eq!(report.quarantined, 3);
    assert!(store
        .quarantine_checks()
        .iter()
        .all(|check| check == "weight-sum"));
}

#[test]
fn test_out_of_range_weight_quarantined_before_group_check() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());
    let config = tolerant_config(dec!(0.01));

    let rows = vec![
        holding("fund-a", "2024-06-30", dec!(1.2)),
        holding("fund-a", "2024-06-30", dec!(-0.2)),
    ];

    let report = service.submit_holdings(rows, &config).unwrap();

    assert_eq!(report.quarantined, 2);
    assert!(store.quarantine_checks().iter().all(|check| check == "range"));
}

#[test]
fn test_revalidating_accepted_group_is_a_noop() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());
    let config = tolerant_config(dec!(0.01));

    let rows = vec![
        holding("fund-a", "2024-06-30", dec!(0.6)),
        holding("fund-a", "2024-06-30", dec!(0.4)),
    ];

    let first = run_holdings(&service, rows.clone(), &config);
    let second = run_holdings(&service, rows, &config);

    assert_eq!(first.accepted, 2);
    assert_eq!(second.accepted, 0);
    assert_eq!(second.already_present, 2);
    assert_eq!(second.quarantined, 0);
}

#[test]
fn test_conflicting_group_rejected_as_duplicate() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());
    let config = tolerant_config(dec!(0.01));

    let first = vec![
        holding("fund-a", "2024-06-30", dec!(0.6)),
        holding("fund-a", "2024-06-30", dec!(0.4)),
    ];
    let changed = vec![
        holding("fund-a", "2024-06-30", dec!(0.7)),
        holding("fund-a", "2024-06-30", dec!(0.3)),
    ];

    run_holdings(&service, first, &config);
    let report = run_holdings(&service, changed, &config);

    assert_eq!(report.accepted, 0);
    assert_eq!(report.duplicates, 2);
    assert!(store
        .quarantine_checks()
        .iter()
        .any(|check| check == "duplicate-key"));
}

#[test]
fn test_supersede_writes_new_generation() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());
    let config = tolerant_config(dec!(0.01));

    let first = vec![
        holding("fund-a", "2024-06-30", dec!(0.6)),
        holding("fund-a", "2024-06-30", dec!(0.4)),
    ];
    let correction = vec![
        holding("fund-a", "2024-06-30", dec!(0.7)),
        holding("fund-a", "2024-06-30", dec!(0.3)),
    ];

    run_holdings(&service, first, &config);
    let supersede_config = ValidationConfig {
        supersede: true,
        ..tolerant_config(dec!(0.01))
    };
    let report = run_holdings(&service, correction, &supersede_config);

    assert_eq!(report.accepted, 2);
    assert_eq!(report.duplicates, 0);
    let groups = store.holdings.lock().unwrap();
    assert!(groups.iter().any(|(_, _, generation, ..)| *generation == 1));
}

#[test]
fn test_price_monotonic_date_enforced() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());
    let config = ValidationConfig::default();

    service
        .validate_prices(vec![price("fund-a", "2024-07-02", dec!(1.50))], &config)
        .unwrap();

    let report = service
        .validate_prices(vec![price("fund-a", "2024-07-01", dec!(1.49))], &config)
        .unwrap();

    assert_eq!(report.accepted, 0);
    assert_eq!(report.quarantined, 1);
    assert!(store
        .quarantine_checks()
        .iter()
        .any(|check| check == "monotonic-date"));
}

#[test]
fn test_backfill_bypasses_monotonic_check() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());

    service
        .validate_prices(
            vec![price("fund-a", "2024-07-02", dec!(1.50))],
            &ValidationConfig::default(),
        )
        .unwrap();

    let backfill = ValidationConfig {
        backfill: true,
        ..Default::default()
    };
    let report = service
        .validate_prices(vec![price("fund-a", "2024-07-01", dec!(1.49))], &backfill)
        .unwrap();

    assert_eq!(report.accepted, 1);
    assert_eq!(report.quarantined, 0);
}

#[test]
fn test_revalidating_prices_is_a_noop() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());
    let config = ValidationConfig::default();

    let points = vec![
        price("fund-a", "2024-07-01", dec!(1.48)),
        price("fund-a", "2024-07-02", dec!(1.50)),
    ];

    let first = service.validate_prices(points.clone(), &config).unwrap();
    let second = service.validate_prices(points, &config).unwrap();

    assert_eq!(first.accepted, 2);
    assert_eq!(second.accepted, 0);
    assert_eq!(second.already_present, 2);
    assert_eq!(second.quarantined, 0);
}

#[test]
fn test_nonpositive_price_quarantined() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());

    let report = service
        .validate_prices(
            vec![price("fund-a", "2024-07-01", dec!(0))],
            &ValidationConfig::default(),
        )
        .unwrap();

    assert_eq!(report.quarantined, 1);
    assert!(store.quarantine_checks().iter().all(|check| check == "range"));
}

#[test]
fn test_unclosed_group_times_out_to_quarantine() {
    let store = Arc::new(MemoryStore::default());
    let service = ValidationService::new(store.clone());
    let config = ValidationConfig {
        group_timeout: Duration::from_secs(0),
        ..Default::default()
    };

    service
        .submit_holdings(vec![holding("fund-a", "2024-06-30", dec!(0.5))], &config)
        .unwrap();

    let report = service.close_expired_groups(&config).unwrap();

    assert_eq!(report.quarantined, 1);
    assert!(store
        .quarantine_checks()
        .iter()
        .all(|check| check == "group-timeout"));
}

#[test]
fn test_weight_tolerance_parses_from_default() {
    let config = ValidationConfig::default();
    assert_eq!(
        config.weight_sum_tolerance,
        Decimal::from_str("0.005").unwrap()
    );
}
