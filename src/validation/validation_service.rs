use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::mapping::{CandidateHolding, CandidatePrice, MappingReject};
use crate::store::{CanonicalStoreTrait, GroupAppendOutcome, NewQuarantineEntry};
use crate::store::Result as StoreResult;

use super::validation_errors::ValidationError;
use super::validation_model::{BufferedGroup, GroupKey, ValidationConfig, ValidationReport};


/// Trait defining the contract for validation operations.
pub trait ValidationServiceTrait: Send + Sync {
    /// Runs per-record checks on holding candidates and buffers the
    /// survivors under their (fund, as-of date) group. Failures are
    /// quarantined immediately; the weight-sum check waits for group
    /// closure.
    fn submit_holdings(
        &self,
        candidates: Vec<CandidateHolding>,
        config: &ValidationConfig,
    ) -> StoreResult<ValidationReport>;

    /// Closes every buffered group for a fund (end-of-artifact signal), runs
    /// the weight-sum check, and commits passing groups to the canonical
    /// store.
    fn close_groups(
        &self,
        fund_id: &str,
        config: &ValidationConfig,
    ) -> StoreResult<ValidationReport>;

    /// Validates and commits unit-price candidates.
    fn validate_prices(
        &self,
        candidates: Vec<CandidatePrice>,
        config: &ValidationConfig,
    ) -> StoreResult<ValidationReport>;

    /// Quarantines groups held open longer than the configured timeout, so
    /// a producer that never closes a group cannot block indefinitely.
    fn close_expired_groups(&self, config: &ValidationConfig) -> StoreResult<ValidationReport>;

    /// Quarantines records the mapper could not shape.
    fn quarantine_mapping_rejects(
        &self,
        fund_id: &str,
        rejects: Vec<MappingReject>,
    ) -> StoreResult<usize>;
}

/// Validator with the group buffer for the cross-record weight-sum check.
/// Runs for different funds touch disjoint keys, so the buffer is shared
/// safely across concurrent per-fund runs.
pub struct ValidationService {
    store: Arc<dyn CanonicalStoreTrait>,
    groups: DashMap<GroupKey, BufferedGroup>,
}

impl ValidationService {
    pub fn new(store: Arc<dyn CanonicalStoreTrait>) -> Self {
        Self {
            store,
            groups: DashMap::new(),
        }
    }

    /// Ordered per-record checks; first failure wins.
    fn check_holding(candidate: &CandidateHolding) -> Result<(), ValidationError> {
        if candidate.currency.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "currency".to_string(),
            });
        }

        if candidate.weight < Decimal::ZERO || candidate.weight > Decimal::ONE {
            return Err(ValidationError::Range {
                field: "weight".to_string(),
                value: candidate.weight.to_string(),
                constraint: "[0, 1]".to_string(),
            });
        }

        check_date_sanity("asOfDate", candidate.as_of_date)?;
        Ok(())
    }

    fn check_price(candidate: &CandidatePrice) -> Result<(), ValidationError> {
        if candidate.currency.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "currency".to_string(),
            });
        }

        if candidate.price <= Decimal::ZERO {
            return Err(ValidationError::Range {
                field: "price".to_string(),
                value: candidate.price.to_string(),
                constraint: "positive".to_string(),
            });
        }

        check_date_sanity("date", candidate.date)?;
        Ok(())
    }

    fn quarantine_holdings(
        &self,
        rows: &[CandidateHolding],
        error: &ValidationError,
    ) -> StoreResult<usize> {
        let entries = rows
            .iter()
            .map(|row| NewQuarantineEntry {
                fund_id: row.fund_id.clone(),
                as_of_date: Some(row.as_of_date),
                raw_record: serde_json::to_string(row).unwrap_or_default(),
                check_name: error.check_name().to_string(),
                reason: error.to_string(),
            })
            .collect();
        self.store.append_quarantine(entries)
    }

    fn quarantine_price(
        &self,
        point: &CandidatePrice,
        error: &ValidationError,
    ) -> StoreResult<usize> {
        self.store.append_quarantine(vec![NewQuarantineEntry {
            fund_id: point.fund_id.clone(),
            as_of_date: Some(point.date),
            raw_record: serde_json::to_string(point).unwrap_or_default(),
            check_name: error.check_name().to_string(),
            reason: error.to_string(),
        }])
    }

    /// Weight-sum check and commit for one closed group.
    fn settle_group(
        &self,
        rows: Vec<CandidateHolding>,
        config: &ValidationConfig,
        report: &mut ValidationReport,
    ) -> StoreResult<()> {
        let (fund_id, as_of_date) = match rows.first() {
            Some(first) => (first.fund_id.clone(), first.as_of_date),
            None => return Ok(()),
        };

        let sum: Decimal = rows.iter().map(|r| r.weight).sum();
        let deviation = (sum - Decimal::ONE).abs();

        if deviation > config.weight_sum_tolerance {
            let error = ValidationError::WeightSum {
                fund_id: fund_id.clone(),
                as_of_date,
                sum,
                tolerance: config.weight_sum_tolerance,
            };
            warn!("Quarantining group: {}", error);
            report.quarantined += self.quarantine_holdings(&rows, &error)?;
            return Ok(());
        }

        match self.store.append_holdings_group(&rows, config.supersede) {
            Ok(GroupAppendOutcome::Inserted { rows: count, .. }) => {
                report.accepted += count;
            }
            Ok(GroupAppendOutcome::AlreadyPresent) => {
                report.already_present += rows.len();
            }
            Err(crate::store::StoreError::DuplicateKey { .. }) => {
                let error = ValidationError::DuplicateKey {
                    fund_id: fund_id.clone(),
                    date: as_of_date,
                };
                warn!("Rejecting group: {}", error);
                report.duplicates += rows.len();
                report.quarantined += self.quarantine_holdings(&rows, &error)?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

impl ValidationServiceTrait for ValidationService {
    fn submit_holdings(
        &self,
        candidates: Vec<CandidateHolding>,
        _config: &ValidationConfig,
    ) -> StoreResult<ValidationReport> {
        let mut report = ValidationReport::default();

        for candidate in candidates {
            match Self::check_holding(&candidate) {
                Ok(()) => {
                    let key = (candidate.fund_id.clone(), candidate.as_of_date);
                    self.groups
                        .entry(key)
                        .or_insert_with(BufferedGroup::new)
                        .rows
                        .push(candidate);
                }
                Err(error) => {
                    report.quarantined +=
                        self.quarantine_holdings(std::slice::from_ref(&candidate), &error)?;
                }
            }
        }

        Ok(report)
    }

    fn close_groups(
        &self,
        fund_id: &str,
        config: &ValidationConfig,
    ) -> StoreResult<ValidationReport> {
        let keys: Vec<GroupKey> = self
            .groups
            .iter()
            .filter(|entry| entry.key().0 == fund_id)
            .map(|entry| entry.key().clone())
            .collect();

        let mut report = ValidationReport::default();
        for key in keys {
            if let Some((_, group)) = self.groups.remove(&key) {
                debug!(
                    "Closing group fund '{}' as-of {} ({} rows)",
                    key.0,
                    key.1,
                    group.rows.len()
                );
                self.settle_group(group.rows, config, &mut report)?;
            }
        }

        Ok(report)
    }

    fn validate_prices(
        &self,
        mut candidates: Vec<CandidatePrice>,
        config: &ValidationConfig,
    ) -> StoreResult<ValidationReport> {
        let mut report = ValidationReport::default();
        candidates.sort_by_key(|p| p.date);

        let mut latest_by_fund: std::collections::HashMap<String, Option<NaiveDate>> =
            std::collections::HashMap::new();

        for point in candidates {
            if let Err(error) = Self::check_price(&point) {
                report.quarantined += self.quarantine_price(&point, &error)?;
                continue;
            }

            // Idempotent re-submission: an identical stored point is a
            // no-op and skips the monotonic check entirely.
            if let Some(stored) = self.store.get_price(&point.fund_id, point.date)? {
                if stored.price == point.price && stored.currency == point.currency {
                    report.already_present += 1;
                    continue;
                }
                if config.supersede {
                    let outcome = self.store.append_prices(std::slice::from_ref(&point), true)?;
                    report.accepted += outcome.inserted;
                    continue;
                }
                let error = ValidationError::DuplicateKey {
                    fund_id: point.fund_id.clone(),
                    date: point.date,
                };
                report.duplicates += 1;
                report.quarantined += self.quarantine_price(&point, &error)?;
                continue;
            }

            if !config.backfill {
                let latest = match latest_by_fund.get(&point.fund_id) {
                    Some(cached) => *cached,
                    None => {
                        let fetched = self.store.latest_price_date(&point.fund_id)?;
                        latest_by_fund.insert(point.fund_id.clone(), fetched);
                        fetched
                    }
                };
                if let Some(latest) = latest {
                    if point.date <= latest {
                        let error = ValidationError::OutOfOrder {
                            fund_id: point.fund_id.clone(),
                            date: point.date,
                            latest,
                        };
                        report.quarantined += self.quarantine_price(&point, &error)?;
                        continue;
                    }
                }
            }

            match self.store.append_prices(std::slice::from_ref(&point), false) {
                Ok(outcome) => {
                    report.accepted += outcome.inserted;
                    report.already_present += outcome.already_present;
                    latest_by_fund
                        .entry(point.fund_id.clone())
                        .and_modify(|latest| {
                            *latest = Some(latest.map_or(point.date, |l| l.max(point.date)))
                        })
                        .or_insert(Some(point.date));
                }
                Err(crate::store::StoreError::DuplicateKey { .. }) => {
                    let error = ValidationError::DuplicateKey {
                        fund_id: point.fund_id.clone(),
                        date: point.date,
                    };
                    report.duplicates += 1;
                    report.quarantined += self.quarantine_price(&point, &error)?;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    fn close_expired_groups(&self, config: &ValidationConfig) -> StoreResult<ValidationReport> {
        let expired: Vec<GroupKey> = self
            .groups
            .iter()
            .filter(|entry| entry.value().opened_at.elapsed() >= config.group_timeout)
            .map(|entry| entry.key().clone())
            .collect();

        let mut report = ValidationReport::default();
        for key in expired {
            if let Some((_, group)) = self.groups.remove(&key) {
                let error = ValidationError::IncompleteGroup {
                    fund_id: key.0.clone(),
                    as_of_date: key.1,
                };
                warn!("Quarantining timed-out group: {}", error);
                report.quarantined += self.quarantine_holdings(&group.rows, &error)?;
            }
        }

        Ok(report)
    }

    fn quarantine_mapping_rejects(
        &self,
        fund_id: &str,
        rejects: Vec<MappingReject>,
    ) -> StoreResult<usize> {
        if rejects.is_empty() {
            return Ok(0);
        }

        let entries = rejects
            .into_iter()
            .map(|reject| NewQuarantineEntry {
                fund_id: fund_id.to_string(),
                as_of_date: None,
                raw_record: serde_json::to_string(&reject.raw).unwrap_or_default(),
                check_name: "mapping".to_string(),
                reason: reject.reason.to_string(),
            })
            .collect();

        self.store.append_quarantine(entries)
    }
}

/// Date sanity: disclosures are historical, so anything before the scheme
/// era or after today is treated as out of range.
fn check_date_sanity(field: &str, date: NaiveDate) -> Result<(), ValidationError> {
    let min = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default();
    let today = Utc::now().date_naive();

    if date < min || date > today {
        return Err(ValidationError::Range {
            field: field.to_string(),
            value: date.to_string(),
            constraint: format!("dates within {} ..= {}", min, today),
        });
    }
    Ok(())
}
