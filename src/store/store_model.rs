use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::DATE_FORMAT;
use crate::mapping::{AssetClass, CandidateHolding, CandidatePrice, ManagementKind, Region, Sector};

use super::store_errors::{Result, StoreError};

/// Fund scope of a query.
#[derive(Debug, Clone)]
pub enum FundSelector {
    All,
    One(String),
    Many(Vec<String>),
}

impl FundSelector {
    pub fn matches(&self, fund_id: &str) -> bool {
        match self {
            FundSelector::All => true,
            FundSelector::One(id) => id == fund_id,
            FundSelector::Many(ids) => ids.iter().any(|id| id == fund_id),
        }
    }

    pub fn as_ids(&self) -> Option<Vec<String>> {
        match self {
            FundSelector::All => None,
            FundSelector::One(id) => Some(vec![id.clone()]),
            FundSelector::Many(ids) => Some(ids.clone()),
        }
    }
}

/// Inclusive date window; open ends select everything on that side.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// A validated, persisted portfolio holding row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRecord {
    pub id: String,
    pub fund_id: String,
    pub as_of_date: NaiveDate,
    pub row_index: i32,
    pub asset_class: AssetClass,
    pub sector: Option<Sector>,
    pub geography: Region,
    pub weight: Decimal,
    pub currency: String,
    pub management_kind: Option<ManagementKind>,
    pub holding_name: Option<String>,
    pub generation: i64,
    pub created_at: NaiveDateTime,
}

/// Database model for holdings
#[derive(Queryable, Identifiable, Insertable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = crate::schema::holdings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HoldingDB {
    pub id: String,
    pub fund_id: String,
    pub as_of_date: String,
    pub row_index: i32,
    pub asset_class: String,
    pub sector: Option<String>,
    pub geography: String,
    pub weight: String,
    pub currency: String,
    pub management_kind: Option<String>,
    pub holding_name: Option<String>,
    pub generation: i64,
    pub group_digest: String,
    pub created_at: NaiveDateTime,
}

impl HoldingDB {
    pub fn to_domain(&self) -> Result<HoldingRecord> {
        Ok(HoldingRecord {
            id: self.id.clone(),
            fund_id: self.fund_id.clone(),
            as_of_date: parse_stored_date(&self.as_of_date)?,
            row_index: self.row_index,
            asset_class: AssetClass::from_storage(&self.asset_class),
            sector: self.sector.as_deref().map(Sector::from_storage),
            geography: Region::from_storage(&self.geography),
            weight: parse_stored_decimal(&self.weight)?,
            currency: self.currency.clone(),
            management_kind: self.management_kind.as_deref().map(ManagementKind::from_storage),
            holding_name: self.holding_name.clone(),
            generation: self.generation,
            created_at: self.created_at,
        })
    }

    pub fn from_candidate(
        candidate: &CandidateHolding,
        row_index: i32,
        generation: i64,
        group_digest: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fund_id: candidate.fund_id.clone(),
            as_of_date: candidate.as_of_date.format(DATE_FORMAT).to_string(),
            row_index,
            asset_class: candidate.asset_class.as_str().to_string(),
            sector: candidate.sector.map(|s| s.as_str().to_string()),
            geography: candidate.geography.as_str().to_string(),
            weight: candidate.weight.to_string(),
            currency: candidate.currency.clone(),
            management_kind: candidate.management_kind.map(|m| m.as_str().to_string()),
            holding_name: candidate.holding_name.clone(),
            generation,
            group_digest: group_digest.to_string(),
            created_at: Utc::now().naive_utc(),
        }
    }
}

/// A validated, persisted unit price observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub id: String,
    pub fund_id: String,
    pub date: NaiveDate,
    pub price: Decimal,
    pub currency: String,
    pub generation: i64,
    pub created_at: NaiveDateTime,
}

/// Database model for unit prices
#[derive(Queryable, Identifiable, Insertable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = crate::schema::unit_prices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PricePointDB {
    pub id: String,
    pub fund_id: String,
    pub date: String,
    pub price: String,
    pub currency: String,
    pub generation: i64,
    pub created_at: NaiveDateTime,
}

impl PricePointDB {
    pub fn to_domain(&self) -> Result<PricePoint> {
        Ok(PricePoint {
            id: self.id.clone(),
            fund_id: self.fund_id.clone(),
            date: parse_stored_date(&self.date)?,
            price: parse_stored_decimal(&self.price)?,
            currency: self.currency.clone(),
            generation: self.generation,
            created_at: self.created_at,
        })
    }

    pub fn from_candidate(candidate: &CandidatePrice, generation: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fund_id: candidate.fund_id.clone(),
            date: candidate.date.format(DATE_FORMAT).to_string(),
            price: candidate.price.to_string(),
            currency: candidate.currency.clone(),
            generation,
            created_at: Utc::now().naive_utc(),
        }
    }
}

/// An audit-log entry for a quarantined record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineEntry {
    pub id: String,
    pub fund_id: String,
    pub as_of_date: Option<NaiveDate>,
    /// The original raw record, JSON-serialized.
    pub raw_record: String,
    pub check_name: String,
    pub reason: String,
    pub created_at: NaiveDateTime,
}

/// Database model for quarantine entries
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::quarantine_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuarantineEntryDB {
    pub id: String,
    pub fund_id: String,
    pub as_of_date: Option<String>,
    pub raw_record: String,
    pub check_name: String,
    pub reason: String,
    pub created_at: NaiveDateTime,
}

/// Input model for appending to the quarantine log
#[derive(Debug, Clone)]
pub struct NewQuarantineEntry {
    pub fund_id: String,
    pub as_of_date: Option<NaiveDate>,
    pub raw_record: String,
    pub check_name: String,
    pub reason: String,
}

impl QuarantineEntryDB {
    pub fn to_domain(&self) -> Result<QuarantineEntry> {
        let as_of_date = match &self.as_of_date {
            Some(raw) => Some(parse_stored_date(raw)?),
            None => None,
        };
        Ok(QuarantineEntry {
            id: self.id.clone(),
            fund_id: self.fund_id.clone(),
            as_of_date,
            raw_record: self.raw_record.clone(),
            check_name: self.check_name.clone(),
            reason: self.reason.clone(),
            created_at: self.created_at,
        })
    }

    pub fn from_new(new: NewQuarantineEntry) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fund_id: new.fund_id,
            as_of_date: new.as_of_date.map(|d| d.format(DATE_FORMAT).to_string()),
            raw_record: new.raw_record,
            check_name: new.check_name,
            reason: new.reason,
            created_at: Utc::now().naive_utc(),
        }
    }
}

/// Outcome of a holdings group append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupAppendOutcome {
    Inserted { generation: i64, rows: usize },
    /// The identical group is already stored; the append was an idempotent
    /// no-op.
    AlreadyPresent,
}

/// Outcome of a price-batch append.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceAppendOutcome {
    pub inserted: usize,
    pub already_present: usize,
}

pub(crate) fn parse_stored_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| StoreError::InvalidData(format!("stored date '{}' is not a date", raw)))
}

pub(crate) fn parse_stored_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|_| StoreError::InvalidData(format!("stored value '{}' is not a decimal", raw)))
}

/// Content digest of a holdings group, used for idempotent re-appends.
/// Field order is fixed so the digest is stable across runs.
pub fn holdings_group_digest(rows: &[CandidateHolding]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for row in rows {
        hasher.update(row.fund_id.as_bytes());
        hasher.update(row.as_of_date.format(DATE_FORMAT).to_string().as_bytes());
        hasher.update(row.asset_class.as_str().as_bytes());
        hasher.update(row.sector.map(|s| s.as_str()).unwrap_or("-").as_bytes());
        hasher.update(row.geography.as_str().as_bytes());
        hasher.update(row.weight.normalize().to_string().as_bytes());
        hasher.update(row.currency.as_bytes());
        hasher.update(
            row.management_kind
                .map(|m| m.as_str())
                .unwrap_or("-")
                .as_bytes(),
        );
        hasher.update(row.holding_name.as_deref().unwrap_or("-").as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
