use chrono::NaiveDate;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use crate::adapters::{RawRecord, SourceFormat};
use crate::mapping::mapping_constants::*;
use crate::mapping::vocabulary::Vocabulary;
use crate::mapping::{MappingError, Result};

use super::mapping_model::{
    lookup, CandidateHolding, CandidatePrice, FieldMapping, FieldMappingRules, MappedBatch,
    MappingReject, NewFieldMapping, WeightUnit,
};
use super::mapping_repository::MappingRepository;

/// Trait defining the contract for schema-mapping operations.
pub trait MappingServiceTrait: Send + Sync {
    fn register_mapping(&self, new_mapping: NewFieldMapping) -> Result<FieldMapping>;
    fn get_mapping_version(
        &self,
        fund_id: &str,
        source_format: &str,
        version: i32,
    ) -> Result<FieldMapping>;
    fn list_mapping_versions(&self, fund_id: &str, source_format: &str)
        -> Result<Vec<FieldMapping>>;

    /// Maps intermediate records onto the canonical schema. `mappings` must
    /// be ordered newest-first (as the repository returns them); a
    /// single-element slice pins that version unconditionally.
    fn map_records(
        &self,
        fund_id: &str,
        format: SourceFormat,
        records: Vec<RawRecord>,
        mappings: &[FieldMapping],
    ) -> MappedBatch;
}

/// Service applying versioned field mappings to intermediate records
pub struct MappingService {
    repository: MappingRepository,
}

impl MappingService {
    pub fn new(pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>) -> Self {
        Self {
            repository: MappingRepository::new(pool),
        }
    }

    pub fn repository(&self) -> &MappingRepository {
        &self.repository
    }
}

impl MappingServiceTrait for MappingService {
    fn register_mapping(&self, new_mapping: NewFieldMapping) -> Result<FieldMapping> {
        debug!(
            "Registering mapping for fund '{}' format '{}' effective {}",
            new_mapping.fund_id, new_mapping.source_format, new_mapping.effective_from
        );
        self.repository.create(new_mapping)
    }

    fn get_mapping_version(
        &self,
        fund_id: &str,
        source_format: &str,
        version: i32,
    ) -> Result<FieldMapping> {
        self.repository.get_version(fund_id, source_format, version)
    }

    fn list_mapping_versions(
        &self,
        fund_id: &str,
        source_format: &str,
    ) -> Result<Vec<FieldMapping>> {
        self.repository.list_versions(fund_id, source_format)
    }

    fn map_records(
        &self,
        fund_id: &str,
        format: SourceFormat,
        records: Vec<RawRecord>,
        mappings: &[FieldMapping],
    ) -> MappedBatch {
        map_records(fund_id, format, records, mappings)
    }
}

/// Pure mapping pass over one artifact's records.
pub fn map_records(
    fund_id: &str,
    format: SourceFormat,
    records: Vec<RawRecord>,
    mappings: &[FieldMapping],
) -> MappedBatch {
    let mut batch = MappedBatch::default();

    if mappings.is_empty() {
        for record in records {
            batch.rejects.push(MappingReject {
                raw: record,
                reason: MappingError::NoApplicableVersion {
                    fund_id: fund_id.to_string(),
                    source_format: format.to_string(),
                    as_of_date: "-".to_string(),
                },
            });
        }
        return batch;
    }

    let date_field = if format.is_holdings() {
        FIELD_AS_OF_DATE
    } else {
        FIELD_DATE
    };

    for record in records {
        // The newest rules parse the record's date; the version whose
        // effective window covers that date then does the real mapping.
        let record_date = match extract_date(&record, &mappings[0].rules, date_field) {
            Ok(date) => date,
            Err(reason) => {
                batch.rejects.push(MappingReject { raw: record, reason });
                continue;
            }
        };

        let mapping = match select_applicable(mappings, record_date) {
            Some(mapping) => mapping,
            None => {
                batch.rejects.push(MappingReject {
                    raw: record,
                    reason: MappingError::NoApplicableVersion {
                        fund_id: fund_id.to_string(),
                        source_format: format.to_string(),
                        as_of_date: record_date.to_string(),
                    },
                });
                continue;
            }
        };

        if format.is_holdings() {
            match map_holding(fund_id, &record, &mapping.rules) {
                Ok(candidate) => batch.holdings.push(candidate),
                Err(reason) => batch.rejects.push(MappingReject { raw: record, reason }),
            }
        } else {
            match map_price(fund_id, &record, &mapping.rules) {
                Ok(candidate) => batch.prices.push(candidate),
                Err(reason) => batch.rejects.push(MappingReject { raw: record, reason }),
            }
        }
    }

    batch
}

/// Most recent version applicable on `date`; a pinned single version always
/// applies.
fn select_applicable(mappings: &[FieldMapping], date: NaiveDate) -> Option<&FieldMapping> {
    if mappings.len() == 1 {
        return mappings.first();
    }
    mappings
        .iter()
        .filter(|m| m.effective_from <= date)
        .max_by_key(|m| (m.effective_from, m.version))
}

fn map_holding(
    fund_id: &str,
    record: &RawRecord,
    rules: &FieldMappingRules,
) -> Result<CandidateHolding> {
    let as_of_date = extract_date(record, rules, FIELD_AS_OF_DATE)?;
    let weight = extract_weight(record, rules)?;
    let currency = extract_currency(record, rules)?;

    let asset_class = lookup(record, rules, FIELD_ASSET_CLASS)
        .map(|raw| Vocabulary::asset_class(raw, &rules.overrides.asset_class))
        .unwrap_or(crate::mapping::vocabulary::AssetClass::Unknown);

    let sector = lookup(record, rules, FIELD_SECTOR)
        .map(|raw| Vocabulary::sector(raw, &rules.overrides.sector));

    let geography = lookup(record, rules, FIELD_GEOGRAPHY)
        .map(|raw| Vocabulary::region(raw, &rules.overrides.region))
        .unwrap_or(crate::mapping::vocabulary::Region::Unknown);

    let management_kind =
        lookup(record, rules, FIELD_MANAGEMENT_KIND).map(Vocabulary::management_kind);

    let holding_name =
        lookup(record, rules, FIELD_HOLDING_NAME).map(|name| name.trim().to_string());

    Ok(CandidateHolding {
        fund_id: fund_id.to_string(),
        as_of_date,
        asset_class,
        sector,
        geography,
        weight,
        currency,
        management_kind,
        holding_name,
        line_number: record.line_number,
    })
}

fn map_price(
    fund_id: &str,
    record: &RawRecord,
    rules: &FieldMappingRules,
) -> Result<CandidatePrice> {
    let date = extract_date(record, rules, FIELD_DATE)?;

    let raw_price = lookup(record, rules, FIELD_PRICE)
        .ok_or_else(|| MappingError::MissingRequiredField(FIELD_PRICE.to_string()))?;
    let price = parse_decimal(FIELD_PRICE, raw_price)?;

    let currency = extract_currency(record, rules)?;

    Ok(CandidatePrice {
        fund_id: fund_id.to_string(),
        date,
        price,
        currency,
        line_number: record.line_number,
    })
}

fn extract_date(
    record: &RawRecord,
    rules: &FieldMappingRules,
    field: &str,
) -> Result<NaiveDate> {
    let raw = lookup(record, rules, field)
        .ok_or_else(|| MappingError::MissingRequiredField(field.to_string()))?;
    parse_date(field, raw, rules.date_format.as_deref())
}

fn extract_weight(record: &RawRecord, rules: &FieldMappingRules) -> Result<Decimal> {
    let raw = lookup(record, rules, FIELD_WEIGHT)
        .ok_or_else(|| MappingError::MissingRequiredField(FIELD_WEIGHT.to_string()))?;

    let explicit_percent = raw.trim().ends_with('%');
    let value = parse_decimal(FIELD_WEIGHT, raw)?;

    let weight = if explicit_percent || rules.weight_unit == WeightUnit::Percent {
        value / Decimal::ONE_HUNDRED
    } else {
        value
    };
    Ok(weight)
}

lazy_static::lazy_static! {
    // Disclosures wrap currency codes in all sorts of decoration
    // ("AUD$", "United States (Dollar) USD"); the code itself is always a
    // three-letter token.
    static ref CURRENCY_CODE: regex::Regex =
        regex::Regex::new(r"\b([A-Za-z]{3})\b").expect("valid currency pattern");
}

fn extract_currency(record: &RawRecord, rules: &FieldMappingRules) -> Result<String> {
    let value = lookup(record, rules, FIELD_CURRENCY)
        .and_then(|raw| {
            CURRENCY_CODE
                .captures(raw.trim())
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_uppercase())
        })
        .or_else(|| rules.default_currency.clone());

    value.ok_or_else(|| MappingError::MissingRequiredField(FIELD_CURRENCY.to_string()))
}

/// Parses a numeric cell, tolerating thousands separators, currency symbols,
/// percent signs, and accounting-style negatives.
fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    let mut cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%' | ' '))
        .collect();

    if cleaned.starts_with('(') && cleaned.ends_with(')') {
        cleaned = format!("-{}", &cleaned[1..cleaned.len() - 1]);
    }

    Decimal::from_str(&cleaned).map_err(|_| MappingError::InvalidNumber {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

const DATE_FALLBACK_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d %b %Y", "%d-%b-%Y"];

fn parse_date(field: &str, raw: &str, preferred: Option<&str>) -> Result<NaiveDate> {
    let raw = raw.trim();

    if let Some(fmt) = preferred {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date);
        }
    }
    for fmt in DATE_FALLBACK_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(date);
        }
    }

    Err(MappingError::InvalidDate {
        field: field.to_string(),
        value: raw.to_string(),
    })
}
