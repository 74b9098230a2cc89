use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::adapters::{RawRecord, SECTION_LABEL_KEY, SECTION_NOTE_KEY};
use crate::constants::DATE_FORMAT;
use crate::mapping::mapping_constants::*;
use crate::mapping::vocabulary::{AssetClass, ManagementKind, Region, Sector};

use super::mapping_errors::{MappingError, Result};

/// Unit the source reports weights in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightUnit {
    /// Percentage points, e.g. `55.0` meaning 55%.
    #[default]
    Percent,
    /// Already a fraction of the portfolio, e.g. `0.55`.
    Fraction,
}

/// Vocabulary overrides pinned to one mapping version. Keys are normalized
/// source labels, values canonical storage tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyOverrides {
    #[serde(default)]
    pub asset_class: HashMap<String, String>,
    #[serde(default)]
    pub sector: HashMap<String, String>,
    #[serde(default)]
    pub region: HashMap<String, String>,
}

/// The rule body of one FieldMapping version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMappingRules {
    /// canonical field key to source column name
    pub fields: HashMap<String, String>,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    /// chrono format string for source dates; ISO-8601 and `%d/%m/%Y` are
    /// always tried as fallbacks.
    #[serde(default)]
    pub date_format: Option<String>,
    /// Currency assumed when a record carries none.
    #[serde(default)]
    pub default_currency: Option<String>,
    #[serde(default)]
    pub overrides: VocabularyOverrides,
}

impl Default for FieldMappingRules {
    fn default() -> Self {
        // Column names of the standard cleaned disclosure table; funds that
        // deviate override these per version.
        let mut fields = HashMap::new();
        fields.insert(FIELD_AS_OF_DATE.to_string(), "Effective Date".to_string());
        fields.insert(FIELD_ASSET_CLASS.to_string(), "Asset Class Name".to_string());
        fields.insert(FIELD_SECTOR.to_string(), "Sector".to_string());
        fields.insert(FIELD_GEOGRAPHY.to_string(), "Listed Country".to_string());
        fields.insert(FIELD_WEIGHT.to_string(), "Weighting".to_string());
        fields.insert(FIELD_CURRENCY.to_string(), "Currency".to_string());
        fields.insert(FIELD_MANAGEMENT_KIND.to_string(), "Int/Ext".to_string());
        fields.insert(
            FIELD_HOLDING_NAME.to_string(),
            "Name/Kind of Investment Item".to_string(),
        );
        fields.insert(FIELD_DATE.to_string(), "Date".to_string());
        fields.insert(FIELD_PRICE.to_string(), "Unit Price".to_string());

        Self {
            fields,
            weight_unit: WeightUnit::Percent,
            date_format: None,
            default_currency: None,
            overrides: VocabularyOverrides::default(),
        }
    }
}

impl FieldMappingRules {
    /// Source column mapped to a canonical field, if any.
    pub fn source_column(&self, canonical: &str) -> Option<&str> {
        self.fields.get(canonical).map(|s| s.as_str())
    }
}

/// A versioned per-fund, per-format mapping rule set. Historical imports
/// stay reproducible because versions are immutable once written; layout
/// changes get a new version with a later `effective_from`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub id: String,
    pub fund_id: String,
    pub source_format: String,
    pub version: i32,
    pub effective_from: NaiveDate,
    pub rules: FieldMappingRules,
    pub created_at: NaiveDateTime,
}

/// Database model for field mappings (rules stored as JSON)
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::field_mappings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FieldMappingDB {
    pub id: String,
    pub fund_id: String,
    pub source_format: String,
    pub version: i32,
    pub effective_from: String,
    pub rules: String,
    pub created_at: NaiveDateTime,
}

/// Input model for registering a new mapping version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFieldMapping {
    pub fund_id: String,
    pub source_format: String,
    pub effective_from: NaiveDate,
    pub rules: FieldMappingRules,
}

impl FieldMappingDB {
    pub fn to_domain(&self) -> Result<FieldMapping> {
        let effective_from = NaiveDate::parse_from_str(&self.effective_from, DATE_FORMAT)
            .map_err(|_| {
                MappingError::InvalidRules(format!(
                    "stored effective_from '{}' is not a date",
                    self.effective_from
                ))
            })?;
        Ok(FieldMapping {
            id: self.id.clone(),
            fund_id: self.fund_id.clone(),
            source_format: self.source_format.clone(),
            version: self.version,
            effective_from,
            rules: serde_json::from_str(&self.rules)?,
            created_at: self.created_at,
        })
    }

    pub fn from_new(new: &NewFieldMapping, version: i32) -> Result<Self> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            fund_id: new.fund_id.clone(),
            source_format: new.source_format.clone(),
            version,
            effective_from: new.effective_from.format(DATE_FORMAT).to_string(),
            rules: serde_json::to_string(&new.rules)?,
            created_at: Utc::now().naive_utc(),
        })
    }
}

/// A canonical-shaped holding candidate awaiting validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateHolding {
    pub fund_id: String,
    pub as_of_date: NaiveDate,
    pub asset_class: AssetClass,
    pub sector: Option<Sector>,
    pub geography: Region,
    pub weight: Decimal,
    pub currency: String,
    pub management_kind: Option<ManagementKind>,
    pub holding_name: Option<String>,
    pub line_number: usize,
}

/// A canonical-shaped price candidate awaiting validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePrice {
    pub fund_id: String,
    pub date: NaiveDate,
    pub price: Decimal,
    pub currency: String,
    pub line_number: usize,
}

/// A record the mapper could not shape; passed through for quarantine, never
/// discarded.
#[derive(Debug)]
pub struct MappingReject {
    pub raw: RawRecord,
    pub reason: MappingError,
}

/// Mapper output for one artifact.
#[derive(Debug, Default)]
pub struct MappedBatch {
    pub holdings: Vec<CandidateHolding>,
    pub prices: Vec<CandidatePrice>,
    pub rejects: Vec<MappingReject>,
}

impl MappedBatch {
    pub fn candidate_count(&self) -> usize {
        self.holdings.len() + self.prices.len()
    }
}

/// Looks a canonical field up in a raw record through the mapping rules.
/// Section pass-through keys double as fallbacks for the fields a sectioned
/// layout carries outside the table body.
pub(crate) fn lookup<'a>(
    record: &'a RawRecord,
    rules: &FieldMappingRules,
    canonical: &str,
) -> Option<&'a str> {
    if let Some(column) = rules.source_column(canonical) {
        if let Some(value) = record.get_ignore_case(column) {
            if !value.trim().is_empty() {
                return Some(value);
            }
        }
    }
    match canonical {
        FIELD_ASSET_CLASS => record.get(SECTION_LABEL_KEY),
        FIELD_MANAGEMENT_KIND => record.get(SECTION_NOTE_KEY),
        _ => None,
    }
    .filter(|v| !v.trim().is_empty())
}
