//! Controlled vocabularies for enumeration normalization.
//!
//! Free-text classifications from fund disclosures are folded onto fixed
//! enumerations here. Every lookup has an explicit `Unknown` fallback; a
//! value that fails to match is carried as unknown, never dropped.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical asset classes, plus the unmapped fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    Cash,
    Equity,
    FixedIncome,
    Property,
    Infrastructure,
    ForeignCurrency,
    Other,
    Unknown,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Cash => "CASH",
            AssetClass::Equity => "EQUITY",
            AssetClass::FixedIncome => "FIXED_INCOME",
            AssetClass::Property => "PROPERTY",
            AssetClass::Infrastructure => "INFRASTRUCTURE",
            AssetClass::ForeignCurrency => "FOREIGN_CURRENCY",
            AssetClass::Other => "OTHER",
            AssetClass::Unknown => "UNKNOWN",
        }
    }

    pub fn from_storage(s: &str) -> Self {
        match s {
            "CASH" => AssetClass::Cash,
            "EQUITY" => AssetClass::Equity,
            "FIXED_INCOME" => AssetClass::FixedIncome,
            "PROPERTY" => AssetClass::Property,
            "INFRASTRUCTURE" => AssetClass::Infrastructure,
            "FOREIGN_CURRENCY" => AssetClass::ForeignCurrency,
            "OTHER" => AssetClass::Other,
            _ => AssetClass::Unknown,
        }
    }
}

/// Sector taxonomy (GICS-level granularity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sector {
    Energy,
    Materials,
    Industrials,
    ConsumerDiscretionary,
    ConsumerStaples,
    HealthCare,
    Financials,
    InformationTechnology,
    CommunicationServices,
    Utilities,
    RealEstate,
    Unknown,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Energy => "ENERGY",
            Sector::Materials => "MATERIALS",
            Sector::Industrials => "INDUSTRIALS",
            Sector::ConsumerDiscretionary => "CONSUMER_DISCRETIONARY",
            Sector::ConsumerStaples => "CONSUMER_STAPLES",
            Sector::HealthCare => "HEALTH_CARE",
            Sector::Financials => "FINANCIALS",
            Sector::InformationTechnology => "INFORMATION_TECHNOLOGY",
            Sector::CommunicationServices => "COMMUNICATION_SERVICES",
            Sector::Utilities => "UTILITIES",
            Sector::RealEstate => "REAL_ESTATE",
            Sector::Unknown => "UNKNOWN",
        }
    }

    pub fn from_storage(s: &str) -> Self {
        match s {
            "ENERGY" => Sector::Energy,
            "MATERIALS" => Sector::Materials,
            "INDUSTRIALS" => Sector::Industrials,
            "CONSUMER_DISCRETIONARY" => Sector::ConsumerDiscretionary,
            "CONSUMER_STAPLES" => Sector::ConsumerStaples,
            "HEALTH_CARE" => Sector::HealthCare,
            "FINANCIALS" => Sector::Financials,
            "INFORMATION_TECHNOLOGY" => Sector::InformationTechnology,
            "COMMUNICATION_SERVICES" => Sector::CommunicationServices,
            "UTILITIES" => Sector::Utilities,
            "REAL_ESTATE" => Sector::RealEstate,
            _ => Sector::Unknown,
        }
    }
}

/// Region codes. Disclosures usually key geography off a listed country, so
/// the vocabulary folds ISO 3166 alpha-2 codes and common country names onto
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    Australia,
    NewZealand,
    AsiaPacific,
    NorthAmerica,
    UnitedKingdom,
    Europe,
    EmergingMarkets,
    Global,
    Unknown,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Australia => "AU",
            Region::NewZealand => "NZ",
            Region::AsiaPacific => "APAC",
            Region::NorthAmerica => "NA",
            Region::UnitedKingdom => "UK",
            Region::Europe => "EU",
            Region::EmergingMarkets => "EM",
            Region::Global => "GLOBAL",
            Region::Unknown => "UNKNOWN",
        }
    }

    pub fn from_storage(s: &str) -> Self {
        match s {
            "AU" => Region::Australia,
            "NZ" => Region::NewZealand,
            "APAC" => Region::AsiaPacific,
            "NA" => Region::NorthAmerica,
            "UK" => Region::UnitedKingdom,
            "EU" => Region::Europe,
            "EM" => Region::EmergingMarkets,
            "GLOBAL" => Region::Global,
            _ => Region::Unknown,
        }
    }
}

/// Whether a holding is internally or externally managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManagementKind {
    Internal,
    External,
    Unknown,
}

impl ManagementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagementKind::Internal => "INTERNAL",
            ManagementKind::External => "EXTERNAL",
            ManagementKind::Unknown => "UNKNOWN",
        }
    }

    pub fn from_storage(s: &str) -> Self {
        match s {
            "INTERNAL" => ManagementKind::Internal,
            "EXTERNAL" => ManagementKind::External,
            _ => ManagementKind::Unknown,
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

lazy_static! {
    static ref ASSET_CLASS_SYNONYMS: HashMap<&'static str, AssetClass> = {
        let mut m = HashMap::new();
        for key in ["cash", "cash & deposits", "cash and deposits", "cash at bank", "deposits", "money market"] {
            m.insert(key, AssetClass::Cash);
        }
        for key in [
            "equity", "equities", "listed equity", "listed equities", "shares",
            "australian shares", "international shares", "global shares",
            "domestic equity", "international equity", "unlisted equity", "private equity",
        ] {
            m.insert(key, AssetClass::Equity);
        }
        for key in [
            "fixed income", "fixed-income", "fixed interest", "bonds", "bond",
            "credit", "debt", "government bonds", "corporate bonds",
        ] {
            m.insert(key, AssetClass::FixedIncome);
        }
        for key in ["property", "real estate", "listed property", "unlisted property", "real property"] {
            m.insert(key, AssetClass::Property);
        }
        for key in ["infrastructure", "listed infrastructure", "unlisted infrastructure"] {
            m.insert(key, AssetClass::Infrastructure);
        }
        for key in ["foreign currency", "currency", "fx", "currency overlay", "foreign exchange"] {
            m.insert(key, AssetClass::ForeignCurrency);
        }
        for key in ["other", "alternatives", "alternative assets", "commodities", "hedge funds"] {
            m.insert(key, AssetClass::Other);
        }
        m
    };

    static ref SECTOR_SYNONYMS: HashMap<&'static str, Sector> = {
        let mut m = HashMap::new();
        m.insert("energy", Sector::Energy);
        m.insert("oil & gas", Sector::Energy);
        m.insert("materials", Sector::Materials);
        m.insert("basic materials", Sector::Materials);
        m.insert("mining", Sector::Materials);
        m.insert("industrials", Sector::Industrials);
        m.insert("industrial", Sector::Industrials);
        m.insert("consumer discretionary", Sector::ConsumerDiscretionary);
        m.insert("consumer cyclical", Sector::ConsumerDiscretionary);
        m.insert("consumer staples", Sector::ConsumerStaples);
        m.insert("consumer defensive", Sector::ConsumerStaples);
        m.insert("health care", Sector::HealthCare);
        m.insert("healthcare", Sector::HealthCare);
        m.insert("financials", Sector::Financials);
        m.insert("financial services", Sector::Financials);
        m.insert("banks", Sector::Financials);
        m.insert("information technology", Sector::InformationTechnology);
        m.insert("technology", Sector::InformationTechnology);
        m.insert("it", Sector::InformationTechnology);
        m.insert("communication services", Sector::CommunicationServices);
        m.insert("telecommunications", Sector::CommunicationServices);
        m.insert("telecommunication services", Sector::CommunicationServices);
        m.insert("utilities", Sector::Utilities);
        m.insert("real estate", Sector::RealEstate);
        m.insert("property trusts", Sector::RealEstate);
        m
    };

    static ref REGION_SYNONYMS: HashMap<&'static str, Region> = {
        let mut m = HashMap::new();
        for key in ["au", "aus", "australia"] {
            m.insert(key, Region::Australia);
        }
        for key in ["nz", "new zealand"] {
            m.insert(key, Region::NewZealand);
        }
        for key in [
            "jp", "japan", "sg", "singapore", "hk", "hong kong", "kr", "south korea",
            "korea", "tw", "taiwan", "asia", "asia pacific", "apac", "asia ex japan",
        ] {
            m.insert(key, Region::AsiaPacific);
        }
        for key in ["us", "usa", "united states", "united states of america", "ca", "canada", "north america"] {
            m.insert(key, Region::NorthAmerica);
        }
        for key in ["gb", "uk", "united kingdom", "great britain"] {
            m.insert(key, Region::UnitedKingdom);
        }
        for key in [
            "de", "germany", "fr", "france", "nl", "netherlands", "it", "italy",
            "es", "spain", "ch", "switzerland", "se", "sweden", "dk", "denmark",
            "no", "norway", "fi", "finland", "ie", "ireland", "be", "belgium",
            "at", "austria", "pt", "portugal", "lu", "luxembourg", "europe", "eurozone",
        ] {
            m.insert(key, Region::Europe);
        }
        for key in [
            "cn", "china", "in", "india", "br", "brazil", "za", "south africa",
            "mx", "mexico", "id", "indonesia", "th", "thailand", "my", "malaysia",
            "ph", "philippines", "vn", "vietnam", "cl", "chile", "tr", "turkey",
            "emerging markets", "emerging",
        ] {
            m.insert(key, Region::EmergingMarkets);
        }
        for key in ["global", "world", "international", "multi-region", "various"] {
            m.insert(key, Region::Global);
        }
        m
    };
}

/// Vocabulary lookup surface. Per-mapping overrides are consulted before the
/// built-in synonym tables so a fund's idiosyncratic labels can be pinned in
/// its FieldMapping version without touching shared state.
#[derive(Debug, Default)]
pub struct Vocabulary;

impl Vocabulary {
    pub fn asset_class(raw: &str, overrides: &HashMap<String, String>) -> AssetClass {
        let key = normalize(raw);
        if key.is_empty() {
            return AssetClass::Unknown;
        }
        if let Some(target) = overrides.get(&key) {
            return AssetClass::from_storage(target);
        }
        ASSET_CLASS_SYNONYMS
            .get(key.as_str())
            .copied()
            .unwrap_or(AssetClass::Unknown)
    }

    pub fn sector(raw: &str, overrides: &HashMap<String, String>) -> Sector {
        let key = normalize(raw);
        if key.is_empty() {
            return Sector::Unknown;
        }
        if let Some(target) = overrides.get(&key) {
            return Sector::from_storage(target);
        }
        SECTOR_SYNONYMS
            .get(key.as_str())
            .copied()
            .unwrap_or(Sector::Unknown)
    }

    pub fn region(raw: &str, overrides: &HashMap<String, String>) -> Region {
        let key = normalize(raw);
        if key.is_empty() {
            return Region::Unknown;
        }
        if let Some(target) = overrides.get(&key) {
            return Region::from_storage(target);
        }
        REGION_SYNONYMS
            .get(key.as_str())
            .copied()
            .unwrap_or(Region::Unknown)
    }

    pub fn management_kind(raw: &str) -> ManagementKind {
        let key = normalize(raw);
        if key.contains("internal") {
            ManagementKind::Internal
        } else if key.contains("external") {
            ManagementKind::External
        } else {
            ManagementKind::Unknown
        }
    }
}
