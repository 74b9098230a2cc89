//! Canonical field keys addressable by FieldMapping rules.

pub const FIELD_AS_OF_DATE: &str = "asOfDate";
pub const FIELD_DATE: &str = "date";
pub const FIELD_ASSET_CLASS: &str = "assetClass";
pub const FIELD_SECTOR: &str = "sector";
pub const FIELD_GEOGRAPHY: &str = "geography";
pub const FIELD_WEIGHT: &str = "weight";
pub const FIELD_CURRENCY: &str = "currency";
pub const FIELD_PRICE: &str = "price";
pub const FIELD_MANAGEMENT_KIND: &str = "managementKind";
pub const FIELD_HOLDING_NAME: &str = "holdingName";
