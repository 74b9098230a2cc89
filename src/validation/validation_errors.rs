use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Validation failures. Each variant carries enough context for the
/// quarantine reason, and maps to the check name that raised it.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField { field: String },

    #[error("Field '{field}' value {value} outside {constraint}")]
    Range {
        field: String,
        value: String,
        constraint: String,
    },

    #[error("Weights for fund '{fund_id}' at {as_of_date} sum to {sum}, outside 1 ± {tolerance}")]
    WeightSum {
        fund_id: String,
        as_of_date: NaiveDate,
        sum: Decimal,
        tolerance: Decimal,
    },

    #[error("Price date {date} for fund '{fund_id}' does not exceed latest stored date {latest}")]
    OutOfOrder {
        fund_id: String,
        date: NaiveDate,
        latest: NaiveDate,
    },

    #[error("Holdings group for fund '{fund_id}' at {as_of_date} never closed; timed out")]
    IncompleteGroup {
        fund_id: String,
        as_of_date: NaiveDate,
    },

    #[error("Key (fund '{fund_id}', {date}) already stored with different content")]
    DuplicateKey { fund_id: String, date: NaiveDate },
}

impl ValidationError {
    /// The short check tag recorded on quarantine entries.
    pub fn check_name(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "required-fields",
            ValidationError::Range { .. } => "range",
            ValidationError::WeightSum { .. } => "weight-sum",
            ValidationError::OutOfOrder { .. } => "monotonic-date",
            ValidationError::IncompleteGroup { .. } => "group-timeout",
            ValidationError::DuplicateKey { .. } => "duplicate-key",
        }
    }
}

/// Result type for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;
