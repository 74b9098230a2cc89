use diesel::result::Error as DieselError;
use thiserror::Error;

/// Errors raised while mapping intermediate records onto the canonical
/// schema. Record-level variants quarantine the record; the run continues.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Required field '{0}' is missing or unmapped")]
    MissingRequiredField(String),

    #[error("Field '{field}' has unparseable number '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("Field '{field}' has unparseable date '{value}'")]
    InvalidDate { field: String, value: String },

    #[error("No mapping version for fund '{fund_id}' format '{source_format}' applicable at {as_of_date}")]
    NoApplicableVersion {
        fund_id: String,
        source_format: String,
        as_of_date: String,
    },

    #[error("Invalid mapping rules: {0}")]
    InvalidRules(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<DieselError> for MappingError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => MappingError::NotFound("Record not found".to_string()),
            _ => MappingError::DatabaseError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for MappingError {
    fn from(err: serde_json::Error) -> Self {
        MappingError::InvalidRules(err.to_string())
    }
}

/// Result type for mapping operations
pub type Result<T> = std::result::Result<T, MappingError>;
