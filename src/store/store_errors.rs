use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Errors raised by the canonical store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An append collided with an existing (fund, date) key. The store never
    /// overwrites; the offending append is rolled back wholly.
    #[error("Duplicate key: {kind} for fund '{fund_id}' at {date} already stored")]
    DuplicateKey {
        kind: &'static str,
        fund_id: String,
        date: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Maps a Diesel error, folding unique-index violations into the
    /// duplicate-key variant.
    pub fn from_diesel(err: DieselError, kind: &'static str, fund_id: &str, date: &str) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                StoreError::DuplicateKey {
                    kind,
                    fund_id: fund_id.to_string(),
                    date: date.to_string(),
                }
            }
            DieselError::NotFound => StoreError::NotFound("Record not found".to_string()),
            other => StoreError::DatabaseError(other.to_string()),
        }
    }
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound("Record not found".to_string()),
            _ => StoreError::DatabaseError(err.to_string()),
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
