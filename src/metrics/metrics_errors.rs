use diesel::result::Error as DieselError;
use thiserror::Error;

/// Errors raised by the metric engine.
#[derive(Debug, Error)]
pub enum MetricError {
    /// A requested metric cannot be computed from the available
    /// observations. Reported as "not computable", never a fabricated value.
    #[error("Insufficient data for fund '{fund_id}': {detail}")]
    InsufficientData { fund_id: String, detail: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

impl From<DieselError> for MetricError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => MetricError::NotFound("Record not found".to_string()),
            _ => MetricError::DatabaseError(err.to_string()),
        }
    }
}

/// Result type for metric operations
pub type Result<T> = std::result::Result<T, MetricError>;
