use diesel::result::Error as DieselError;
use thiserror::Error;

use crate::adapters::ParseError;
use crate::funds::FundError;
use crate::mapping::MappingError;
use crate::metrics::MetricError;
use crate::store::StoreError;

/// Errors surfaced by the ingestion orchestrator. Any of these fails the
/// run they occur in; other funds' runs are unaffected.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Fund error: {0}")]
    Fund(#[from] FundError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<DieselError> for IngestError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => IngestError::NotFound("Record not found".to_string()),
            _ => IngestError::DatabaseError(err.to_string()),
        }
    }
}

impl From<crate::errors::Error> for IngestError {
    fn from(err: crate::errors::Error) -> Self {
        IngestError::Settings(err.to_string())
    }
}

/// Result type for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;
