// Module declarations
pub(crate) mod ingest_errors;
pub(crate) mod ingest_model;
pub(crate) mod ingest_repository;
pub(crate) mod ingest_service;

// Re-export the public interface
pub use ingest_model::{IngestJob, IngestOptions, IngestRun, IngestRunDB, RunStatus};
pub use ingest_repository::IngestRunRepository;
pub use ingest_service::{IngestService, IngestServiceTrait};

// Re-export error types for convenience
pub use ingest_errors::{IngestError, Result};
