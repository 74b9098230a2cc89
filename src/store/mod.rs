// Module declarations
pub(crate) mod quarantine_repository;
pub(crate) mod store_errors;
pub(crate) mod store_model;
pub(crate) mod store_repository;
pub(crate) mod store_service;
pub(crate) mod store_traits;

// Re-export the public interface
pub use quarantine_repository::QuarantineRepository;
pub use store_model::{
    holdings_group_digest, DateRange, FundSelector, GroupAppendOutcome, HoldingDB, HoldingRecord,
    NewQuarantineEntry, PriceAppendOutcome, PricePoint, PricePointDB, QuarantineEntry,
    QuarantineEntryDB,
};
pub use store_repository::CanonicalStoreRepository;
pub use store_service::{CanonicalStoreService, HoldingsCursor, PricesCursor};
pub use store_traits::CanonicalStoreTrait;

// Re-export error types for convenience
pub use store_errors::{Result, StoreError};
