// Module declarations
pub(crate) mod mapping_constants;
pub(crate) mod mapping_errors;
pub(crate) mod mapping_model;
pub(crate) mod mapping_repository;
pub(crate) mod mapping_service;
pub(crate) mod vocabulary;

// Re-export the public interface
pub use mapping_constants::*;
pub use mapping_model::{
    CandidateHolding, CandidatePrice, FieldMapping, FieldMappingDB, FieldMappingRules,
    MappedBatch, MappingReject, NewFieldMapping, VocabularyOverrides, WeightUnit,
};
pub use mapping_repository::MappingRepository;
pub use mapping_service::{map_records, MappingService, MappingServiceTrait};
pub use vocabulary::{AssetClass, ManagementKind, Region, Sector, Vocabulary};

// Re-export error types for convenience
pub use mapping_errors::{MappingError, Result};
