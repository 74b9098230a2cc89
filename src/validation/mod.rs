// Module declarations
pub(crate) mod validation_errors;
pub(crate) mod validation_model;
pub(crate) mod validation_service;

#[cfg(test)]
mod validation_service_tests;

// Re-export the public interface
pub use validation_model::{ValidationConfig, ValidationReport};
pub use validation_service::{ValidationService, ValidationServiceTrait};

// Re-export error types for convenience
pub use validation_errors::{Result, ValidationError};
