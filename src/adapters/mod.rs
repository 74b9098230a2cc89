// Module declarations
pub(crate) mod adapters_errors;
pub(crate) mod adapters_model;
pub(crate) mod adapters_registry;
pub(crate) mod adapters_traits;
pub(crate) mod csv_parser;
pub(crate) mod delimited_adapter;
pub(crate) mod sectioned_adapter;

// Re-export the public interface
pub use adapters_model::{RawArtifact, RawRecord, SourceFormat};
pub use adapters_registry::AdapterRegistry;
pub use adapters_traits::SourceAdapter;
pub use csv_parser::ReadOptions;
pub use delimited_adapter::DelimitedAdapter;
pub use sectioned_adapter::{SectionedHoldingsAdapter, SECTION_LABEL_KEY, SECTION_NOTE_KEY};

// Re-export error types for convenience
pub use adapters_errors::{ParseError, Result};
