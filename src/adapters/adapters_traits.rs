use super::adapters_errors::Result;
use super::adapters_model::{RawArtifact, RawRecord, SourceFormat};

/// A per-format parser turning a raw artifact into loosely-typed records.
///
/// Adapters are pure transforms: no side effects, no semantic typing, and no
/// partial output. Either the whole record sequence parses or the artifact
/// fails with a `ParseError`.
pub trait SourceAdapter: Send + Sync {
    fn format(&self) -> SourceFormat;
    fn parse(&self, artifact: &RawArtifact) -> Result<Vec<RawRecord>>;
}
