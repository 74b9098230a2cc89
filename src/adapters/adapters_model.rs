use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::PathBuf;
use std::str::FromStr;

use super::adapters_errors::{ParseError, Result};

/// Declared layout of a raw disclosure artifact. Selects the adapter; shared
/// logic never branches on raw field contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// Wide holdings table with a single header row.
    DelimitedHoldings,
    /// Multiple holdings tables, each preceded by section label lines.
    SectionedHoldings,
    /// Unit-price time series with a single header row.
    DelimitedPrices,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::DelimitedHoldings => "delimited-holdings",
            SourceFormat::SectionedHoldings => "sectioned-holdings",
            SourceFormat::DelimitedPrices => "delimited-prices",
        }
    }

    /// Whether artifacts of this format carry holding records (as opposed to
    /// unit prices).
    pub fn is_holdings(&self) -> bool {
        matches!(
            self,
            SourceFormat::DelimitedHoldings | SourceFormat::SectionedHoldings
        )
    }
}

impl FromStr for SourceFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "delimited-holdings" => Ok(SourceFormat::DelimitedHoldings),
            "sectioned-holdings" => Ok(SourceFormat::SectionedHoldings),
            "delimited-prices" => Ok(SourceFormat::DelimitedPrices),
            other => Err(ParseError::UnknownFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw artifact handed to the pipeline. Fetch mechanics live outside the
/// core; this is either a path the collaborator downloaded to, or an
/// in-memory payload.
#[derive(Debug, Clone)]
pub enum RawArtifact {
    Path(PathBuf),
    Payload { name: String, bytes: Vec<u8> },
}

impl RawArtifact {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        RawArtifact::Path(path.into())
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        RawArtifact::Payload {
            name: name.into(),
            bytes,
        }
    }

    /// Human-readable artifact name for logs and run reports.
    pub fn name(&self) -> String {
        match self {
            RawArtifact::Path(path) => path.to_string_lossy().to_string(),
            RawArtifact::Payload { name, .. } => name.clone(),
        }
    }

    pub fn content(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            RawArtifact::Path(path) => Ok(Cow::Owned(std::fs::read(path)?)),
            RawArtifact::Payload { bytes, .. } => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// A loosely-typed intermediate record: ordered (column, value) pairs as they
/// appeared in the source, plus the source line for audit trails. Semantic
/// typing is the mapper's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub fields: Vec<(String, String)>,
    pub line_number: usize,
}

impl RawRecord {
    pub fn new(line_number: usize) -> Self {
        Self {
            fields: Vec::new(),
            line_number,
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// First value recorded under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive, whitespace-trimmed lookup. Source headers are not
    /// reliably cased consistently between reporting periods.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        let wanted = key.trim().to_lowercase();
        self.fields
            .iter()
            .find(|(k, _)| k.trim().to_lowercase() == wanted)
            .map(|(_, v)| v.as_str())
    }
}
