use thiserror::Error;

/// Errors raised while parsing a raw disclosure artifact.
///
/// A parse failure is fatal for the artifact and isolated to its fund: the
/// adapter produces either the full record sequence or this error, never a
/// partial result.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed structure: {0}")]
    MalformedStructure(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Artifact is empty: {0}")]
    EmptyArtifact(String),

    #[error("Unknown source format: {0}")]
    UnknownFormat(String),

    #[error("Failed to read artifact: {0}")]
    Io(String),
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::Io(err.to_string())
    }
}

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, ParseError>;
