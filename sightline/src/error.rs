//! Error types for query compilation, backend calls and document decoding

use thiserror::Error;

/// Domain-level errors surfaced by every public operation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Analytics query failed ({operation}): {source}")]
    QueryFailed {
        operation: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("Document decode error: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    pub(crate) fn query_failed(operation: &'static str, source: BackendError) -> Self {
        Self::QueryFailed { operation, source }
    }

    /// Whether the error came from the backend rather than from the caller
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::QueryFailed { .. })
    }
}

/// Failures raised by a [`crate::backend::SearchBackend`] binding
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response body: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("No backend endpoint configured")]
    NoEndpoint,

    #[error("{0}")]
    Other(String),
}
