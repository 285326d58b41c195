//! Error types shared by the indexing and query pipelines.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Broad class of a failed call to the hosted model API.
///
/// Decided once, where the HTTP response is inspected, so callers never
/// have to look at provider error text themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
    RateLimited,
    AuthFailed,
    Unknown,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::AuthFailed => "auth_failed",
            ProviderErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A failed embedding or generation call, with the raw provider detail.
///
/// The message is for logs only; user-facing text is chosen from `kind`.
#[derive(Debug, Error)]
#[error("{kind} provider error: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP response.
    ///
    /// Status code wins. Providers are inconsistent about status codes for
    /// quota exhaustion, so the body text is matched as a fallback.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            429 => ProviderErrorKind::RateLimited,
            401 | 403 => ProviderErrorKind::AuthFailed,
            _ => classify_text(body),
        };
        Self::new(kind, format!("HTTP {status}: {body}"))
    }
}

/// Fallback classification from provider error text.
pub fn classify_text(text: &str) -> ProviderErrorKind {
    let lower = text.to_lowercase();
    if lower.contains("rate limit") || lower.contains("rate_limit") || lower.contains("quota") {
        ProviderErrorKind::RateLimited
    } else if lower.contains("invalid api key")
        || lower.contains("incorrect api key")
        || lower.contains("invalid_api_key")
    {
        ProviderErrorKind::AuthFailed
    } else {
        ProviderErrorKind::Unknown
    }
}

/// Why a persisted index could not be opened.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no index found at {0}")]
    Missing(PathBuf),

    #[error("failed to read index file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("index schema version {found} is not supported (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("index was built with embedding model {indexed}, but {configured} is configured")]
    ModelMismatch { indexed: String, configured: String },

    #[error("index holds {records} records but its manifest declares {declared}")]
    CountMismatch { records: usize, declared: usize },

    #[error("index record {position} has {found} dimensions, expected {expected}")]
    DimensionMismatch { position: usize, found: usize, expected: usize },

    #[error("question embedding has {found} dimensions but the index holds {expected}")]
    QueryDimensionMismatch { found: usize, expected: usize },
}

/// Errors surfaced by the library.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no usable input in {0}: no text chunks were produced")]
    NoUsableInput(PathBuf),

    #[error("cannot read corpus directory {path}: {source}")]
    Corpus {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("failed to write index at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode index: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

/// Why a single question could not be answered.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("knowledge base unavailable: {0}")]
    IndexUnavailable(#[from] IndexError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
