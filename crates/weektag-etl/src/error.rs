//! Fetch error types for the Last.fm boundary.

use thiserror::Error;

/// Errors raised while talking to the listening-history or tag service.
///
/// Tag-level errors never escape the resolver; history-level errors make
/// the pipeline substitute the demo dataset.
#[derive(Debug, Error)]
pub enum FetchError {
    /// An HTTP request to an external source failed.
    #[error("HTTP error from {source_name}: {message}")]
    Http {
        source_name: String,
        message: String,
    },

    /// The external source returned a rate-limit response.
    #[error("rate limited by {source_name}")]
    RateLimited { source_name: String },

    /// The requested entity was not found at the external source.
    #[error("not found: {entity} at {source_name}")]
    NotFound { entity: String, source_name: String },

    /// A response from an external source could not be parsed.
    #[error("parse error from {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// The service answered with an error payload (`{"error": N, ...}`).
    #[error("{source_name} API error {code}: {message}")]
    Api {
        source_name: String,
        code: i64,
        message: String,
    },

    /// API key or username is not configured.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// The history window contained no completed plays.
    #[error("fetched 0 scrobbles between {from_ts} and {to_ts}")]
    EmptyHistory { from_ts: i64, to_ts: i64 },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// An error propagated from the core domain layer.
    #[error("core error: {0}")]
    Core(#[from] weektag_core::Error),
}

impl FetchError {
    /// Returns `true` when the error is transient and the operation may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } | Self::RateLimited { .. } => true,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` when the error indicates the entity was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience alias for fetch results.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
