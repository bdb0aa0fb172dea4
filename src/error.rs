//! Crate-wide error taxonomy.
//!
//! Errors fall into five classes with different propagation rules:
//!
//! - [`Error::Validation`] / [`Error::Configuration`]: rejected before any
//!   network call; never retried.
//! - [`Error::Transport`]: network, HTTP status, content-type/size or
//!   integrity failure. Transient statuses are retried inside the transport
//!   layer before this surfaces.
//! - [`Error::Synthesis`]: the TTS provider rejected the job or returned an
//!   unusable response after the bounded retry protocol was exhausted.
//! - [`Error::Processing`]: fatal decode/export failure. Music-side
//!   processing errors never surface here; the mixing engine degrades to the
//!   voice-only track instead.
//! - [`Error::Persistence`]: local-save failure. Logged by the pipeline and
//!   absorbed; a failed optional save never fails the job.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the podcast audio pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed configuration or input, detected before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or unusable environment configuration (API keys).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network or HTTP-level failure while fetching a remote asset.
    #[error("transport error fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The synthesis provider failed after all retry attempts.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Fatal audio decode or export failure.
    #[error("audio processing error: {0}")]
    Processing(String),

    /// Failure persisting the exported asset locally.
    #[error("persistence error for {path:?}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying HTTP client failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand constructor for transport failures.
    pub(crate) fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
