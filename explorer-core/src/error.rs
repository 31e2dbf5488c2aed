//! Crate-wide error type.
//!
//! Network failures keep the raw backend message so it can be shown to the
//! user unchanged. Stale responses are never errors: they are reported as
//! [`ReplayOutcome::Superseded`](crate::parallax::ReplayOutcome) instead.

use thiserror::Error;

/// Errors produced by the explorer core.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend request failed. The message is the raw transport/server text.
    #[error("backend request failed: {0}")]
    Backend(String),

    /// `InteractionDispatcher::get_instance` was called before `init` or after `teardown`.
    #[error("interaction dispatcher is not initialized")]
    DispatcherNotInitialized,

    /// A user-supplied event handler failed. Propagated untouched.
    #[error("event handler failed: {0}")]
    Handler(String),

    /// The configuration is inconsistent (e.g. min greater than max).
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("perspective {0} does not exist")]
    PerspectiveNotFound(String),

    #[error("{0} not found")]
    NotFound(String),

    /// A search result row could not be classified.
    #[error("malformed search result: {0}")]
    MalformedResult(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to encode replay chain: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode replay chain: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

impl Error {
    /// Shorthand used by backends to wrap transport failures.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Shorthand for handler failures raised from event callbacks.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
