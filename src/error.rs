//! Error types for coverage-engine
//!
//! Two distinct error shapes live here:
//! - [`ProviderError`] is what the external analysis provider throws. These
//!   are classified and retried per item and never escape a run; a permanently
//!   failed item becomes a `Fallback` result instead.
//! - [`Error`] is caller-side misuse (empty item list, duplicate ids, invalid
//!   configuration). These are raised synchronously before any work starts.

use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for coverage-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-side error raised before a run starts
///
/// Per-item provider failures are never surfaced through this type; they are
/// converted into `Fallback` item results so one item's failure never aborts
/// a run.
#[derive(Debug, Error)]
pub enum Error {
    /// `run()` was called with an empty item list
    #[error("run requires at least one work item")]
    EmptyRun,

    /// Two work items share the same id
    #[error("duplicate work item id: {0}")]
    DuplicateItemId(ItemId),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    InvalidConfig {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent")
        key: Option<String>,
    },
}

/// Error thrown by the external analysis provider
///
/// The engine depends only on this shape: a message (which may embed a
/// provider-recommended wait such as "try again in 12.3s") and an optional
/// HTTP-like status hint. Classification of raw messages happens in one place,
/// [`crate::classify`].
#[derive(Clone, Debug, Error, Serialize, Deserialize)]
#[error("provider error: {message}")]
pub struct ProviderError {
    /// Raw provider error message
    pub message: String,

    /// HTTP-like status code hint, when the provider supplies one
    pub status_hint: Option<u16>,
}

impl ProviderError {
    /// Create a provider error from a bare message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_hint: None,
        }
    }

    /// Create a provider error with a status hint
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status_hint: Some(status),
        }
    }

    /// The provider call was aborted by cancellation
    ///
    /// Recognized by the retry controller so a cancelled attempt is reported
    /// as run cancellation, never as an item failure.
    pub fn cancelled() -> Self {
        Self {
            message: "generation cancelled".to_string(),
            status_hint: None,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_descriptive() {
        assert_eq!(
            Error::EmptyRun.to_string(),
            "run requires at least one work item"
        );
        assert_eq!(
            Error::DuplicateItemId(ItemId::new("s1")).to_string(),
            "duplicate work item id: s1"
        );
    }

    #[test]
    fn invalid_config_display_includes_message() {
        let err = Error::InvalidConfig {
            message: "max_concurrent must be at least 1".to_string(),
            key: Some("max_concurrent".to_string()),
        };
        assert!(err.to_string().contains("max_concurrent must be at least 1"));
    }

    #[test]
    fn provider_error_display_prefixes_message() {
        let err = ProviderError::with_status("rate limit exceeded", 429);
        assert_eq!(err.to_string(), "provider error: rate limit exceeded");
        assert_eq!(err.status_hint, Some(429));
    }

    #[test]
    fn provider_error_round_trips_through_json() {
        let err = ProviderError::new("try again in 2.0s");
        let json = serde_json::to_string(&err).unwrap();
        let back: ProviderError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, "try again in 2.0s");
        assert_eq!(back.status_hint, None);
    }
}
