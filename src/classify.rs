//! Provider error classification
//!
//! The only place in the engine that inspects raw provider error text. The
//! rest of the engine works with [`ErrorClass`] values, so classification
//! rules (substrings, the recommended-wait regex, status hints) stay in one
//! narrow, testable spot.

use crate::error::ProviderError;
use crate::types::FailureKind;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Classification of a provider error, driving retry behavior
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorClass {
    /// Provider signaled throttling; retryable. May carry a
    /// provider-recommended wait parsed from the message.
    RateLimited {
        /// Wait duration the provider asked for, when the message embeds one
        retry_after: Option<Duration>,
    },
    /// Payload exceeded provider limits; never retried
    ContentTooLarge,
    /// Unknown failure; retried with generic backoff
    Other,
}

impl ErrorClass {
    /// Whether the retry controller may attempt this item again
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorClass::RateLimited { .. } => true,
            ErrorClass::ContentTooLarge => false,
            ErrorClass::Other => true,
        }
    }

    /// The fallback classification recorded when this class exhausts an item
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ErrorClass::RateLimited { .. } => FailureKind::RateLimited,
            ErrorClass::ContentTooLarge => FailureKind::ContentTooLarge,
            ErrorClass::Other => FailureKind::Other,
        }
    }
}

/// Classify a provider error
///
/// Status hints take precedence over message text: 429 is a rate limit and
/// 413 is oversized content regardless of wording. Message matching is
/// case-insensitive.
pub fn classify(error: &ProviderError) -> ErrorClass {
    let message = error.message.to_lowercase();

    match error.status_hint {
        Some(429) => {
            return ErrorClass::RateLimited {
                retry_after: recommended_wait(&error.message),
            };
        }
        Some(413) => return ErrorClass::ContentTooLarge,
        _ => {}
    }

    if message.contains("rate limit")
        || message.contains("too many requests")
        || message.contains("quota exceeded")
    {
        return ErrorClass::RateLimited {
            retry_after: recommended_wait(&error.message),
        };
    }

    if message.contains("too large")
        || message.contains("maximum context")
        || message.contains("content length exceeded")
        || message.contains("payload size")
    {
        return ErrorClass::ContentTooLarge;
    }

    ErrorClass::Other
}

/// Parse a provider-recommended wait time out of an error message
///
/// Recognizes the "try again in 12.3s" and "retry after 12.3s" forms
/// providers embed in throttling messages. Fractional seconds are preserved.
pub fn recommended_wait(message: &str) -> Option<Duration> {
    static WAIT_RE: OnceLock<Regex> = OnceLock::new();
    // The pattern is a literal and always compiles
    #[allow(clippy::unwrap_used)]
    let re = WAIT_RE.get_or_init(|| {
        Regex::new(r"(?i)(?:try again in|retry after)\s+(\d+(?:\.\d+)?)\s*s").unwrap()
    });

    let captures = re.captures(message)?;
    let secs: f64 = captures.get(1)?.as_str().parse().ok()?;
    // Absurd values (overflowing Duration) are treated as no recommendation
    Duration::try_from_secs_f64(secs).ok()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_rate_limited_regardless_of_message() {
        let err = ProviderError::with_status("something opaque", 429);
        assert_eq!(classify(&err), ErrorClass::RateLimited { retry_after: None });
    }

    #[test]
    fn status_413_is_content_too_large() {
        let err = ProviderError::with_status("entity problem", 413);
        assert_eq!(classify(&err), ErrorClass::ContentTooLarge);
    }

    #[test]
    fn rate_limit_message_without_status_is_rate_limited() {
        let err = ProviderError::new("Rate limit exceeded for this key");
        assert!(matches!(classify(&err), ErrorClass::RateLimited { .. }));

        let err = ProviderError::new("Too Many Requests");
        assert!(matches!(classify(&err), ErrorClass::RateLimited { .. }));
    }

    #[test]
    fn recommended_wait_is_parsed_from_message() {
        let err = ProviderError::new("rate limit reached, try again in 12.3s");
        match classify(&err) {
            ErrorClass::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs_f64(12.3)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn recommended_wait_parses_whole_seconds() {
        assert_eq!(
            recommended_wait("please try again in 7s"),
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn recommended_wait_is_case_insensitive_and_tolerates_spacing() {
        assert_eq!(
            recommended_wait("Try Again In  2.0 s"),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn recommended_wait_recognizes_retry_after_phrasing() {
        assert_eq!(
            recommended_wait("rate limited, retry after 4.5s"),
            Some(Duration::from_secs_f64(4.5))
        );
    }

    #[test]
    fn absurd_recommended_wait_is_ignored_rather_than_panicking() {
        // Far beyond what a Duration can represent
        let err = ProviderError::new("rate limit, try again in 999999999999999999999999s");
        assert_eq!(classify(&err), ErrorClass::RateLimited { retry_after: None });
    }

    #[test]
    fn recommended_wait_absent_yields_none() {
        assert_eq!(recommended_wait("rate limit exceeded"), None);
        assert_eq!(recommended_wait(""), None);
    }

    #[test]
    fn oversized_content_messages_are_permanent() {
        for msg in [
            "input is too large for this model",
            "exceeds maximum context window",
            "content length exceeded",
            "payload size over limit",
        ] {
            let err = ProviderError::new(msg);
            assert_eq!(classify(&err), ErrorClass::ContentTooLarge, "message: {msg}");
            assert!(!classify(&err).is_retryable());
        }
    }

    #[test]
    fn unknown_errors_classify_as_other_and_are_retryable() {
        let err = ProviderError::new("connection reset by peer");
        assert_eq!(classify(&err), ErrorClass::Other);
        assert!(classify(&err).is_retryable());
    }

    #[test]
    fn failure_kind_mapping_matches_class() {
        use crate::types::FailureKind;
        assert_eq!(
            ErrorClass::RateLimited { retry_after: None }.failure_kind(),
            FailureKind::RateLimited
        );
        assert_eq!(
            ErrorClass::ContentTooLarge.failure_kind(),
            FailureKind::ContentTooLarge
        );
        assert_eq!(ErrorClass::Other.failure_kind(), FailureKind::Other);
    }
}
