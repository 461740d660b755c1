//! Backoff policy for retry waits
//!
//! Pure computation, no sleeping: given a retry attempt number and a
//! classified error, produce the wait duration. A provider-recommended wait
//! (plus a safety margin) always wins; otherwise the delay grows
//! exponentially from `base_delay` with optional jitter up to 30% of the
//! value, capped at `max_delay`. Jitter prevents synchronized retry storms
//! when several items hit the rate limit together.

use crate::classify::ErrorClass;
use crate::config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Fraction of the exponential delay that jitter may add
const JITTER_FRACTION: f64 = 0.3;

/// Compute the wait before retry `attempt` (1-based) for a classified error
///
/// Ignoring jitter, the result is monotonically non-decreasing in `attempt`
/// whenever no provider-recommended wait is present.
pub fn backoff_delay(attempt: u32, class: &ErrorClass, config: &RetryConfig) -> Duration {
    if let ErrorClass::RateLimited {
        retry_after: Some(wait),
    } = class
    {
        // The provider told us exactly how long to wait; trust it plus margin
        return wait.saturating_add(config.rate_limit_margin);
    }

    let exponent = attempt.saturating_sub(1).min(31);
    let exponential = config
        .base_delay
        .saturating_mul(2_u32.saturating_pow(exponent))
        .min(config.max_delay);

    if config.jitter {
        add_jitter(exponential)
    } else {
        exponential
    }
}

/// Add random jitter to a delay
///
/// Jitter is uniformly distributed between 0% and 30% of the delay, so the
/// result lies in `[delay, 1.3 * delay]`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=JITTER_FRACTION);
    // Falls back to the unjittered delay if the product overflows Duration
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}
