//! Configuration types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behavior for per-item provider failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries per item (default: 3, i.e. 4 total attempts)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff (default: 1 second)
    #[serde(default = "default_base_delay", with = "duration_serde")]
    pub base_delay: Duration,

    /// Cap applied to the exponential component (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Add random jitter (up to 30% of the delay) to prevent synchronized
    /// retry storms (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Safety margin added to a provider-recommended wait (default: 1 second)
    #[serde(default = "default_rate_limit_margin", with = "duration_serde")]
    pub rate_limit_margin: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
            rate_limit_margin: Duration::from_secs(1),
        }
    }
}

/// Engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Fixed pause between items to spread provider load (default: 2 seconds).
    /// Not applied after the last item, and skipped entirely when
    /// `max_concurrent > 1`.
    #[serde(default = "default_inter_item_delay", with = "duration_serde")]
    pub inter_item_delay: Duration,

    /// Extra pause added per retry the previous item consumed (default: 1
    /// second per retry), so a struggling provider gets breathing room
    #[serde(default = "default_inter_item_retry_step", with = "duration_serde")]
    pub inter_item_retry_step: Duration,

    /// Maximum items in flight at once (default: 1, strictly sequential).
    /// Values above 1 are for providers that tolerate concurrent calls;
    /// results and completion progress stay in original item order.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Ask the provider to synthesize the run overview from successful
    /// analyses (default: true). When false, or when synthesis fails, the
    /// deterministic template summary is used.
    #[serde(default = "default_true")]
    pub synthesize_summary: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            inter_item_delay: default_inter_item_delay(),
            inter_item_retry_step: default_inter_item_retry_step(),
            max_concurrent: 1,
            synthesize_summary: true,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::InvalidConfig {
                message: "max_concurrent must be at least 1".to_string(),
                key: Some("max_concurrent".to_string()),
            });
        }
        if self.retry.base_delay.is_zero() {
            return Err(Error::InvalidConfig {
                message: "retry.base_delay must be non-zero".to_string(),
                key: Some("retry.base_delay".to_string()),
            });
        }
        if self.retry.max_delay < self.retry.base_delay {
            return Err(Error::InvalidConfig {
                message: "retry.max_delay must be >= retry.base_delay".to_string(),
                key: Some("retry.max_delay".to_string()),
            });
        }
        Ok(())
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_rate_limit_margin() -> Duration {
    Duration::from_secs(1)
}

fn default_inter_item_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_inter_item_retry_step() -> Duration {
    Duration::from_secs(1)
}

fn default_max_concurrent() -> usize {
    1
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
