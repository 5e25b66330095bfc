//! Retry configuration with builder pattern
//!
//! Holds the bounded, fixed-delay retry settings used by the data service
//! fetch and the import post, with defaults matching the service contract.

use std::time::Duration;

use crate::config::RetrySettings;

/// Attempts made before giving up, counting the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Pause between attempts
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Retry behavior for a single logical request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryConfig {
    /// Create a new builder for RetryConfig
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Single attempt, no waiting
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Build from the `[retry]` section of the config file
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::builder()
            .max_attempts(settings.max_attempts)
            .delay(Duration::from_millis(settings.delay_ms))
            .build()
    }
}

/// Builder for RetryConfig
#[derive(Debug)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Set total attempts; zero is clamped to one
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts.max(1);
        self
    }

    /// Set the delay between attempts
    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> RetryConfig {
        self.config
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
