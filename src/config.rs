//! Construction options for the entity cache and request middleware

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, WikibaseError};

/// Context key the request facade is attached under
pub const DEFAULT_CONTEXT_KEY: &str = "wb";

/// Language used when neither session nor update carry one
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

/// Default time-to-live of cached entities (6 hours)
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Default interval between sweeps of expired entries (10 minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Jittered TTLs never drop below this fraction of the configured TTL
const MIN_JITTERED_TTL_FRACTION: f64 = 0.1;

/// Configuration for the entity cache and the request middleware
///
/// Defaults:
/// - TTL: 6 hours
/// - Refresh interval: 95% of the TTL, so warm entities never expire
/// - Locales are offered once more than half the tracked entities are labelled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikibaseConfig {
    /// Key the request facade is attached under on each update context
    pub context_key: String,

    /// Time-to-live for cached entities
    pub ttl: Duration,

    /// TTL jitter factor (0.0 - 1.0)
    /// Spreads expiry of entities fetched in one batch
    pub ttl_jitter: f64,

    /// Fraction of the TTL after which the periodic refresh runs
    pub refresh_factor: f64,

    /// Interval between sweeps of expired entries out of the store
    pub cleanup_interval: Duration,

    /// Log every batch of identifiers sent to the fetcher
    pub log_queried_entity_ids: bool,

    /// Identifying tag sent with outbound requests
    pub user_agent: String,

    /// Fallback language for requests without a preference
    pub default_language_code: String,

    /// Minimum label coverage for `available_locales`
    pub available_locales_threshold: f64,
}

impl Default for WikibaseConfig {
    fn default() -> Self {
        Self {
            context_key: DEFAULT_CONTEXT_KEY.to_string(),
            ttl: DEFAULT_TTL,
            ttl_jitter: 0.0,
            refresh_factor: 0.95,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            log_queried_entity_ids: false,
            user_agent: concat!("wikibase-context/", env!("CARGO_PKG_VERSION")).to_string(),
            default_language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            available_locales_threshold: 0.5,
        }
    }
}

impl WikibaseConfig {
    /// Create a new builder for the configuration
    pub fn builder() -> WikibaseConfigBuilder {
        WikibaseConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.context_key.is_empty() {
            return Err(WikibaseError::Config(
                "context_key must not be empty".to_string(),
            ));
        }

        if self.ttl.is_zero() {
            return Err(WikibaseError::Config(
                "ttl must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(WikibaseError::Config(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.refresh_factor <= 0.0 || self.refresh_factor > 1.0 {
            return Err(WikibaseError::Config(
                "refresh_factor must be in (0.0, 1.0]".to_string(),
            ));
        }

        if self.cleanup_interval.is_zero() {
            return Err(WikibaseError::Config(
                "cleanup_interval must be greater than 0".to_string(),
            ));
        }

        if self.default_language_code.is_empty() {
            return Err(WikibaseError::Config(
                "default_language_code must not be empty".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.available_locales_threshold) {
            return Err(WikibaseError::Config(
                "available_locales_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Calculate actual TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Duration {
        if self.ttl_jitter == 0.0 {
            return self.ttl;
        }

        let base_secs = self.ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(base_secs * MIN_JITTERED_TTL_FRACTION);

        Duration::from_secs_f64(final_secs)
    }

    /// Interval of the periodic refresh task
    pub fn refresh_interval(&self) -> Duration {
        self.ttl.mul_f64(self.refresh_factor)
    }
}

/// Builder for the configuration
#[derive(Debug, Default)]
pub struct WikibaseConfigBuilder {
    context_key: Option<String>,
    ttl: Option<Duration>,
    ttl_jitter: Option<f64>,
    refresh_factor: Option<f64>,
    cleanup_interval: Option<Duration>,
    log_queried_entity_ids: Option<bool>,
    user_agent: Option<String>,
    default_language_code: Option<String>,
    available_locales_threshold: Option<f64>,
}

impl WikibaseConfigBuilder {
    /// Set the context key
    pub fn context_key(mut self, key: impl Into<String>) -> Self {
        self.context_key = Some(key.into());
        self
    }

    /// Set the TTL of cached entities
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Set the refresh interval as a fraction of the TTL
    pub fn refresh_factor(mut self, factor: f64) -> Self {
        self.refresh_factor = Some(factor);
        self
    }

    /// Set the interval between sweeps of expired entries
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Enable or disable logging of fetched identifiers
    pub fn log_queried_entity_ids(mut self, enable: bool) -> Self {
        self.log_queried_entity_ids = Some(enable);
        self
    }

    /// Set the outbound user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the fallback language
    pub fn default_language_code(mut self, code: impl Into<String>) -> Self {
        self.default_language_code = Some(code.into());
        self
    }

    /// Set the default threshold of `available_locales`
    pub fn available_locales_threshold(mut self, threshold: f64) -> Self {
        self.available_locales_threshold = Some(threshold);
        self
    }

    /// Build the configuration
    pub fn build(self) -> WikibaseConfig {
        let defaults = WikibaseConfig::default();

        WikibaseConfig {
            context_key: self.context_key.unwrap_or(defaults.context_key),
            ttl: self.ttl.unwrap_or(defaults.ttl),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            refresh_factor: self.refresh_factor.unwrap_or(defaults.refresh_factor),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
            log_queried_entity_ids: self
                .log_queried_entity_ids
                .unwrap_or(defaults.log_queried_entity_ids),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            default_language_code: self
                .default_language_code
                .unwrap_or(defaults.default_language_code),
            available_locales_threshold: self
                .available_locales_threshold
                .unwrap_or(defaults.available_locales_threshold),
        }
    }

    /// Build and validate the configuration
    pub fn try_build(self) -> Result<WikibaseConfig> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

/// Preset configurations
impl WikibaseConfig {
    /// Short TTL for knowledge bases that are edited while the bot runs
    pub fn realtime() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            ttl_jitter: 0.1,
            ..Default::default()
        }
    }

    /// Long TTL for stable reference data
    pub fn long_lived() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            ttl_jitter: 0.05,
            ..Default::default()
        }
    }
}
