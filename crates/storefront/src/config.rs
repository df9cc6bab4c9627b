//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//! - `SHOPFRONT_STORE_DIR` - Directory for the durable cart store (default: in-memory)
//! - `SHOPFRONT_CART_KEY` - Key the cart snapshot is stored under (default: cart)
//! - `SHOPFRONT_SYNC_TIMEOUT_MS` - Per-attempt sync timeout (default: 5000)
//! - `SHOPFRONT_SYNC_RETRIES` - Retries after a failed sync attempt (default: 3)
//! - `SHOPFRONT_SYNC_RETRY_DELAY_MS` - Delay between sync attempts (default: 1000)
//! - `SHOPFRONT_SIMULATE_LATENCY` - Add mock API delays (default: true)
//! - `SHOPFRONT_SYNC_FAILURE_RATE` - Probability a sync call fails, 0.0 to 1.0 (default: 0.0)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cart::DEFAULT_CART_KEY;
use crate::catalog::{Latency, RetryPolicy};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StorefrontConfig {
    /// Directory holding the cart file; `None` keeps the cart in memory.
    pub store_dir: Option<PathBuf>,
    pub cart_key: String,
    pub sync: SyncConfig,
    pub simulate_latency: bool,
}

/// Remote sync behaviour of the mock catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub failure_rate: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            timeout: policy.timeout,
            retries: policy.retries,
            retry_delay: policy.retry_delay,
            failure_rate: 0.0,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: self.timeout,
            retries: self.retries,
            retry_delay: self.retry_delay,
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            cart_key: DEFAULT_CART_KEY.to_string(),
            sync: SyncConfig::default(),
            simulate_latency: true,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = SyncConfig::default();

        let failure_rate: f64 = parse_or(&lookup, "SHOPFRONT_SYNC_FAILURE_RATE", defaults.failure_rate)?;
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_SYNC_FAILURE_RATE".to_string(),
                format!("must be between 0.0 and 1.0 (got {failure_rate})"),
            ));
        }

        let cart_key = get_or_default(&lookup, "SHOPFRONT_CART_KEY", DEFAULT_CART_KEY);
        if cart_key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_CART_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Self {
            store_dir: lookup("SHOPFRONT_STORE_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            cart_key,
            sync: SyncConfig {
                timeout: parse_millis(&lookup, "SHOPFRONT_SYNC_TIMEOUT_MS", defaults.timeout)?,
                retries: parse_or(&lookup, "SHOPFRONT_SYNC_RETRIES", defaults.retries)?,
                retry_delay: parse_millis(
                    &lookup,
                    "SHOPFRONT_SYNC_RETRY_DELAY_MS",
                    defaults.retry_delay,
                )?,
                failure_rate,
            },
            simulate_latency: parse_or(&lookup, "SHOPFRONT_SIMULATE_LATENCY", true)?,
        })
    }

    /// Mock API delays implied by `simulate_latency`.
    #[must_use]
    pub const fn latency(&self) -> Latency {
        if self.simulate_latency {
            Latency::simulated()
        } else {
            Latency::none()
        }
    }
}

/// Get a variable with a default value.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, falling back to `default` when unset.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn parse_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    lookup(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, StorefrontConfig::default());
        assert_eq!(config.cart_key, "cart");
        assert_eq!(config.sync.retry_policy(), RetryPolicy::default());
        assert!(config.store_dir.is_none());
        assert_eq!(config.latency(), Latency::simulated());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SHOPFRONT_STORE_DIR", "/tmp/shopfront"),
            ("SHOPFRONT_CART_KEY", "guest-cart"),
            ("SHOPFRONT_SYNC_TIMEOUT_MS", "250"),
            ("SHOPFRONT_SYNC_RETRIES", "0"),
            ("SHOPFRONT_SYNC_RETRY_DELAY_MS", "10"),
            ("SHOPFRONT_SIMULATE_LATENCY", "false"),
            ("SHOPFRONT_SYNC_FAILURE_RATE", "0.5"),
        ])
        .unwrap();

        assert_eq!(config.store_dir, Some(PathBuf::from("/tmp/shopfront")));
        assert_eq!(config.cart_key, "guest-cart");
        assert_eq!(config.sync.timeout, Duration::from_millis(250));
        assert_eq!(config.sync.retries, 0);
        assert_eq!(config.sync.retry_delay, Duration::from_millis(10));
        assert!((config.sync.failure_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.latency(), Latency::none());
    }

    #[test]
    fn test_invalid_number() {
        let err = load(&[("SHOPFRONT_SYNC_RETRIES", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "SHOPFRONT_SYNC_RETRIES"));
    }

    #[test]
    fn test_failure_rate_out_of_range() {
        assert!(load(&[("SHOPFRONT_SYNC_FAILURE_RATE", "1.5")]).is_err());
        assert!(load(&[("SHOPFRONT_SYNC_FAILURE_RATE", "-0.1")]).is_err());
    }

    #[test]
    fn test_empty_cart_key_rejected() {
        assert!(load(&[("SHOPFRONT_CART_KEY", " ")]).is_err());
    }
}
