//! # Checkout Configuration
//!
//! Settings come from defaults overridden by `STOREFRONT_*` environment
//! variables; the binaries then apply their CLI flags on top.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `STOREFRONT_DATABASE_PATH` | `./storefront_dev.db` |
//! | `STOREFRONT_DB_MAX_CONNECTIONS` | `5` |
//! | `STOREFRONT_PAYMENT_TIMEOUT_MS` | `10000` |
//! | `STOREFRONT_PAYMENT_METHOD` | `card` |
//! | `STOREFRONT_GATEWAY_LATENCY_MS` | `1000` |
//! | `STOREFRONT_GATEWAY_DECLINE_RATE` | `0.05` |
//! | `STOREFRONT_LOG` | `info,storefront=debug,sqlx=warn` |
//!
//! A variable that is set but unparsable is an error, not a fallback.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigError;
use crate::orchestrator::CheckoutOptions;
use crate::payment::SimulatedGateway;
use crate::telemetry::DEFAULT_LOG_FILTER;
use storefront_db::DbConfig;

pub const ENV_DATABASE_PATH: &str = "STOREFRONT_DATABASE_PATH";
pub const ENV_DB_MAX_CONNECTIONS: &str = "STOREFRONT_DB_MAX_CONNECTIONS";
pub const ENV_PAYMENT_TIMEOUT_MS: &str = "STOREFRONT_PAYMENT_TIMEOUT_MS";
pub const ENV_PAYMENT_METHOD: &str = "STOREFRONT_PAYMENT_METHOD";
pub const ENV_GATEWAY_LATENCY_MS: &str = "STOREFRONT_GATEWAY_LATENCY_MS";
pub const ENV_GATEWAY_DECLINE_RATE: &str = "STOREFRONT_GATEWAY_DECLINE_RATE";
pub const ENV_LOG: &str = "STOREFRONT_LOG";

/// Runtime settings for the checkout service and its binaries.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutConfig {
    pub database_path: PathBuf,
    pub db_max_connections: u32,
    /// Upper bound on one payment authorization call.
    pub payment_timeout: Duration,
    /// Used when a checkout request names no method.
    pub payment_method: String,
    pub gateway_latency: Duration,
    /// Probability in `0.0..=1.0` that the simulated gateway declines.
    pub gateway_decline_rate: f64,
    /// `EnvFilter` directives; `RUST_LOG` still wins when set.
    pub log_filter: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            database_path: PathBuf::from("./storefront_dev.db"),
            db_max_connections: 5,
            payment_timeout: Duration::from_millis(10_000),
            payment_method: "card".to_string(),
            gateway_latency: Duration::from_millis(1000),
            gateway_decline_rate: 0.05,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl CheckoutConfig {
    /// Loads defaults overridden by the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads defaults overridden by `lookup(key)` for each known variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            config.database_path = PathBuf::from(path);
        }
        if let Some(max) = parse_var::<u32, _>(&lookup, ENV_DB_MAX_CONNECTIONS)? {
            config.db_max_connections = max;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_PAYMENT_TIMEOUT_MS)? {
            config.payment_timeout = Duration::from_millis(ms);
        }
        if let Some(method) = lookup(ENV_PAYMENT_METHOD) {
            config.payment_method = method;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_GATEWAY_LATENCY_MS)? {
            config.gateway_latency = Duration::from_millis(ms);
        }
        if let Some(rate) = parse_var::<f64, _>(&lookup, ENV_GATEWAY_DECLINE_RATE)? {
            config.gateway_decline_rate = rate;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            config.log_filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks ranges that parsing alone doesn't cover.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_max_connections == 0 {
            return Err(ConfigError::invalid(
                ENV_DB_MAX_CONNECTIONS,
                "0",
                "must be at least 1",
            ));
        }

        if self.payment_timeout.is_zero() {
            return Err(ConfigError::invalid(
                ENV_PAYMENT_TIMEOUT_MS,
                "0",
                "must be greater than 0",
            ));
        }

        if self.payment_method.trim().is_empty() {
            return Err(ConfigError::invalid(
                ENV_PAYMENT_METHOD,
                self.payment_method.clone(),
                "must not be empty",
            ));
        }

        if !(0.0..=1.0).contains(&self.gateway_decline_rate) {
            return Err(ConfigError::invalid(
                ENV_GATEWAY_DECLINE_RATE,
                self.gateway_decline_rate.to_string(),
                "must be between 0.0 and 1.0",
            ));
        }

        Ok(())
    }

    /// Database pool settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.db_max_connections)
    }

    /// Simulated payment gateway settings.
    pub fn gateway(&self) -> SimulatedGateway {
        SimulatedGateway::new(self.gateway_latency, self.gateway_decline_rate)
    }

    /// Orchestrator settings.
    pub fn checkout_options(&self) -> CheckoutOptions {
        CheckoutOptions {
            payment_timeout: self.payment_timeout,
            default_payment_method: self.payment_method.clone(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, raw.clone(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CheckoutConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, CheckoutConfig::default());
        assert_eq!(config.payment_method, "card");
        assert_eq!(config.gateway_decline_rate, 0.05);
    }

    #[test]
    fn test_overrides() {
        let config = CheckoutConfig::from_lookup(lookup_from(&[
            (ENV_DATABASE_PATH, "/tmp/shop.db"),
            (ENV_DB_MAX_CONNECTIONS, "8"),
            (ENV_PAYMENT_TIMEOUT_MS, "250"),
            (ENV_PAYMENT_METHOD, "paypal"),
            (ENV_GATEWAY_LATENCY_MS, "0"),
            (ENV_GATEWAY_DECLINE_RATE, "0.5"),
            (ENV_LOG, "debug"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.db_max_connections, 8);
        assert_eq!(config.payment_timeout, Duration::from_millis(250));
        assert_eq!(config.payment_method, "paypal");
        assert!(config.gateway_latency.is_zero());
        assert_eq!(config.gateway_decline_rate, 0.5);
        assert_eq!(config.log_filter, "debug");

        assert_eq!(config.db_config().max_connections, 8);
        assert_eq!(config.gateway().decline_rate(), 0.5);
        assert_eq!(config.checkout_options().default_payment_method, "paypal");
    }

    #[test]
    fn test_unparsable_value_rejected() {
        let err = CheckoutConfig::from_lookup(lookup_from(&[(ENV_PAYMENT_TIMEOUT_MS, "soon")]))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, ref value, .. }
                if key == ENV_PAYMENT_TIMEOUT_MS && value == "soon"
        ));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(CheckoutConfig::from_lookup(lookup_from(&[(ENV_GATEWAY_DECLINE_RATE, "1.5")])).is_err());
        assert!(CheckoutConfig::from_lookup(lookup_from(&[(ENV_DB_MAX_CONNECTIONS, "0")])).is_err());
        assert!(CheckoutConfig::from_lookup(lookup_from(&[(ENV_PAYMENT_TIMEOUT_MS, "0")])).is_err());
        assert!(CheckoutConfig::from_lookup(lookup_from(&[(ENV_PAYMENT_METHOD, "  ")])).is_err());
    }
}
