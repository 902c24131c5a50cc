//! Runtime configuration.
//!
//! Plain key/value settings: delay ranges per simulated step, fault probabilities, and
//! the port the routing layer listens on. Validation only checks that ranges are
//! ordered and probabilities lie in `[0, 1]`.
//!
//! Sources, lowest precedence first: built-in defaults, a JSON document
//! ([`Config::from_json`]), environment variables ([`Config::from_env`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fault::DelayRange;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{var} has invalid value `{value}`")]
    Env { var: &'static str, value: String },

    #[error("{field}: min_ms {min_ms} is greater than max_ms {max_ms}")]
    InvalidRange {
        field: &'static str,
        min_ms: u64,
        max_ms: u64,
    },

    #[error("{field}: probability {value} is outside [0, 1]")]
    InvalidProbability { field: &'static str, value: f64 },

    #[error("payment.slow_delay must lie entirely above payment.delay")]
    SlowRangeOverlap,
}

/// Behavior of the simulated payment gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub delay: DelayRange,
    /// Used instead of `delay` when the slow draw fires.
    pub slow_delay: DelayRange,
    pub slow_probability: f64,
    pub failure_probability: f64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            delay: DelayRange::new(100, 300),
            slow_delay: DelayRange::new(1000, 2000),
            slow_probability: 0.10,
            failure_probability: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub inventory_delay: DelayRange,
    pub insert_delay: DelayRange,
    pub update_delay: DelayRange,
    /// Failure probability of the three database steps.
    pub db_failure_probability: f64,
    pub payment: PaymentConfig,
    /// Fixes the fault draws for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            inventory_delay: DelayRange::new(50, 150),
            insert_delay: DelayRange::new(20, 60),
            update_delay: DelayRange::new(10, 40),
            db_failure_probability: 0.0,
            payment: PaymentConfig::default(),
            seed: None,
        }
    }
}

impl Config {
    /// Parses a JSON document; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `ORDERS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|var| std::env::var(var).ok())
    }

    /// Overlays values from `lookup` (an environment-like key/value source).
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(port) = parse(&lookup, "ORDERS_PORT")? {
            self.port = port;
        }
        if let Some(p) = parse(&lookup, "ORDERS_PAYMENT_FAILURE_PROBABILITY")? {
            self.payment.failure_probability = p;
        }
        if let Some(p) = parse(&lookup, "ORDERS_PAYMENT_SLOW_PROBABILITY")? {
            self.payment.slow_probability = p;
        }
        if let Some(p) = parse(&lookup, "ORDERS_DB_FAILURE_PROBABILITY")? {
            self.db_failure_probability = p;
        }
        if let Some(seed) = parse(&lookup, "ORDERS_SEED")? {
            self.seed = Some(seed);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("inventory_delay", self.inventory_delay)?;
        check_range("insert_delay", self.insert_delay)?;
        check_range("update_delay", self.update_delay)?;
        check_range("payment.delay", self.payment.delay)?;
        check_range("payment.slow_delay", self.payment.slow_delay)?;
        check_probability("db_failure_probability", self.db_failure_probability)?;
        check_probability("payment.slow_probability", self.payment.slow_probability)?;
        check_probability(
            "payment.failure_probability",
            self.payment.failure_probability,
        )?;
        if !self.payment.slow_delay.is_above(&self.payment.delay) {
            return Err(ConfigError::SlowRangeOverlap);
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { var, value }),
    }
}

fn check_range(field: &'static str, range: DelayRange) -> Result<(), ConfigError> {
    if range.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange {
            field,
            min_ms: range.min_ms,
            max_ms: range.max_ms,
        })
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.payment.slow_probability, 0.10);
        assert_eq!(config.payment.failure_probability, 0.05);
    }

    #[test]
    fn json_overrides_only_given_keys() {
        let config = Config::from_json(
            r#"{ "port": 9000, "payment": { "failure_probability": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.payment.failure_probability, 0.5);
        assert_eq!(config.payment.slow_probability, 0.10);
        assert_eq!(config.insert_delay, Config::default().insert_delay);
    }

    #[test]
    fn env_overlay_applies_and_validates() {
        let config = Config::default()
            .overlay(env(&[("ORDERS_PORT", "3000"), ("ORDERS_SEED", "42")]))
            .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.seed, Some(42));

        let err = Config::default()
            .overlay(env(&[("ORDERS_PAYMENT_FAILURE_PROBABILITY", "1.5")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProbability { .. }));

        let err = Config::default()
            .overlay(env(&[("ORDERS_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "ORDERS_PORT", .. }));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = Config::from_json(r#"{ "insert_delay": { "min_ms": 50, "max_ms": 10 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidRange {
                field: "insert_delay",
                ..
            }
        ));
    }

    #[test]
    fn slow_range_must_sit_above_normal_range() {
        let mut config = Config::default();
        config.payment.slow_delay = DelayRange::new(200, 2000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SlowRangeOverlap)
        ));
    }

    #[test]
    fn nan_probability_is_rejected() {
        let mut config = Config::default();
        config.db_failure_probability = f64::NAN;
        assert!(config.validate().is_err());
    }
}
