//! Editor configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::error::{EditorError, Result};
use crate::history::DEFAULT_HISTORY_LIMIT;

/// Default period between autosave attempts while there are unsaved edits
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Period of the autosave timer
    pub autosave_interval: Duration,

    /// Lifetime of template cache entries
    pub cache_ttl: Duration,

    /// Maximum number of undo snapshots kept per session
    pub history_limit: usize,
}

impl EditorConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `STOREFRONT_AUTOSAVE_SECS`, `STOREFRONT_CACHE_TTL_SECS` and
    /// `STOREFRONT_HISTORY_LIMIT`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            autosave_interval: env_secs("STOREFRONT_AUTOSAVE_SECS")?
                .unwrap_or(defaults.autosave_interval),
            cache_ttl: env_secs("STOREFRONT_CACHE_TTL_SECS")?.unwrap_or(defaults.cache_ttl),
            history_limit: match std::env::var("STOREFRONT_HISTORY_LIMIT") {
                Ok(value) => parse_history_limit(&value)?,
                Err(_) => defaults.history_limit,
            },
        })
    }

    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            cache_ttl: DEFAULT_CACHE_TTL,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

fn env_secs(var: &str) -> Result<Option<Duration>> {
    match std::env::var(var) {
        Ok(value) => parse_secs(var, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_secs(var: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| EditorError::config(var, format!("expected whole seconds, got '{}'", value)))?;
    if secs == 0 {
        return Err(EditorError::config(var, "must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_history_limit(value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(EditorError::config(
            "STOREFRONT_HISTORY_LIMIT",
            "must be greater than zero",
        )),
        Ok(limit) => Ok(limit),
        Err(_) => Err(EditorError::config(
            "STOREFRONT_HISTORY_LIMIT",
            format!("expected a positive integer, got '{}'", value),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.autosave_interval, Duration::from_secs(30));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_secs("X", " 15 ").unwrap(), Duration::from_secs(15));
        assert!(parse_secs("X", "0").is_err());
        assert!(parse_secs("X", "soon").is_err());
        assert_eq!(parse_history_limit("10").unwrap(), 10);
        assert!(matches!(
            parse_history_limit("0"),
            Err(EditorError::Config { .. })
        ));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{ "history_limit": 5 }"#).unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.autosave_interval, DEFAULT_AUTOSAVE_INTERVAL);
    }
}
