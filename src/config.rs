// 🔧 Engine Configuration - Defaults overridable from the environment
//
// FIB_TRUST_DB_PATH             SQLite snapshot database
// FIB_TRUST_LOG_LEVEL           error | warn | info | debug | trace
// FIB_TRUST_CACHE_TTL_SECS      snapshot cache expiry
// FIB_TRUST_DEFAULT_ALLOCATION  units for ledger entries created during replay

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite snapshot database
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a cached snapshot stays fresh; renewed on every hit
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Allocation given to units created implicitly during replay
    pub default_allocation: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "fibonacci_trust.db".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            cache: CacheConfig { ttl_secs: 300 },
            ledger: LedgerConfig {
                default_allocation: 1000,
            },
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// One day
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

impl EngineConfig {
    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("FIB_TRUST_DB_PATH") {
            config.database.path = path;
        }

        if let Some(level) = lookup("FIB_TRUST_LOG_LEVEL") {
            config.logging.level = level.to_lowercase();
        }

        if let Some(ttl) = lookup("FIB_TRUST_CACHE_TTL_SECS") {
            config.cache.ttl_secs = ttl
                .parse()
                .context("Invalid FIB_TRUST_CACHE_TTL_SECS value")?;
        }

        if let Some(units) = lookup("FIB_TRUST_DEFAULT_ALLOCATION") {
            config.ledger.default_allocation = units
                .parse()
                .context("Invalid FIB_TRUST_DEFAULT_ALLOCATION value")?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("Database path must not be empty"));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Unknown log level '{}', expected one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(anyhow::anyhow!("Cache TTL must be at least one second"));
        }
        if self.cache.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(anyhow::anyhow!(
                "Cache TTL {}s exceeds the maximum of {}s",
                self.cache.ttl_secs,
                MAX_CACHE_TTL_SECS
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("FIB_TRUST_DB_PATH", "/tmp/trust.db"),
            ("FIB_TRUST_LOG_LEVEL", "DEBUG"),
            ("FIB_TRUST_CACHE_TTL_SECS", "60"),
            ("FIB_TRUST_DEFAULT_ALLOCATION", "144"),
        ]))
        .unwrap();

        assert_eq!(config.database.path, "/tmp/trust.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.ledger.default_allocation, 144);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_ttl = EngineConfig::from_lookup(lookup_from(&[("FIB_TRUST_CACHE_TTL_SECS", "soon")]));
        assert!(bad_ttl.is_err());

        let bad_level = EngineConfig::from_lookup(lookup_from(&[("FIB_TRUST_LOG_LEVEL", "loud")]));
        assert!(bad_level.is_err());

        let zero_ttl = EngineConfig::from_lookup(lookup_from(&[("FIB_TRUST_CACHE_TTL_SECS", "0")]));
        assert!(zero_ttl.is_err());

        let huge_ttl = EngineConfig::from_lookup(lookup_from(&[(
            "FIB_TRUST_CACHE_TTL_SECS",
            "10000000000000000",
        )]));
        assert!(huge_ttl.is_err());

        let one_day = EngineConfig::from_lookup(lookup_from(&[("FIB_TRUST_CACHE_TTL_SECS", "86400")]));
        assert!(one_day.is_ok());
    }
}
