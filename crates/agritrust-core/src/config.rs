//! Configuration types for the AgriTrust ledger.

use crate::error::LedgerError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `storage.db_path`.
pub const ENV_DB_PATH: &str = "AGRITRUST_DB_PATH";

/// Environment variable overriding `logging.level`.
pub const ENV_LOG: &str = "AGRITRUST_LOG";

/// Configuration for the ledger facade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Record storage configuration.
    pub storage: StorageConfig,

    /// Registry behaviour.
    pub registry: RegistryConfig,

    /// Log output.
    pub logging: LoggingConfig,
}

/// Record storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the record database.
    pub db_path: PathBuf,

    /// Upper bound on a single storage round-trip, in milliseconds.
    pub timeout_ms: u64,

    /// Use an in-memory database instead of `db_path`.
    pub temporary: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./agritrust.db"),
            timeout_ms: 5_000,
            temporary: false,
        }
    }
}

/// Registry behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum number of records returned by a listing.
    pub list_limit: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            list_limit: agritrust_registry::registry::DEFAULT_LIST_LIMIT,
        }
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Loads a TOML file, applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Config` if the file cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Applies `AGRITRUST_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.storage.db_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.logging.level = level;
        }
    }

    /// Rejects settings the ledger cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.storage.timeout_ms == 0 {
            return Err(LedgerError::Config(
                "storage.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.registry.list_limit == 0 {
            return Err(LedgerError::Config(
                "registry.list_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Storage round-trip timeout.
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.timeout_ms)
    }

    /// In-memory configuration for tests and dry runs.
    pub fn temporary() -> Self {
        let mut config = Self::default();
        config.storage.temporary = true;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.storage.timeout_ms, 5_000);
        assert_eq!(config.registry.list_limit, 50);
        assert_eq!(config.logging.level, "info");
        assert!(!config.storage.temporary);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let config = LedgerConfig::from_toml_str(
            r#"
            [storage]
            db_path = "/var/lib/agritrust/records.db"

            [registry]
            list_limit = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.db_path, PathBuf::from("/var/lib/agritrust/records.db"));
        assert_eq!(config.storage.timeout_ms, 5_000);
        assert_eq!(config.registry.list_limit, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        assert!(matches!(
            LedgerConfig::from_toml_str("[storage\ntimeout_ms = 1"),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = LedgerConfig::default();
        config.storage.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.registry.list_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| match key {
            ENV_DB_PATH => Some("/tmp/other.db".to_string()),
            ENV_LOG => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agritrust.toml");
        std::fs::write(&path, "[storage]\ntimeout_ms = 250\n").unwrap();

        let config = LedgerConfig::load(&path).unwrap();
        assert_eq!(config.storage_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(matches!(LedgerConfig::load(&path), Err(LedgerError::Config(_))));
        assert!(LedgerConfig::load_or_default(&path).is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = LedgerConfig::temporary();
        let text = toml::to_string(&config).unwrap();
        let parsed = LedgerConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
