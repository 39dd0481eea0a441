//! Configuration management for blocker

use crate::blockchain::{GenesisConfig, DEFAULT_GENESIS_SEED, DEFAULT_INITIAL_SUPPLY};
use crate::crypto::SEED_LEN;
use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub genesis: GenesisSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenesisSection {
    /// Hex-encoded 32 byte seed of the genesis identity.
    #[serde(default = "default_seed")]
    pub seed: String,
    #[serde(default = "default_initial_supply")]
    pub initial_supply: u64,
}

impl Default for GenesisSection {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            initial_supply: default_initial_supply(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.genesis()?;
        if self.storage.backend == StorageBackend::Sqlite && self.storage.path.is_empty() {
            return Err(ConfigError::Invalid(
                "storage.path must be set for the sqlite backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Decodes the genesis section into the value passed to chain construction.
    pub fn genesis(&self) -> Result<GenesisConfig, ConfigError> {
        let bytes = hex::decode(&self.genesis.seed)
            .map_err(|e| ConfigError::Invalid(format!("genesis.seed is not hex: {}", e)))?;
        let seed: [u8; SEED_LEN] = bytes.as_slice().try_into().map_err(|_| {
            ConfigError::Invalid(format!(
                "genesis.seed must be {} bytes, got {}",
                SEED_LEN,
                bytes.len()
            ))
        })?;
        Ok(GenesisConfig {
            seed,
            initial_supply: self.genesis.initial_supply,
        })
    }
}

/// Loads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)?;
    Config::from_toml(&config_str)
}

fn default_seed() -> String {
    hex::encode(DEFAULT_GENESIS_SEED)
}

fn default_initial_supply() -> u64 {
    DEFAULT_INITIAL_SUPPLY
}

fn default_db_path() -> String {
    "./data/blocker.db".to_string()
}

fn default_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_genesis_config() {
        let config = Config::default();
        assert_eq!(config.genesis().unwrap(), GenesisConfig::default());
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml(
            r#"
            [genesis]
            seed = "0101010101010101010101010101010101010101010101010101010101010101"
            initial_supply = 10000

            [storage]
            backend = "sqlite"
            path = "/tmp/chain.db"

            [logging]
            filter = "blocker=debug"
            "#,
        )
        .unwrap();

        let genesis = config.genesis().unwrap();
        assert_eq!(genesis.seed, [1u8; 32]);
        assert_eq!(genesis.initial_supply, 10_000);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, "/tmp/chain.db");
        assert_eq!(config.logging.filter, "blocker=debug");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.genesis.initial_supply, DEFAULT_INITIAL_SUPPLY);
    }

    #[test]
    fn test_short_seed_rejected() {
        let err = Config::from_toml("[genesis]\nseed = \"abcd\"\n").unwrap_err();
        assert!(err.to_string().contains("must be 32 bytes"));
    }

    #[test]
    fn test_non_hex_seed_rejected() {
        let err = Config::from_toml("[genesis]\nseed = \"zz\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_sqlite_requires_path() {
        let err = Config::from_toml("[storage]\nbackend = \"sqlite\"\npath = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.storage.path, "./data/blocker.db");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocker.toml");
        fs::write(&path, "[genesis]\ninitial_supply = 5\n").unwrap();
        assert_eq!(load_config(&path).unwrap().genesis.initial_supply, 5);
    }
}
