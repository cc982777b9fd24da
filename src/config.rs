//! Client Configuration
//!
//! Defaults, JSON files and `LUMBERJACK_*` environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::catalog::{CatalogError, TileCatalog};
use crate::board::reconcile::RebuildPolicy;
use crate::board::replay::DEFAULT_REWARD_NOTICE;
use crate::codec::Pubkey;
use crate::program::{AccountKeys, PROGRAM_ID};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file unreadable.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON.
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Environment override that does not parse.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
    /// Tile catalog failed to load.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Account addresses the client reads and writes. Derivation happens
/// elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountAddresses {
    /// Player account.
    pub player: Pubkey,
    /// Board account.
    pub board: Pubkey,
    /// Action history account.
    pub history: Pubkey,
    /// Signing wallet.
    pub signer: Pubkey,
    /// Session token, if a session key signs.
    pub session_token: Option<Pubkey>,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Lumberjack program.
    pub program_id: Pubkey,
    /// Account addresses.
    pub accounts: AccountAddresses,
    /// What to do on desync.
    pub rebuild_policy: RebuildPolicy,
    /// Reward notice lifetime in milliseconds.
    pub reward_notice_ms: u64,
    /// Outbound event channel capacity.
    pub event_capacity: usize,
    /// Inbound command channel capacity.
    pub command_capacity: usize,
    /// JSON tile catalog; the built-in one when unset.
    pub tile_catalog: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program_id: PROGRAM_ID,
            accounts: AccountAddresses::default(),
            rebuild_policy: RebuildPolicy::Automatic,
            reward_notice_ms: DEFAULT_REWARD_NOTICE.as_millis() as u64,
            event_capacity: 256,
            command_capacity: 64,
            tile_catalog: None,
        }
    }
}

impl ClientConfig {
    /// Parse JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Defaults with environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    pub fn with_overrides<F>(mut self, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        }

        if let Some(value) = var("LUMBERJACK_PROGRAM_ID") {
            self.program_id = parse("LUMBERJACK_PROGRAM_ID", value)?;
        }
        if let Some(value) = var("LUMBERJACK_PLAYER") {
            self.accounts.player = parse("LUMBERJACK_PLAYER", value)?;
        }
        if let Some(value) = var("LUMBERJACK_BOARD") {
            self.accounts.board = parse("LUMBERJACK_BOARD", value)?;
        }
        if let Some(value) = var("LUMBERJACK_HISTORY") {
            self.accounts.history = parse("LUMBERJACK_HISTORY", value)?;
        }
        if let Some(value) = var("LUMBERJACK_SIGNER") {
            self.accounts.signer = parse("LUMBERJACK_SIGNER", value)?;
        }
        if let Some(value) = var("LUMBERJACK_REBUILD_POLICY") {
            self.rebuild_policy = parse("LUMBERJACK_REBUILD_POLICY", value)?;
        }
        if let Some(value) = var("LUMBERJACK_REWARD_NOTICE_MS") {
            self.reward_notice_ms = parse("LUMBERJACK_REWARD_NOTICE_MS", value)?;
        }
        if let Some(value) = var("LUMBERJACK_EVENT_CAPACITY") {
            self.event_capacity = parse("LUMBERJACK_EVENT_CAPACITY", value)?;
        }
        if let Some(value) = var("LUMBERJACK_TILE_CATALOG") {
            self.tile_catalog = Some(PathBuf::from(value));
        }
        Ok(self)
    }

    /// Reward notice lifetime.
    pub fn reward_notice(&self) -> Duration {
        Duration::from_millis(self.reward_notice_ms)
    }

    /// Configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<TileCatalog, ConfigError> {
        match &self.tile_catalog {
            Some(path) => Ok(TileCatalog::from_json_file(path)?),
            None => Ok(TileCatalog::default()),
        }
    }

    /// Keys for instruction building.
    pub fn account_keys(&self) -> AccountKeys {
        AccountKeys {
            player: self.accounts.player,
            board: self.accounts.board,
            signer: self.accounts.signer,
            session_token: self.accounts.session_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.program_id, PROGRAM_ID);
        assert_eq!(config.rebuild_policy, RebuildPolicy::Automatic);
        assert_eq!(config.reward_notice(), DEFAULT_REWARD_NOTICE);
        assert_eq!(config.load_catalog().unwrap(), TileCatalog::default());
    }

    #[test]
    fn test_partial_json() {
        let config =
            ClientConfig::from_json(r#"{"rebuild_policy": "manual", "event_capacity": 8}"#)
                .unwrap();
        assert_eq!(config.rebuild_policy, RebuildPolicy::Manual);
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.command_capacity, 64);
    }

    #[test]
    fn test_env_overrides() {
        let config = ClientConfig::default()
            .with_overrides(vars(&[
                ("LUMBERJACK_REBUILD_POLICY", "manual"),
                ("LUMBERJACK_REWARD_NOTICE_MS", "750"),
                ("LUMBERJACK_BOARD", "3JF3sEqM796hk5WFqA6EtmEwJQ9quALszsfJyvXNQKy3"),
            ]))
            .unwrap();
        assert_eq!(config.rebuild_policy, RebuildPolicy::Manual);
        assert_eq!(config.reward_notice(), Duration::from_millis(750));
        assert_eq!(config.accounts.board, Pubkey::new([0x22; 32]));
        assert_eq!(config.account_keys().board, Pubkey::new([0x22; 32]));
    }

    #[test]
    fn test_program_id_override_takes_base58_address() {
        let config = ClientConfig::default()
            .with_overrides(vars(&[(
                "LUMBERJACK_PROGRAM_ID",
                "HsT4yX959Qh1vis8fEqoQdgrHEJuKvaWGtHoPcTjk4mJ",
            )]))
            .unwrap();
        assert_eq!(config.program_id, PROGRAM_ID);

        let hex = "22".repeat(32);
        let result =
            ClientConfig::default().with_overrides(vars(&[("LUMBERJACK_PLAYER", hex.as_str())]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key: "LUMBERJACK_PLAYER", .. })));
    }

    #[test]
    fn test_json_addresses_are_base58() {
        let config = ClientConfig::from_json(
            r#"{"accounts": {"signer": "4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi"}}"#,
        )
        .unwrap();
        assert_eq!(config.accounts.signer, Pubkey::new([1; 32]));
    }

    #[test]
    fn test_invalid_override() {
        let result =
            ClientConfig::default().with_overrides(vars(&[("LUMBERJACK_EVENT_CAPACITY", "lots")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "LUMBERJACK_EVENT_CAPACITY", .. })
        ));
    }

    #[test]
    fn test_missing_catalog_file() {
        let config = ClientConfig {
            tile_catalog: Some(PathBuf::from("/nonexistent/catalog.json")),
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.load_catalog(),
            Err(ConfigError::Catalog(CatalogError::Io(_)))
        ));
    }
}
