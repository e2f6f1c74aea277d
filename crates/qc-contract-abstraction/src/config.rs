//! Runtime configuration with validation.
//!
//! Supplied by the embedding application (endpoint wiring lives there);
//! everything here has a working default.

use crate::domain::params::TxParams;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Receipt polling
    pub sync: SyncConfig,
    /// Network detection
    pub networks: NetworkConfig,
    /// Class-level default transaction parameters
    pub defaults: TxParams,
}

impl RuntimeConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sync.validate()?;

        if self.networks.main_aliases.is_empty() {
            return Err(ConfigError::NoMainAliases);
        }

        Ok(())
    }
}

/// Receipt polling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Give up after this long without a receipt (0 = never)
    pub timeout_ms: u64,
    /// Delay between receipt queries
    pub poll_interval_ms: u64,
    /// Hard cap on receipt queries, independent of time
    pub max_attempts: Option<u32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 240_000,
            poll_interval_ms: 1_000,
            max_attempts: None,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        Ok(())
    }

    /// `None` when the timeout is disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Network detection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Id the provider reports for the main network
    pub main_network_id: String,
    /// Table keys probed, in order, when the main network is reported
    pub main_aliases: Vec<String>,
    /// Record loaded at class creation, before detection
    pub bootstrap_network: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            main_network_id: "1".into(),
            main_aliases: vec!["1".into(), "live".into(), "default".into()],
            bootstrap_network: crate::domain::artifact::DEFAULT_NETWORK.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.sync.timeout(), Some(Duration::from_secs(240)));
        assert_eq!(config.sync.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.networks.main_aliases, vec!["1", "live", "default"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_disables() {
        let sync = SyncConfig {
            timeout_ms: 0,
            ..SyncConfig::default()
        };
        assert_eq!(sync.timeout(), None);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = RuntimeConfig::from_json_str(
            r#"{"sync": {"timeout_ms": 5000}, "defaults": {"gas": "0x3d0900"}}"#,
        )
        .unwrap();
        assert_eq!(config.sync.timeout_ms, 5000);
        assert_eq!(config.sync.poll_interval_ms, 1000);
        assert_eq!(config.defaults.gas, Some(crate::domain::U256::from(4_000_000u64)));
    }

    #[test]
    fn test_validation_failures() {
        assert_eq!(
            RuntimeConfig::from_json_str(r#"{"sync": {"poll_interval_ms": 0}}"#),
            Err(ConfigError::ZeroPollInterval)
        );
        assert_eq!(
            RuntimeConfig::from_json_str(r#"{"sync": {"max_attempts": 0}}"#),
            Err(ConfigError::ZeroMaxAttempts)
        );
        assert_eq!(
            RuntimeConfig::from_json_str(r#"{"networks": {"main_aliases": []}}"#),
            Err(ConfigError::NoMainAliases)
        );
        assert!(matches!(
            RuntimeConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
