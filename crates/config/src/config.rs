// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

use std::{path::PathBuf, time::Duration};

use bip39::Mnemonic;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use serde_with::{serde_as, DurationSecondsWithFrac};

const ENV_PREFIX: &str = "ATTESTOR_";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub agent: AgentConfig,
    pub ledger: LedgerConfig,
    pub metrics: MetricsConfig,
}

// Newtype wrapping Config to be able use serde_ignored with Figment
#[derive(Debug)]
pub struct ConfigWrapper(pub Config);

// Custom Deserializer for ConfigWrapper
// This is needed to warn about unknown fields
impl<'de> Deserialize<'de> for ConfigWrapper {
    fn deserialize<D>(deserializer: D) -> Result<ConfigWrapper, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let config: Config = serde_ignored::deserialize(deserializer, |path| {
            tracing::warn!("Ignoring unknown configuration field: {}", path);
        })?;

        Ok(ConfigWrapper(config))
    }
}

impl Config {
    pub fn parse(filename: Option<&PathBuf>) -> Result<Self, String> {
        let config_defaults = include_str!("default_values.toml");

        let mut figment_config = Figment::new().merge(Toml::string(config_defaults));

        if let Some(path) = filename {
            let config_content = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config file: {e}"))?;
            figment_config = figment_config.merge(Toml::string(&config_content));
        }

        let config: ConfigWrapper = figment_config
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| e.to_string())?;

        config.0.validate()?;
        Ok(config.0)
    }

    fn validate(&self) -> Result<(), String> {
        if self.agent.poll_interval.is_zero() {
            return Err("`agent.poll_interval` must be greater than zero".to_string());
        }
        if self.agent.max_scan_window == 0 {
            return Err("`agent.max_scan_window` must be at least 1".to_string());
        }
        if self.ledger.expiry_threshold == 0 {
            return Err("`ledger.expiry_threshold` must be at least 1".to_string());
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// BIP-39 phrase the operator key is derived from.
    pub mnemonic: Mnemonic,
    /// Account index of the operator key under the mnemonic.
    pub key_index: u32,
    /// How often each category's scan loop polls for new tasks.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub poll_interval: Duration,
    /// Maximum positions covered by one creation-events query; larger gaps
    /// are worked off across multiple polls.
    pub max_scan_window: u64,
}

#[derive(Debug, Deserialize)]
pub struct LedgerConfig {
    /// Task age limit in ledger positions.
    pub expiry_threshold: u64,
    /// Credential result freshness window in seconds.
    pub credential_validity: u64,
}

#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    pub port: u16,
}
