//! Configuration Management Module
//!
//! Loads the client's connection settings from a TOML file. The RPC endpoint
//! and the escrow program id are the only things the client needs to know
//! about its deployment.

use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};

use crate::codec::parse_address;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "TOKEN_ESCROW_CONFIG_PATH";

/// Configuration file used when neither a path nor the env var is given
pub const DEFAULT_CONFIG_PATH: &str = "config/token_escrow.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Connection settings for one escrow program deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// RPC endpoint (e.g., "http://localhost:8899")
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Escrow program id (base58)
    pub program_id: String,
    /// Commitment level used for reads and confirmation
    #[serde(default)]
    pub commitment: Commitment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl From<Commitment> for CommitmentConfig {
    fn from(commitment: Commitment) -> Self {
        match commitment {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

fn default_rpc_url() -> String {
    "http://localhost:8899".to_string()
}

impl ClientConfig {
    /// Builds a configuration from values given on the command line.
    pub fn new(rpc_url: Option<String>, program_id: String) -> Self {
        Self {
            rpc_url: rpc_url.unwrap_or_else(default_rpc_url),
            program_id,
            commitment: Commitment::default(),
        }
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Optional path to config file. If None, uses TOKEN_ESCROW_CONFIG_PATH env var
    ///   or default.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(ClientConfig))` - Parsed configuration, not yet validated so that
    ///   command-line overrides can still replace placeholder values
    /// * `Ok(None)` - No file at the resolved path
    /// * `Err(anyhow::Error)` - File unreadable or not valid TOML
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Option<Self>> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if !std::path::Path::new(&config_path).exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&config_path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(Some(config))
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides on top of the file values.
    pub fn with_overrides(mut self, rpc_url: Option<String>, program_id: Option<String>) -> Self {
        if let Some(rpc_url) = rpc_url {
            self.rpc_url = rpc_url;
        }
        if let Some(program_id) = program_id {
            self.program_id = program_id;
        }
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc_url.trim().is_empty() {
            anyhow::bail!("Configuration error: rpc_url must not be empty");
        }
        parse_address(&self.program_id).map_err(|_| {
            anyhow::anyhow!("Configuration error: invalid program_id '{}'", self.program_id)
        })?;
        Ok(())
    }

    pub fn program_id(&self) -> anyhow::Result<Pubkey> {
        Ok(parse_address(&self.program_id)?)
    }

    pub fn commitment_config(&self) -> CommitmentConfig {
        self.commitment.into()
    }
}
