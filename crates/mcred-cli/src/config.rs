//! # CLI Configuration
//!
//! An optional YAML file supplies defaults; the environment overrides it.
//!
//! ```yaml
//! backend:
//!   backend_url: https://registrar.example.edu/api/
//!   verifier_url: https://verify.example.edu
//!   timeout_secs: 15
//! ledger:
//!   rpc_url: https://sepolia.example.org
//!   registry_address: "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e"
//!   chain_id: 11155111
//!   publisher_address: "0x4242424242424242424242424242424242424242"
//! workflow:
//!   confirmation_timeout: 180
//!   poll_interval: 3
//! publish:
//!   state_file: /var/lib/mcred/state.json
//! ```
//!
//! The API token is read from `MCRED_API_TOKEN` only.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mcred_anchor::EvmLedgerConfig;
use mcred_client::IssuerApiConfig;
use mcred_state::WorkflowConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSection {
    pub backend_url: Option<String>,
    pub verifier_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerSection {
    pub rpc_url: Option<String>,
    pub registry_address: Option<String>,
    pub chain_id: Option<u64>,
    pub publisher_address: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishSection {
    pub state_file: Option<PathBuf>,
}

/// Used when neither `MCRED_STATE_FILE` nor `publish.state_file` is set.
pub const DEFAULT_STATE_FILE: &str = ".mcred-state.json";

/// Contents of the `--config` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub backend: BackendSection,
    pub ledger: LedgerSection,
    pub workflow: WorkflowConfig,
    pub publish: PublishSection,
}

impl CliConfig {
    /// Read the config file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// The file's value for an environment variable name.
    fn file_value(&self, name: &str) -> Option<String> {
        let b = &self.backend;
        let l = &self.ledger;
        match name {
            "MCRED_BACKEND_URL" => b.backend_url.clone(),
            "MCRED_VERIFIER_URL" => b.verifier_url.clone(),
            "MCRED_TIMEOUT_SECS" => b.timeout_secs.map(|s| s.to_string()),
            "MCRED_RPC_URL" => l.rpc_url.clone(),
            "MCRED_REGISTRY_ADDRESS" => l.registry_address.clone(),
            "MCRED_CHAIN_ID" => l.chain_id.map(|c| c.to_string()),
            "MCRED_PUBLISHER_ADDRESS" => l.publisher_address.clone(),
            "MCRED_RPC_TIMEOUT_SECS" => l.timeout_secs.map(|s| s.to_string()),
            "MCRED_STATE_FILE" => self
                .publish
                .state_file
                .as_ref()
                .map(|p| p.display().to_string()),
            _ => None,
        }
    }

    /// `env` first, then the file.
    fn resolve(&self, env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
        env(name).or_else(|| self.file_value(name))
    }

    pub fn issuer_api(&self) -> Result<IssuerApiConfig> {
        self.issuer_api_with(&|name| std::env::var(name).ok())
    }

    fn issuer_api_with(&self, env: &dyn Fn(&str) -> Option<String>) -> Result<IssuerApiConfig> {
        IssuerApiConfig::from_lookup(|name| self.resolve(env, name))
            .context("invalid issuer API configuration")
    }

    /// Where `mcred publish` keeps transactions it could not resolve.
    pub fn state_file(&self) -> PathBuf {
        self.state_file_with(&|name| std::env::var(name).ok())
    }

    fn state_file_with(&self, env: &dyn Fn(&str) -> Option<String>) -> PathBuf {
        self.resolve(env, "MCRED_STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE))
    }

    pub fn ledger(&self) -> Result<EvmLedgerConfig> {
        self.ledger_with(&|name| std::env::var(name).ok())
    }

    fn ledger_with(&self, env: &dyn Fn(&str) -> Option<String>) -> Result<EvmLedgerConfig> {
        EvmLedgerConfig::from_lookup(|name| self.resolve(env, name))
            .context("invalid ledger configuration")
    }
}
