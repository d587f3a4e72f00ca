use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chain_sol::sol_to_lamports;
use serde::{Deserialize, Serialize};
use sol_rpc::{Cluster, Commitment, ConfirmationPolicy, RpcConfig};
use thiserror::Error;

use crate::transfer::TransferAmounts;

pub const CLUSTER_ENV: &str = "PHANTOM_CONNECT_CLUSTER";
pub const SURFACE_ERRORS_ENV: &str = "PHANTOM_CONNECT_SURFACE_ERRORS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cluster: Cluster,
    pub airdrop_sol: f64,
    pub transfer_sol: f64,
    pub commitment: Commitment,
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub http_timeout_secs: u64,
    /// Show action failures on screen instead of only logging them.
    pub surface_errors: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            airdrop_sol: 2.0,
            transfer_sol: 0.1,
            commitment: Commitment::Confirmed,
            confirm_timeout_secs: 30,
            poll_interval_ms: 500,
            http_timeout_secs: 30,
            surface_errors: false,
        }
    }
}

impl AppConfig {
    /// Defaults, then the JSON file if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(cluster) = lookup(CLUSTER_ENV) {
            self.cluster = cluster.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(flag) = lookup(SURFACE_ERRORS_ENV) {
            self.surface_errors = matches!(flag.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Float-to-int casts saturate, so NaN and negatives land on 0 too.
        if sol_to_lamports(self.transfer_sol) == 0 {
            return Err(ConfigError::Invalid("transfer_sol must be at least one lamport".into()));
        }
        if sol_to_lamports(self.airdrop_sol) == 0 {
            return Err(ConfigError::Invalid("airdrop_sol must be at least one lamport".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be non-zero".into()));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid("http_timeout_secs must be non-zero".into()));
        }
        Ok(())
    }

    pub fn amounts(&self) -> TransferAmounts {
        TransferAmounts {
            airdrop_lamports: sol_to_lamports(self.airdrop_sol),
            transfer_lamports: sol_to_lamports(self.transfer_sol),
        }
    }

    pub fn rpc_config(&self) -> RpcConfig {
        let poll_interval = Duration::from_millis(self.poll_interval_ms.max(1));
        let timeout_ms = self.confirm_timeout_secs.saturating_mul(1000);
        let max_polls = (timeout_ms / self.poll_interval_ms.max(1)).max(1);
        RpcConfig {
            http_timeout: Duration::from_secs(self.http_timeout_secs),
            confirmation: ConfirmationPolicy {
                commitment: self.commitment,
                poll_interval,
                max_polls: u32::try_from(max_polls).unwrap_or(u32::MAX),
            },
        }
    }
}
