//! Chain configuration
//!
//! An explicit value constructed once and passed into the ledger and
//! consensus engine constructors; no process-wide implicit state.

use opal_consensus::ConsensusConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Initial PoW difficulty (leading zero hex chars)
    pub difficulty: u32,

    /// Target interval between blocks, seconds
    pub block_time_target_secs: i64,

    /// Base block reward
    pub mining_reward: i64,

    pub consensus: ConsensusConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: 4,
            block_time_target_secs: 600,
            mining_reward: 50,
            consensus: ConsensusConfig::default(),
        }
    }
}

impl ChainConfig {
    /// Load configuration from a TOML file, unset keys falling back to
    /// defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
