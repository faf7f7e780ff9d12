//! Opal Coin Consensus
//!
//! Pluggable consensus engine over three algorithms: Proof-of-Work,
//! Proof-of-Stake and Delegated Proof-of-Stake. The engine decides who
//! may produce a block, how produced blocks are validated, how rewards
//! are computed, and when PoW difficulty adapts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod engine;
pub mod voting;

pub use engine::{BlockData, ConsensusEngine};
pub use voting::VotingSystem;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Insufficient stake: have {have}, need {need}")]
    InsufficientStake { have: u64, need: u64 },
}

/// Consensus algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Pow,
    Pos,
    Dpos,
}

impl FromStr for Algorithm {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pow" => Ok(Algorithm::Pow),
            "pos" => Ok(Algorithm::Pos),
            "dpos" => Ok(Algorithm::Dpos),
            other => Err(ConsensusError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Algorithm::Pow => write!(f, "pow"),
            Algorithm::Pos => write!(f, "pos"),
            Algorithm::Dpos => write!(f, "dpos"),
        }
    }
}

/// Consensus tunables, constructed once and passed into the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub algorithm: Algorithm,
    pub pos_stake_minimum: u64,
    pub dpos_delegates: usize,
    pub dpos_round_blocks: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Pow,
            pos_stake_minimum: 1000,
            dpos_delegates: 21,
            dpos_round_blocks: 21,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("pow".parse::<Algorithm>().unwrap(), Algorithm::Pow);
        assert_eq!("pos".parse::<Algorithm>().unwrap(), Algorithm::Pos);
        assert_eq!("dpos".parse::<Algorithm>().unwrap(), Algorithm::Dpos);
        assert!("raft".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = ConsensusConfig::default();
        assert_eq!(config.algorithm, Algorithm::Pow);
        assert_eq!(config.pos_stake_minimum, 1000);
        assert_eq!(config.dpos_delegates, 21);
        assert_eq!(config.dpos_round_blocks, 21);
    }

    #[test]
    fn test_config_from_toml() {
        let config: ConsensusConfig = toml::from_str(
            r#"
            algorithm = "dpos"
            dpos_delegates = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.algorithm, Algorithm::Dpos);
        assert_eq!(config.dpos_delegates, 3);
        // Unset keys fall back to defaults
        assert_eq!(config.pos_stake_minimum, 1000);
    }
}
