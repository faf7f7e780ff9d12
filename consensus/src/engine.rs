//! Consensus engine: producer selection, block validation, rewards and
//! difficulty policy for the active algorithm.

use crate::{Algorithm, ConsensusConfig, ConsensusError};
use opal_storage::ChainStore;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Header fields the engine needs to judge a block
#[derive(Debug, Clone)]
pub struct BlockData {
    pub hash: String,
    pub index: u64,
    pub timestamp: i64,
}

/// Single mutable consensus state machine.
///
/// Owns the validator stake registry, the delegate roster and the round
/// counter. All mutation must happen under the same synchronization
/// domain as block commit.
pub struct ConsensusEngine {
    algorithm: Algorithm,
    validators: HashMap<String, u64>,
    delegates: Vec<String>,
    current_round: u64,
    round_start_time: i64,
    config: ConsensusConfig,
    store: Arc<dyn ChainStore>,
}

impl ConsensusEngine {
    pub fn new(config: ConsensusConfig, store: Arc<dyn ChainStore>) -> Self {
        Self {
            algorithm: config.algorithm,
            validators: HashMap::new(),
            delegates: Vec::new(),
            current_round: 0,
            round_start_time: chrono::Utc::now().timestamp(),
            config,
            store,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Switch consensus algorithm. A direct state transition: future
    /// validation, selection and rewards change; history is not
    /// revalidated.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithm = algorithm;
        log::info!("switched to {} consensus", algorithm);
    }

    pub fn current_round(&self) -> u64 {
        self.current_round
    }

    pub fn round_start_time(&self) -> i64 {
        self.round_start_time
    }

    pub fn delegates(&self) -> &[String] {
        &self.delegates
    }

    /// Validate a block according to the current consensus rules.
    ///
    /// `difficulty` is the chain's live PoW target (leading zero count).
    pub fn validate_block(
        &self,
        block_data: &BlockData,
        producer: Option<&str>,
        difficulty: u32,
    ) -> bool {
        match self.algorithm {
            Algorithm::Pow => meets_difficulty(&block_data.hash, difficulty),
            Algorithm::Pos => self.validate_pos(block_data, producer),
            Algorithm::Dpos => self.validate_dpos(producer),
        }
    }

    /// Select the next block producer. `None` under PoW (open to any
    /// miner) or when no producer is eligible.
    pub fn select_block_producer(&mut self) -> Option<String> {
        match self.algorithm {
            Algorithm::Pow => None,
            Algorithm::Pos => self.select_pos_producer(),
            Algorithm::Dpos => {
                if self.delegates.is_empty() {
                    self.update_delegates();
                }
                self.round_producer().map(str::to_string)
            }
        }
    }

    /// Block reward for a producer given the configured base reward.
    ///
    /// PoS rewards are stake-weighted and floored to an integer.
    pub fn block_reward(&self, producer: Option<&str>, base_reward: i64) -> i64 {
        match self.algorithm {
            Algorithm::Pow | Algorithm::Dpos => base_reward,
            Algorithm::Pos => {
                let producer = match producer {
                    Some(p) => p,
                    None => return base_reward,
                };
                let total_stake: u64 = self.validators.values().sum();
                if total_stake == 0 {
                    return base_reward;
                }
                let stake = self.stake_of(producer);
                base_reward * stake as i64 / total_stake as i64
            }
        }
    }

    /// Stake for an address: the explicit validator stake if set, else
    /// the address's ledger balance.
    pub fn stake_of(&self, address: &str) -> u64 {
        if let Some(stake) = self.validators.get(address) {
            return *stake;
        }
        match self.store.list_utxos(Some(address)) {
            Ok(utxos) => utxos.iter().map(|u| u.value.max(0) as u64).sum(),
            Err(e) => {
                log::warn!("balance lookup failed for {}: {}", address, e);
                0
            }
        }
    }

    /// Set/overwrite the stake for an address
    pub fn update_stake(&mut self, address: &str, stake: u64) {
        self.validators.insert(address.to_string(), stake);
    }

    /// Add to an address's stake
    pub fn deposit_stake(&mut self, address: &str, amount: u64) {
        let stake = self.stake_of(address) + amount;
        self.update_stake(address, stake);
    }

    /// Withdraw part of an address's stake
    pub fn withdraw_stake(&mut self, address: &str, amount: u64) -> Result<(), ConsensusError> {
        let stake = self.stake_of(address);
        if stake < amount {
            return Err(ConsensusError::InsufficientStake {
                have: stake,
                need: amount,
            });
        }
        self.update_stake(address, stake - amount);
        Ok(())
    }

    /// Recompute the delegate roster: top-N validators by stake,
    /// descending, ties broken by address for determinism.
    pub fn update_delegates(&mut self) {
        let mut candidates: Vec<(&String, &u64)> = self.validators.iter().collect();
        candidates.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        self.delegates = candidates
            .into_iter()
            .take(self.config.dpos_delegates)
            .map(|(addr, _)| addr.clone())
            .collect();

        log::debug!("delegate roster refreshed: {:?}", self.delegates);
    }

    /// Advance to the next consensus round. Under DPoS the roster is
    /// refreshed at every `dpos_round_blocks` boundary.
    pub fn advance_round(&mut self) {
        self.current_round += 1;
        self.round_start_time = chrono::Utc::now().timestamp();

        if self.algorithm == Algorithm::Dpos
            && self.current_round % self.config.dpos_round_blocks == 0
        {
            self.update_delegates();
        }
    }

    /// Expected producer for the current round under DPoS round-robin
    pub fn round_producer(&self) -> Option<&str> {
        if self.delegates.is_empty() {
            return None;
        }
        let slot = (self.current_round / self.config.dpos_round_blocks)
            % self.delegates.len() as u64;
        Some(&self.delegates[slot as usize])
    }

    /// Only PoW adapts difficulty
    pub fn should_adjust_difficulty(&self) -> bool {
        self.algorithm == Algorithm::Pow
    }

    /// New PoW difficulty from elapsed time versus target, bounded [1, 8]
    pub fn calculate_difficulty(
        &self,
        current_difficulty: u32,
        actual_time: i64,
        target_time: i64,
    ) -> u32 {
        if self.algorithm != Algorithm::Pow || target_time <= 0 {
            return current_difficulty;
        }

        let ratio = actual_time as f64 / target_time as f64;
        if ratio < 0.75 {
            (current_difficulty + 1).min(8)
        } else if ratio > 1.25 {
            (current_difficulty - 1).max(1)
        } else {
            current_difficulty
        }
    }

    fn validate_pos(&self, block_data: &BlockData, producer: Option<&str>) -> bool {
        let producer = match producer {
            Some(p) => p,
            None => return false,
        };

        let min_stake = self.config.pos_stake_minimum.max(1);
        let stake = self.stake_of(producer);
        if stake < min_stake {
            return false;
        }

        // Stake-weighted target: hash < 2^256 / (stake / min_stake)
        let quotient = stake / min_stake;
        if quotient <= 1 {
            return true;
        }
        let bytes = match hex::decode(&block_data.hash) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let hash_bytes: [u8; 32] = match bytes.try_into() {
            Ok(array) => array,
            Err(_) => return false,
        };
        hash_below_target(&hash_bytes, quotient)
    }

    fn validate_dpos(&self, producer: Option<&str>) -> bool {
        let producer = match producer {
            Some(p) => p,
            None => return false,
        };
        if !self.delegates.iter().any(|d| d == producer) {
            return false;
        }
        self.round_producer() == Some(producer)
    }

    fn select_pos_producer(&self) -> Option<String> {
        let total_stake: u64 = self.validators.values().sum();
        if total_stake == 0 {
            return None;
        }

        // Weighted random selection
        let pick = rand::rng().random_range(0..total_stake);
        let mut current = 0u64;
        for (address, stake) in &self.validators {
            current += stake;
            if current > pick {
                return Some(address.clone());
            }
        }
        None
    }
}

/// Whether a hex hash string has the required leading run of zero chars
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    hash.len() >= difficulty as usize
        && hash.bytes().take(difficulty as usize).all(|b| b == b'0')
}

/// Compare a 32-byte big-endian hash against `2^256 / quotient`,
/// computed by schoolbook long division so no bigint is needed.
fn hash_below_target(hash: &[u8; 32], quotient: u64) -> bool {
    let q = quotient as u128;
    let mut target = [0u8; 32];
    let mut rem: u128 = 1;
    for byte in target.iter_mut() {
        rem <<= 8;
        *byte = (rem / q) as u8;
        rem %= q;
    }
    hash[..] < target[..]
}
