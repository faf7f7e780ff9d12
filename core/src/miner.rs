//! Cancellable block production.
//!
//! The PoW nonce search is CPU-bound and potentially unbounded, so it
//! runs against a snapshot of the chain tip (a `BlockTemplate`) without
//! holding the ledger lock, and polls a cancel flag so a competing
//! externally-received block can preempt a futile local search.

use crate::block::Block;
use crate::transaction::Transaction;
use opal_consensus::engine::meets_difficulty;
use std::sync::atomic::{AtomicBool, Ordering};

/// Snapshot of everything block production needs from the ledger
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub index: u64,
    pub prev_hash: String,
    pub transactions: Vec<Transaction>,
    pub difficulty: u32,
    /// Selected producer under PoS/DPoS, if any
    pub producer: Option<String>,
    /// Whether a PoW nonce search is required
    pub pow_search: bool,
}

/// Produce a block from a template.
///
/// PoS/DPoS templates yield immediately with nonce 0. PoW templates
/// search nonces from 0 upward until the hash meets the difficulty
/// target; returns `None` if `cancel` is raised first.
pub fn mine(template: BlockTemplate, cancel: &AtomicBool) -> Option<Block> {
    let mut block = Block::new(template.index, template.prev_hash, template.transactions, 0);

    if !template.pow_search {
        return Some(block);
    }

    loop {
        if meets_difficulty(&block.hash(), template.difficulty) {
            return Some(block);
        }
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        block.nonce += 1;
    }
}
