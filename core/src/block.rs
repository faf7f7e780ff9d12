//! Block structure and content hashing

use crate::transaction::Transaction;
use opal_crypto::sha256_hex;
use serde::{Deserialize, Serialize};

/// Previous-hash value of the genesis block
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Immutable, content-addressed container of an ordered transaction list.
///
/// Two blocks with identical fields have identical hashes. Once appended
/// to the chain a block is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub prev_hash: String,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    pub timestamp: i64,
}

impl Block {
    pub fn new(index: u64, prev_hash: String, transactions: Vec<Transaction>, nonce: u64) -> Self {
        Self {
            index,
            prev_hash,
            transactions,
            nonce,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Genesis: index 0, all-zero previous hash, one empty coinbase
    pub fn genesis() -> Self {
        Self::new(
            0,
            GENESIS_PREV_HASH.to_string(),
            vec![Transaction::coinbase(Vec::new())],
            0,
        )
    }

    /// Canonical encoding: JSON with fixed field order
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deterministic content hash over the canonical encoding of all fields
    pub fn hash(&self) -> String {
        sha256_hex(self.encode().as_bytes())
    }

    /// The coinbase, when present (by convention the first transaction)
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TxOutput;

    #[test]
    fn test_genesis_shape() {
        let genesis = Block::genesis();

        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.prev_hash, "0".repeat(64));
        assert_eq!(genesis.transactions.len(), 1);
        assert!(genesis.transactions[0].is_coinbase());
        assert!(genesis.transactions[0].vout.is_empty());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let block = Block::new(1, "aa".to_string(), vec![], 7);
        assert_eq!(block.hash(), block.clone().hash());
        assert_eq!(block.hash().len(), 64);
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = Block::new(1, "aa".to_string(), vec![], 0);

        let mut bumped_nonce = base.clone();
        bumped_nonce.nonce = 1;
        assert_ne!(base.hash(), bumped_nonce.hash());

        let mut bumped_ts = base.clone();
        bumped_ts.timestamp += 1;
        assert_ne!(base.hash(), bumped_ts.hash());

        let mut with_tx = base.clone();
        with_tx
            .transactions
            .push(Transaction::coinbase(vec![TxOutput::new(
                50,
                "miner".to_string(),
            )]));
        assert_ne!(base.hash(), with_tx.hash());
    }

    #[test]
    fn test_coinbase_accessor() {
        let block = Block::new(
            1,
            "aa".to_string(),
            vec![Transaction::coinbase(vec![TxOutput::new(
                50,
                "miner".to_string(),
            )])],
            0,
        );
        assert!(block.coinbase().is_some());

        let empty = Block::new(1, "aa".to_string(), vec![], 0);
        assert!(empty.coinbase().is_none());
    }
}
