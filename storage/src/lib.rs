//! Opal Coin Storage Layer
//!
//! The persistence collaborator consumed by the ledger core: blocks and
//! the UTXO projection behind a narrow read/write interface. Two
//! implementations are provided, an in-memory store for tests and
//! ephemeral nodes and a sled-backed store for durable nodes.
//!
//! Block persistence and UTXO updates are separate writes; there is no
//! cross-table transaction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod db;
pub mod memory;

pub use db::SledStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::IoError(err.to_string())
    }
}

/// An unspent transaction output, uniquely keyed by `(txid, vout)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub address: String,
    pub value: i64,
}

/// Persisted block record, keyed uniquely by index.
///
/// `data` carries the canonical JSON encoding of the full block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub index: u64,
    pub hash: String,
    pub prev_hash: String,
    pub data: String,
    pub nonce: u64,
    pub timestamp: i64,
}

/// Narrow persistence contract required by the ledger core
pub trait ChainStore: Send + Sync {
    fn get_utxo(&self, txid: &str, vout: u32) -> Result<Option<Utxo>, StorageError>;

    fn add_utxo(&self, utxo: Utxo) -> Result<(), StorageError>;

    fn remove_utxo(&self, txid: &str, vout: u32) -> Result<(), StorageError>;

    /// List UTXOs, optionally restricted to one address
    fn list_utxos(&self, address: Option<&str>) -> Result<Vec<Utxo>, StorageError>;

    /// Greedy largest-first selection: returns the UTXOs covering
    /// `amount` plus their total, or `None` if the address cannot cover it
    fn select_utxos_for_amount(
        &self,
        address: &str,
        amount: i64,
    ) -> Result<Option<(Vec<Utxo>, i64)>, StorageError> {
        let mut utxos = self.list_utxos(Some(address))?;
        utxos.sort_by(|a, b| b.value.cmp(&a.value));

        let mut selected = Vec::new();
        let mut total = 0i64;
        for utxo in utxos {
            total += utxo.value;
            selected.push(utxo);
            if total >= amount {
                return Ok(Some((selected, total)));
            }
        }
        Ok(None)
    }

    fn save_block(&self, record: &BlockRecord) -> Result<(), StorageError>;

    fn load_block(&self, index: u64) -> Result<Option<BlockRecord>, StorageError>;
}
