//! In-memory chain store

use crate::{BlockRecord, ChainStore, StorageError, Utxo};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    utxos: HashMap<(String, u32), Utxo>,
    blocks: HashMap<u64, BlockRecord>,
}

/// HashMap-backed store for tests and ephemeral nodes
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainStore for MemoryStore {
    fn get_utxo(&self, txid: &str, vout: u32) -> Result<Option<Utxo>, StorageError> {
        let inner = self.inner.read();
        Ok(inner.utxos.get(&(txid.to_string(), vout)).cloned())
    }

    fn add_utxo(&self, utxo: Utxo) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        inner.utxos.insert((utxo.txid.clone(), utxo.vout), utxo);
        Ok(())
    }

    fn remove_utxo(&self, txid: &str, vout: u32) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        inner.utxos.remove(&(txid.to_string(), vout));
        Ok(())
    }

    fn list_utxos(&self, address: Option<&str>) -> Result<Vec<Utxo>, StorageError> {
        let inner = self.inner.read();
        Ok(inner
            .utxos
            .values()
            .filter(|u| address.map_or(true, |a| u.address == a))
            .cloned()
            .collect())
    }

    fn save_block(&self, record: &BlockRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.write();
        inner.blocks.insert(record.index, record.clone());
        Ok(())
    }

    fn load_block(&self, index: u64) -> Result<Option<BlockRecord>, StorageError> {
        let inner = self.inner.read();
        Ok(inner.blocks.get(&index).cloned())
    }
}
