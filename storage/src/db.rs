//! Sled-based persistence for blockchain data

use crate::{BlockRecord, ChainStore, StorageError, Utxo};
use std::path::Path;

/// Durable chain store backed by sled trees
#[derive(Debug, Clone)]
pub struct SledStore {
    utxos: sled::Tree,
    blocks: sled::Tree,
    db: sled::Db,
}

fn utxo_key(txid: &str, vout: u32) -> Vec<u8> {
    format!("{}:{}", txid, vout).into_bytes()
}

impl SledStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let utxos = db.open_tree("utxos")?;
        let blocks = db.open_tree("blocks")?;

        Ok(SledStore { utxos, blocks, db })
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl ChainStore for SledStore {
    fn get_utxo(&self, txid: &str, vout: u32) -> Result<Option<Utxo>, StorageError> {
        match self.utxos.get(utxo_key(txid, vout))? {
            Some(data) => {
                let utxo = bincode::deserialize(&data)
                    .map_err(|e| StorageError::SerializationError(e.to_string()))?;
                Ok(Some(utxo))
            }
            None => Ok(None),
        }
    }

    fn add_utxo(&self, utxo: Utxo) -> Result<(), StorageError> {
        let value = bincode::serialize(&utxo)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.utxos.insert(utxo_key(&utxo.txid, utxo.vout), value)?;
        self.flush()
    }

    fn remove_utxo(&self, txid: &str, vout: u32) -> Result<(), StorageError> {
        self.utxos.remove(utxo_key(txid, vout))?;
        self.flush()
    }

    fn list_utxos(&self, address: Option<&str>) -> Result<Vec<Utxo>, StorageError> {
        let mut result = Vec::new();
        for entry in self.utxos.iter() {
            let (_, data) = entry?;
            let utxo: Utxo = bincode::deserialize(&data)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            if address.map_or(true, |a| utxo.address == a) {
                result.push(utxo);
            }
        }
        Ok(result)
    }

    fn save_block(&self, record: &BlockRecord) -> Result<(), StorageError> {
        let value = bincode::serialize(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.blocks.insert(record.index.to_be_bytes(), value)?;
        self.flush()
    }

    fn load_block(&self, index: u64) -> Result<Option<BlockRecord>, StorageError> {
        match self.blocks.get(index.to_be_bytes())? {
            Some(data) => {
                let record = bincode::deserialize(&data)
                    .map_err(|e| StorageError::SerializationError(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
