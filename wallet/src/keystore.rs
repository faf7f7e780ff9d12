//! Named-wallet keystore.
//!
//! One JSON file is the single source of truth for every stored key;
//! loading and saving go through it alone.

use crate::wallet::{Wallet, WalletError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredKey {
    secret: String,
    address: String,
}

pub struct Keystore {
    path: PathBuf,
    entries: BTreeMap<String, StoredKey>,
}

impl Keystore {
    /// Open a keystore file, creating an empty one in memory if the file
    /// does not exist yet
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| WalletError::KeystoreCorrupt(e.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    /// Generate a wallet under `name` and persist it
    pub fn create_wallet(&mut self, name: &str) -> Result<Wallet, WalletError> {
        let wallet = Wallet::generate(name);
        self.entries.insert(
            name.to_string(),
            StoredKey {
                secret: wallet.keypair().private_key_hex(),
                address: wallet.address(),
            },
        );
        self.save()?;
        log::info!("created wallet {}", name);
        Ok(wallet)
    }

    /// Load a stored wallet by name
    pub fn get_wallet(&self, name: &str) -> Result<Wallet, WalletError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| WalletError::WalletNotFound(name.to_string()))?;
        Wallet::from_private_key_hex(name, &entry.secret)
    }

    /// Names and addresses of every stored wallet
    pub fn list(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(name, key)| (name.clone(), key.address.clone()))
            .collect()
    }

    fn save(&self) -> Result<(), WalletError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| WalletError::KeystoreCorrupt(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
