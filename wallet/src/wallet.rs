//! Wallet: a named keypair plus transaction building

use opal_core::transaction::{SigningError, Transaction, TxInput, TxOutput};
use opal_crypto::{CryptoError, KeyPair, SignatureScheme};
use opal_storage::{ChainStore, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("keystore corrupt: {0}")]
    KeystoreCorrupt(String),

    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: i64, need: i64 },

    #[error("invalid amount: {0}")]
    InvalidAmount(i64),
}

/// A named keypair. The address is the public key hex, which is also
/// what UTXO ownership and signature verification are bound to.
pub struct Wallet {
    name: String,
    keypair: KeyPair,
}

impl Wallet {
    /// Create a wallet with a fresh random keypair
    pub fn generate(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keypair: KeyPair::generate(),
        }
    }

    pub fn from_private_key_hex(name: &str, secret_hex: &str) -> Result<Self, WalletError> {
        Ok(Self {
            name: name.to_string(),
            keypair: KeyPair::from_private_key_hex(secret_hex)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> String {
        self.keypair.public_key_hex()
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Spendable balance: the sum of this wallet's UTXOs
    pub fn balance(&self, store: &dyn ChainStore) -> Result<i64, WalletError> {
        let utxos = store.list_utxos(Some(&self.address()))?;
        Ok(utxos.iter().map(|u| u.value).sum())
    }

    /// Build a signed transfer of `amount` to `to`.
    ///
    /// Inputs are chosen greedily (largest first); any excess over the
    /// amount is returned to this wallet as a change output. Every input
    /// is signed over the whole transaction.
    pub fn build_transfer(
        &self,
        store: &dyn ChainStore,
        to: &str,
        amount: i64,
        scheme: SignatureScheme,
    ) -> Result<Transaction, WalletError> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let address = self.address();
        let (selected, total) = store
            .select_utxos_for_amount(&address, amount)?
            .ok_or_else(|| WalletError::InsufficientFunds {
                have: self.balance(store).unwrap_or(0),
                need: amount,
            })?;

        let vin = selected
            .iter()
            .map(|u| TxInput::new(u.txid.clone(), u.vout))
            .collect();

        let mut vout = vec![TxOutput::new(amount, to.to_string())];
        let change = total - amount;
        if change > 0 {
            vout.push(TxOutput::new(change, address));
        }

        let mut tx = Transaction::new(vin, vout);
        for index in 0..tx.vin.len() {
            tx.sign_input(index, &self.keypair, scheme)?;
        }

        log::debug!("built transfer {} -> {} for {}", self.name, to, amount);
        Ok(tx)
    }
}
