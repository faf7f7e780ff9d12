//! Opal Coin Wallet Module
//!
//! Key management and transaction building against the chain store:
//! named keypairs in a single JSON keystore, balance lookup, and
//! transfer construction with greedy UTXO selection and change.

pub mod keystore;
pub mod wallet;

pub use keystore::Keystore;
pub use wallet::{Wallet, WalletError};
