//! Opal Coin Core Library
//!
//! The ledger consensus core: UTXO transactions, blocks, the chain state
//! machine and block production. Persistence, networking and consensus
//! policy are consumed through the narrow contracts in `opal-storage`,
//! [`broadcast`] and `opal-consensus`.

pub mod block;
pub mod broadcast;
pub mod chain;
pub mod config;
pub mod mempool;
pub mod miner;
pub mod transaction;

pub use block::{Block, GENESIS_PREV_HASH};
pub use broadcast::{Broadcast, ChannelBroadcast, NoopBroadcast};
pub use chain::{ChainError, Ledger};
pub use config::{ChainConfig, ConfigError};
pub use mempool::Mempool;
pub use miner::BlockTemplate;
pub use transaction::{SigningError, Transaction, TxInput, TxOutput, TxRejection};
