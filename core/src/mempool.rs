//! Mempool
//!
//! Txid-deduplicated pool of pending, input-valid-at-submission-time
//! transactions, independent of the committed chain until included in a
//! block. Insertion order is preserved for block assembly.

use crate::transaction::{Transaction, TxRejection};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
pub struct Mempool {
    /// Pending transactions by txid
    transactions: HashMap<String, Transaction>,

    /// Insertion order for block assembly
    queue: VecDeque<String>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction to the pool, rejecting duplicates by txid
    pub fn insert(&mut self, tx: Transaction) -> Result<(), TxRejection> {
        let txid = tx.txid();
        if self.transactions.contains_key(&txid) {
            return Err(TxRejection::Duplicate);
        }
        self.transactions.insert(txid.clone(), tx);
        self.queue.push_back(txid);
        Ok(())
    }

    pub fn contains(&self, txid: &str) -> bool {
        self.transactions.contains_key(txid)
    }

    /// Pending transactions in insertion order
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.queue
            .iter()
            .filter_map(|txid| self.transactions.get(txid))
            .cloned()
            .collect()
    }

    /// Drop every entry whose txid appears in the committed set
    pub fn remove_included(&mut self, included_txids: &[String]) {
        for txid in included_txids {
            self.transactions.remove(txid);
        }
        self.queue.retain(|txid| self.transactions.contains_key(txid));
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TxInput, TxOutput};

    fn test_tx(tag: u32) -> Transaction {
        Transaction::new(
            vec![TxInput::new(format!("source{}", tag), 0)],
            vec![TxOutput::new(tag as i64, "dest".to_string())],
        )
    }

    #[test]
    fn test_insert_and_snapshot_order() {
        let mut pool = Mempool::new();
        pool.insert(test_tx(1)).unwrap();
        pool.insert(test_tx(2)).unwrap();
        pool.insert(test_tx(3)).unwrap();

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0], test_tx(1));
        assert_eq!(snapshot[2], test_tx(3));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut pool = Mempool::new();
        pool.insert(test_tx(1)).unwrap();

        assert_eq!(pool.insert(test_tx(1)).unwrap_err(), TxRejection::Duplicate);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_remove_included() {
        let mut pool = Mempool::new();
        pool.insert(test_tx(1)).unwrap();
        pool.insert(test_tx(2)).unwrap();
        pool.insert(test_tx(3)).unwrap();

        pool.remove_included(&[test_tx(1).txid(), test_tx(3).txid()]);

        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&test_tx(2).txid()));
        assert_eq!(pool.snapshot(), vec![test_tx(2)]);
    }

    #[test]
    fn test_clear() {
        let mut pool = Mempool::new();
        pool.insert(test_tx(1)).unwrap();
        pool.clear();

        assert!(pool.is_empty());
        assert!(pool.snapshot().is_empty());
    }
}
