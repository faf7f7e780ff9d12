//! Chain state machine: mempool admission, block assembly, commit.
//!
//! A `Ledger` is a single logical state machine. Callers sharing one
//! across request handlers must serialize all mutating operations (chain
//! append, UTXO projection, consensus round state) behind one exclusive
//! lock; `add_block` is one atomic critical section. The PoW search is
//! the exception: build a `BlockTemplate` under the lock, then run
//! `miner::mine` outside it.

use crate::block::Block;
use crate::broadcast::{Broadcast, NoopBroadcast, EVENT_NEW_BLOCK, EVENT_NEW_TRANSACTION};
use crate::config::ChainConfig;
use crate::mempool::Mempool;
use crate::miner::BlockTemplate;
use crate::transaction::{Transaction, TxOutput, TxRejection};
use opal_consensus::engine::meets_difficulty;
use opal_consensus::{Algorithm, BlockData, ConsensusEngine};
use opal_storage::{BlockRecord, ChainStore, StorageError, Utxo};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct Ledger {
    chain: Vec<Block>,
    mempool: Mempool,
    difficulty: u32,
    last_block_time: i64,
    engine: ConsensusEngine,
    store: Arc<dyn ChainStore>,
    broadcast: Arc<dyn Broadcast>,
    config: ChainConfig,
}

impl Ledger {
    /// Create a fresh ledger: genesis is built, appended and persisted
    pub fn new(
        config: ChainConfig,
        store: Arc<dyn ChainStore>,
        broadcast: Arc<dyn Broadcast>,
    ) -> Result<Self, ChainError> {
        let engine = ConsensusEngine::new(config.consensus.clone(), store.clone());

        let genesis = Block::genesis();
        store.save_block(&block_record(&genesis))?;

        let ledger = Self {
            difficulty: config.difficulty,
            last_block_time: chrono::Utc::now().timestamp(),
            chain: vec![genesis],
            mempool: Mempool::new(),
            engine,
            store,
            broadcast,
            config,
        };

        log::info!(
            "initialized ledger with {} consensus",
            ledger.engine.algorithm()
        );
        Ok(ledger)
    }

    /// Ledger without networking, for tools and tests
    pub fn new_offline(config: ChainConfig, store: Arc<dyn ChainStore>) -> Result<Self, ChainError> {
        Self::new(config, store, Arc::new(NoopBroadcast))
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn tip(&self) -> &Block {
        // The chain always holds at least genesis
        &self.chain[self.chain.len() - 1]
    }

    pub fn height(&self) -> u64 {
        self.chain.len() as u64
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn mempool_len(&self) -> usize {
        self.mempool.len()
    }

    pub fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    /// Staking and algorithm switches mutate consensus state and must
    /// happen under the same lock as block commit
    pub fn engine_mut(&mut self) -> &mut ConsensusEngine {
        &mut self.engine
    }

    /// Spendable balance of an address: the sum of its UTXOs
    pub fn balance(&self, address: &str) -> Result<i64, ChainError> {
        let utxos = self.store.list_utxos(Some(address))?;
        Ok(utxos.iter().map(|u| u.value).sum())
    }

    /// Validate a transaction against the live UTXO projection and queue
    /// it. The duplicate check and insert are one step under the
    /// caller's exclusive lock.
    pub fn submit_tx(&mut self, tx: Transaction) -> Result<(), TxRejection> {
        tx.verify(self.store.as_ref())?;
        self.mempool.insert(tx.clone())?;

        self.broadcast.broadcast(
            EVENT_NEW_TRANSACTION,
            serde_json::to_value(&tx).unwrap_or_default(),
        );
        Ok(())
    }

    /// Build the candidate transaction list for a producer: a coinbase
    /// paying the (consensus-computed) reward, then a snapshot of the
    /// mempool. The mempool itself is untouched.
    pub fn prepare_block_for_miner(
        &self,
        producer_address: &str,
        reward: Option<i64>,
    ) -> Vec<Transaction> {
        let reward = reward.unwrap_or_else(|| {
            self.engine
                .block_reward(Some(producer_address), self.config.mining_reward)
        });

        let coinbase =
            Transaction::coinbase(vec![TxOutput::new(reward, producer_address.to_string())]);

        let mut txs = vec![coinbase];
        txs.extend(self.mempool.snapshot());

        log::info!(
            "prepared block for {} with reward {} and {} mempool txs",
            producer_address,
            reward,
            self.mempool.len()
        );
        txs
    }

    /// Snapshot everything block production needs, deciding the producer
    /// under the current consensus rules. PoS/DPoS fall back to a PoW
    /// search when no producer can be selected.
    pub fn block_template(
        &mut self,
        txs: Vec<Transaction>,
        producer_address: Option<&str>,
    ) -> BlockTemplate {
        let index = self.height();
        let prev_hash = self.tip().hash();

        let (producer, pow_search) = match self.engine.algorithm() {
            Algorithm::Pow => (None, true),
            Algorithm::Pos | Algorithm::Dpos => {
                let producer = producer_address
                    .map(str::to_string)
                    .or_else(|| self.engine.select_block_producer());
                match producer {
                    Some(p) => (Some(p), false),
                    None => {
                        log::warn!("no block producer selected, falling back to PoW");
                        (None, true)
                    }
                }
            }
        };

        BlockTemplate {
            index,
            prev_hash,
            transactions: txs,
            difficulty: self.difficulty,
            producer,
            pow_search,
        }
    }

    /// Produce a block synchronously (uncancellable). Concurrent miners
    /// should use `block_template` + `miner::mine` instead so the search
    /// runs outside the ledger lock and can be preempted.
    pub fn mine_block(&mut self, txs: Vec<Transaction>, producer_address: Option<&str>) -> Block {
        let template = self.block_template(txs, producer_address);

        if let Some(producer) = &template.producer {
            log::info!(
                "produced block {} by {} using {}",
                template.index,
                producer,
                self.engine.algorithm()
            );
        }

        let mut block = Block::new(
            template.index,
            template.prev_hash,
            template.transactions,
            0,
        );
        if template.pow_search {
            while !meets_difficulty(&block.hash(), template.difficulty) {
                block.nonce += 1;
            }
        }
        block
    }

    /// Validate and commit a block: linkage, consensus rules, then every
    /// transaction; on success append, persist, update the UTXO
    /// projection, adjust difficulty (PoW) and advance the round.
    ///
    /// Any failure before the append returns `false` with chain and UTXO
    /// state untouched.
    pub fn add_block(&mut self, block: Block, producer_address: Option<&str>) -> bool {
        if block.prev_hash != self.tip().hash() {
            log::warn!("invalid previous hash for block {}", block.index);
            return false;
        }

        let block_hash = block.hash();
        let block_data = BlockData {
            hash: block_hash.clone(),
            index: block.index,
            timestamp: block.timestamp,
        };
        if !self
            .engine
            .validate_block(&block_data, producer_address, self.difficulty)
        {
            log::warn!("block {} failed consensus validation", block.index);
            return false;
        }

        for tx in &block.transactions {
            if let Err(reason) = tx.verify(self.store.as_ref()) {
                log::warn!("invalid transaction in block {}: {}", block.index, reason);
                return false;
            }
        }

        // Commit point. Persist the record first so an in-memory chain
        // never runs ahead of the block store.
        if let Err(e) = self.store.save_block(&block_record(&block)) {
            log::error!("failed to persist block {}: {}", block.index, e);
            return false;
        }

        // UTXO projection: consumed inputs removed, new outputs added
        // under this block's own txids. A separate write from the block
        // record; not transactional with it.
        for tx in &block.transactions {
            let txid = tx.txid();
            for input in &tx.vin {
                if let Err(e) = self.store.remove_utxo(&input.txid, input.vout) {
                    log::error!("failed to remove utxo {}:{}: {}", input.txid, input.vout, e);
                }
            }
            for (i, output) in tx.vout.iter().enumerate() {
                let utxo = Utxo {
                    txid: txid.clone(),
                    vout: i as u32,
                    address: output.address.clone(),
                    value: output.value,
                };
                if let Err(e) = self.store.add_utxo(utxo) {
                    log::error!("failed to add utxo {}:{}: {}", txid, i, e);
                }
            }
        }

        let tx_count = block.transactions.len();
        let index = block.index;
        self.chain.push(block);

        let now = chrono::Utc::now().timestamp();
        if self.engine.should_adjust_difficulty() {
            let actual_time = now - self.last_block_time;
            self.difficulty = self.engine.calculate_difficulty(
                self.difficulty,
                actual_time,
                self.config.block_time_target_secs,
            );
        }
        self.last_block_time = now;

        self.engine.advance_round();

        self.broadcast.broadcast(
            EVENT_NEW_BLOCK,
            serde_json::json!({ "index": index, "hash": block_hash }),
        );

        log::info!("added block {} with {} transactions", index, tx_count);
        true
    }

    /// Drop mempool entries that were committed in a block
    pub fn clear_mempool(&mut self, included_txids: &[String]) {
        self.mempool.remove_included(included_txids);
    }
}

fn block_record(block: &Block) -> BlockRecord {
    BlockRecord {
        index: block.index,
        hash: block.hash(),
        prev_hash: block.prev_hash.clone(),
        data: block.encode(),
        nonce: block.nonce,
        timestamp: block.timestamp,
    }
}
