//! End-to-end ledger flows: mining, commit, UTXO projection, double
//! spends and peer announcements.

use opal_core::transaction::{Transaction, TxInput, TxOutput};
use opal_core::{ChainConfig, ChannelBroadcast, Ledger};
use opal_crypto::{KeyPair, SignatureScheme};
use opal_storage::{ChainStore, MemoryStore};
use std::sync::Arc;

fn pow_config(difficulty: u32) -> ChainConfig {
    ChainConfig {
        difficulty,
        ..Default::default()
    }
}

#[test]
fn fresh_ledger_has_genesis_only() {
    let ledger = Ledger::new_offline(pow_config(2), Arc::new(MemoryStore::new())).unwrap();

    assert_eq!(ledger.height(), 1);
    let genesis = &ledger.chain()[0];
    assert_eq!(genesis.prev_hash, "0".repeat(64));
    assert_eq!(genesis.transactions.len(), 1);
    assert!(genesis.transactions[0].vin.is_empty());
    assert!(genesis.transactions[0].vout.is_empty());
}

#[test]
fn pow_mine_at_difficulty_two_commits_and_projects_utxos() {
    let store = Arc::new(MemoryStore::new());
    let mut ledger = Ledger::new_offline(pow_config(2), store.clone()).unwrap();

    let miner = KeyPair::generate();
    let txs = ledger.prepare_block_for_miner(&miner.public_key_hex(), None);
    let block = ledger.mine_block(txs, None);

    assert!(block.hash().starts_with("00"));
    assert!(ledger.add_block(block, None));
    assert_eq!(ledger.height(), 2);

    // The coinbase output is the only UTXO; nothing was consumed
    let utxos = store.list_utxos(None).unwrap();
    assert_eq!(utxos.len(), 1);
    assert_eq!(utxos[0].value, 50);
    assert_eq!(utxos[0].address, miner.public_key_hex());
}

#[test]
fn chain_linkage_holds_across_commits() {
    let mut ledger = Ledger::new_offline(pow_config(1), Arc::new(MemoryStore::new())).unwrap();

    for _ in 0..3 {
        let txs = ledger.prepare_block_for_miner("miner", Some(10));
        let block = ledger.mine_block(txs, None);
        assert!(ledger.add_block(block, None));
    }

    let chain = ledger.chain();
    for i in 1..chain.len() {
        assert_eq!(chain[i].prev_hash, chain[i - 1].hash());
    }
}

#[test]
fn spend_moves_value_and_double_spend_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let mut ledger = Ledger::new_offline(pow_config(1), store.clone()).unwrap();

    let alice = KeyPair::generate();
    let bob = KeyPair::generate();

    // Fund alice via a mined coinbase
    let txs = ledger.prepare_block_for_miner(&alice.public_key_hex(), None);
    let block = ledger.mine_block(txs, None);
    assert!(ledger.add_block(block, None));
    let coinbase_txid = ledger.tip().transactions[0].txid();

    // First spend of the coinbase output
    let mut spend = Transaction::new(
        vec![TxInput::new(coinbase_txid.clone(), 0)],
        vec![TxOutput::new(50, bob.public_key_hex())],
    );
    spend.sign_input(0, &alice, SignatureScheme::Ecdsa).unwrap();
    ledger.submit_tx(spend.clone()).unwrap();

    let mut txs = ledger.prepare_block_for_miner(&alice.public_key_hex(), None);
    assert_eq!(txs.len(), 2);
    let block = ledger.mine_block(txs.clone(), None);
    assert!(ledger.add_block(block, None));
    ledger.clear_mempool(&[spend.txid()]);

    // The spent output is gone; bob owns the new one
    assert!(store.get_utxo(&coinbase_txid, 0).unwrap().is_none());
    assert_eq!(ledger.balance(&bob.public_key_hex()).unwrap(), 50);

    // Second spend of the same (txid, vout) must fail
    let mut double_spend = Transaction::new(
        vec![TxInput::new(coinbase_txid.clone(), 0)],
        vec![TxOutput::new(50, alice.public_key_hex())],
    );
    double_spend
        .sign_input(0, &alice, SignatureScheme::Ecdsa)
        .unwrap();

    let err = ledger.submit_tx(double_spend.clone()).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("UTXO not found {}:0", coinbase_txid)
    );

    // A block carrying it is rejected wholesale too
    txs = ledger.prepare_block_for_miner(&alice.public_key_hex(), None);
    txs.push(double_spend);
    let block = ledger.mine_block(txs, None);
    assert!(!ledger.add_block(block, None));
}

#[test]
fn utxo_conservation_across_a_block() {
    let store = Arc::new(MemoryStore::new());
    let mut ledger = Ledger::new_offline(pow_config(1), store.clone()).unwrap();

    let alice = KeyPair::generate();
    let txs = ledger.prepare_block_for_miner(&alice.public_key_hex(), None);
    let block = ledger.mine_block(txs, None);
    assert!(ledger.add_block(block, None));
    let coinbase_txid = ledger.tip().transactions[0].txid();

    let mut spend = Transaction::new(
        vec![TxInput::new(coinbase_txid.clone(), 0)],
        vec![
            TxOutput::new(30, "bob".to_string()),
            TxOutput::new(20, alice.public_key_hex()),
        ],
    );
    spend.sign_input(0, &alice, SignatureScheme::Ecdsa).unwrap();
    ledger.submit_tx(spend.clone()).unwrap();

    let before: Vec<_> = store.list_utxos(None).unwrap();
    let txs = ledger.prepare_block_for_miner(&alice.public_key_hex(), Some(10));
    let block = ledger.mine_block(txs, None);
    assert!(ledger.add_block(block, None));

    // after == before - inputs + outputs
    let after = store.list_utxos(None).unwrap();
    assert_eq!(after.len(), before.len() - 1 + 2 + 1);
    assert!(after.iter().all(|u| u.txid != coinbase_txid));

    let spend_txid = spend.txid();
    let spent_outputs: Vec<_> = after.iter().filter(|u| u.txid == spend_txid).collect();
    assert_eq!(spent_outputs.len(), 2);
}

#[test]
fn fast_blocks_raise_difficulty_up_to_cap() {
    let mut ledger = Ledger::new_offline(pow_config(1), Arc::new(MemoryStore::new())).unwrap();
    assert_eq!(ledger.difficulty(), 1);

    // Committing instantly against a 600s target rates as "too fast"
    let txs = ledger.prepare_block_for_miner("miner", Some(10));
    let block = ledger.mine_block(txs, None);
    assert!(ledger.add_block(block, None));

    assert_eq!(ledger.difficulty(), 2);
}

#[test]
fn sled_backed_ledger_persists_blocks_and_utxos() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(opal_storage::SledStore::open(dir.path().join("chain")).unwrap());
    let mut ledger = Ledger::new_offline(pow_config(1), store.clone()).unwrap();

    let miner = KeyPair::generate();
    let txs = ledger.prepare_block_for_miner(&miner.public_key_hex(), None);
    let block = ledger.mine_block(txs, None);
    let expected_hash = block.hash();
    assert!(ledger.add_block(block, None));

    let record = store.load_block(1).unwrap().unwrap();
    assert_eq!(record.hash, expected_hash);
    assert_eq!(record.prev_hash, ledger.chain()[0].hash());
    assert!(record.data.contains("\"transactions\""));

    assert_eq!(ledger.balance(&miner.public_key_hex()).unwrap(), 50);
}

#[test]
fn commit_and_submission_are_announced() {
    let (sender, receiver) = std::sync::mpsc::channel();
    let store = Arc::new(MemoryStore::new());
    let mut ledger = Ledger::new(
        pow_config(1),
        store,
        Arc::new(ChannelBroadcast::new(sender)),
    )
    .unwrap();

    let alice = KeyPair::generate();
    let txs = ledger.prepare_block_for_miner(&alice.public_key_hex(), None);
    let block = ledger.mine_block(txs, None);
    assert!(ledger.add_block(block, None));

    let (event, payload) = receiver.try_recv().unwrap();
    assert_eq!(event, "new_block");
    assert_eq!(payload["index"], 1);

    let coinbase_txid = ledger.tip().transactions[0].txid();
    let mut spend = Transaction::new(
        vec![TxInput::new(coinbase_txid, 0)],
        vec![TxOutput::new(50, "bob".to_string())],
    );
    spend.sign_input(0, &alice, SignatureScheme::Ecdsa).unwrap();
    ledger.submit_tx(spend).unwrap();

    let (event, _) = receiver.try_recv().unwrap();
    assert_eq!(event, "new_transaction");
}
