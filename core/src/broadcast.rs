//! Outbound peer notification contract.
//!
//! The transport (gossip, websockets, HTTP fan-out) lives outside the
//! core; the ledger only needs a best-effort, fire-and-forget sink.
//! Inbound deliveries re-enter through `submit_tx` / `add_block`.

use serde_json::Value;

pub const EVENT_NEW_BLOCK: &str = "new_block";
pub const EVENT_NEW_TRANSACTION: &str = "new_transaction";

/// Fan a core event out to peers. Must not block and must not fail the
/// caller; delivery is best-effort.
pub trait Broadcast: Send + Sync {
    fn broadcast(&self, event: &str, payload: Value);
}

/// Drops every event; for nodes without networking and for tests
#[derive(Debug, Default)]
pub struct NoopBroadcast;

impl Broadcast for NoopBroadcast {
    fn broadcast(&self, _event: &str, _payload: Value) {}
}

/// Forwards events into a channel; lets tests (or an in-process
/// transport) observe exactly what the ledger announced.
pub struct ChannelBroadcast {
    sender: std::sync::mpsc::Sender<(String, Value)>,
}

impl ChannelBroadcast {
    pub fn new(sender: std::sync::mpsc::Sender<(String, Value)>) -> Self {
        Self { sender }
    }
}

impl Broadcast for ChannelBroadcast {
    fn broadcast(&self, event: &str, payload: Value) {
        // A disconnected receiver is not the ledger's problem
        let _ = self.sender.send((event.to_string(), payload));
    }
}
