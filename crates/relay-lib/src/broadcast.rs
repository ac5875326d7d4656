// ============================
// crates/relay-lib/src/broadcast.rs
// ============================
//! Broadcast router: pure addressing over per-connection outbound queues.
//!
//! No business logic lives here. Each connection has one ordered queue, so
//! delivery order always matches the calling sequence.
use chat_relay_common::{ConnectionId, ServerEvent};
use std::sync::Arc;

use crate::registry::{ConnectionRegistry, Outbound};

#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver an event to a single connection. Sends to connections that
    /// already dropped their queue are ignored.
    pub fn to_one(&self, id: ConnectionId, event: ServerEvent) {
        if let Some(tx) = self.registry.sender(id) {
            let _ = tx.send(Outbound::Event(event));
        }
    }

    /// Deliver an event to every listed connection.
    pub fn to_room(&self, ids: &[ConnectionId], event: &ServerEvent) {
        for id in ids {
            self.to_one(*id, event.clone());
        }
    }

    /// Deliver an event to every listed connection except one.
    pub fn to_room_except(
        &self,
        ids: &[ConnectionId],
        excluded: ConnectionId,
        event: &ServerEvent,
    ) {
        for id in ids {
            if *id != excluded {
                self.to_one(*id, event.clone());
            }
        }
    }

    /// Queue the terminal close marker. Everything sent before it is still
    /// delivered first.
    pub fn close(&self, id: ConnectionId) {
        if let Some(tx) = self.registry.sender(id) {
            let _ = tx.send(Outbound::Close);
        }
    }
}
