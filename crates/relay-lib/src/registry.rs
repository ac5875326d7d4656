// ============================
// crates/relay-lib/src/registry.rs
// ============================
//! Connection registry: live connections and their metadata.
use chat_relay_common::{ConnectionId, ServerEvent};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Item on a connection's ordered outbound queue
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Wire event to deliver
    Event(ServerEvent),
    /// Terminal marker: the transport closes the session after draining
    /// everything queued before it
    Close,
}

pub type OutboundSender = mpsc::UnboundedSender<Outbound>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// Metadata for one live connection
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Display name, set once per session via `setUsername`
    pub name: Option<String>,
    /// Room the connection has joined, if any
    pub room: Option<String>,
    /// True iff the room directory's admin pointer equals this connection
    pub is_admin: bool,
    /// Outbound queue owned by the transport task
    pub tx: OutboundSender,
}

/// Tracks every live connection for the process
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionInfo>,
}

impl ConnectionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connections: DashMap::new(),
        })
    }

    /// Register a freshly connected transport session.
    pub fn insert(&self, id: ConnectionId, tx: OutboundSender) {
        self.connections.insert(
            id,
            ConnectionInfo {
                name: None,
                room: None,
                is_admin: false,
                tx,
            },
        );
    }

    /// Drop a connection, returning its last known metadata.
    pub fn remove(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections.remove(&id).map(|(_, info)| info)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections.get(&id).map(|e| e.value().clone())
    }

    pub fn sender(&self, id: ConnectionId) -> Option<OutboundSender> {
        self.connections.get(&id).map(|e| e.value().tx.clone())
    }

    pub fn set_room(&self, id: ConnectionId, room: Option<String>) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.room = room;
        }
    }

    pub fn set_name(&self, id: ConnectionId, name: String) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.name = Some(name);
        }
    }

    pub fn set_admin(&self, id: ConnectionId, is_admin: bool) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.is_admin = is_admin;
        }
    }

    /// Reset the per-room session fields while keeping the connection
    /// alive. Used when a connection rejoins into a different room.
    pub fn clear_session(&self, id: ConnectionId) {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.name = None;
            entry.room = None;
            entry.is_admin = false;
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
