// ============================
// chat-relay-lib/src/lib.rs
// ============================
//! Core functionality for the chat relay WebSocket server.

pub mod actor;
pub mod admin;
pub mod broadcast;
pub mod chat;
pub mod config;
pub mod error;
pub mod membership;
pub mod metric_keys;
pub mod registry;
pub mod rooms;
pub mod ws_router;

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::config::Settings;
use crate::registry::ConnectionRegistry;
use crate::rooms::RoomDirectory;

pub use crate::actor::{spawn_relay_actor, RelayHandle};
pub use crate::error::RelayError;

/// All mutable relay state, owned by the relay actor.
///
/// Every inbound event mutates this through one of the handler methods in
/// `membership`, `admin` or `chat`, then notifies through the broadcaster.
/// The actor processes events one at a time, so each handler's
/// check-then-act sequence is atomic with respect to other inbound events.
pub struct RelayState {
    pub(crate) settings: Arc<Settings>,
    pub(crate) rooms: RoomDirectory,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) broadcaster: Broadcaster,
}

impl RelayState {
    pub fn new(settings: Arc<Settings>) -> Self {
        let registry = ConnectionRegistry::new();
        let broadcaster = Broadcaster::new(registry.clone());
        Self {
            settings,
            rooms: RoomDirectory::new(),
            registry,
            broadcaster,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomDirectory {
        &self.rooms
    }
}
