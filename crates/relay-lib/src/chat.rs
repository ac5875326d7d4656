// ============================
// crates/relay-lib/src/chat.rs
// ============================
//! Chat relay: room broadcasts and private messages.
use chat_relay_common::{ConnectionId, ServerEvent};
use tracing::debug;

use crate::RelayState;

impl RelayState {
    /// Relay chat text to every member of the sender's room, the sender
    /// included.
    pub fn chat_message(&mut self, id: ConnectionId, room_name: &str, msg: String) {
        let Some(info) = self.registry.get(id) else {
            return;
        };
        if info.room.as_deref() != Some(room_name) {
            debug!(%id, room = room_name, "chat message for a room not joined, dropped");
            return;
        }
        let Some(room) = self.rooms.get(room_name) else {
            return;
        };
        let name = info
            .name
            .unwrap_or_else(|| format!("anonymous-{}", &id.to_string()[..8]));
        let ids = room.connection_ids();
        self.broadcaster.to_room(
            &ids,
            &ServerEvent::ChatMessage {
                from: id,
                name,
                msg,
            },
        );
    }

    /// Deliver a private message to one member of the sender's room,
    /// addressed by connection id or display name. An unknown target gets
    /// reported back to the sender only.
    pub fn private_message(&mut self, id: ConnectionId, room_name: &str, to: &str, message: String) {
        let Some(info) = self.registry.get(id) else {
            return;
        };
        if info.room.as_deref() != Some(room_name) {
            return;
        }
        let Some(room) = self.rooms.get(room_name) else {
            return;
        };
        let Some(target) = room.resolve_target(to) else {
            self.broadcaster.to_one(
                id,
                ServerEvent::ServerAlert {
                    message: format!("No user '{to}' in room '{room_name}'."),
                },
            );
            return;
        };
        let name = info
            .name
            .unwrap_or_else(|| format!("anonymous-{}", &id.to_string()[..8]));
        self.broadcaster.to_one(
            target,
            ServerEvent::PrivateMessage {
                from: id,
                name,
                message,
            },
        );
    }
}
