// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between chat clients and the relay server.
//! This module defines the WebSocket protocol events and supporting types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Transport-assigned identifier for a single connection
pub type ConnectionId = Uuid;

/// Events sent from client to server
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Request to join a room, creating it on first reference
    /// # Fields
    /// * `room_name` - Case-sensitive room key
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_name: String },
    /// Claim a display name within a previously joined room
    /// # Fields
    /// * `username` - Desired display name (must be unique in the room)
    /// * `room_name` - Room the name is claimed in
    #[serde(rename_all = "camelCase")]
    SetUsername { username: String, room_name: String },
    /// Admin-only action against a room
    #[serde(rename_all = "camelCase")]
    AdminCommand {
        room_name: String,
        #[serde(flatten)]
        command: AdminCommand,
    },
    /// Broadcast chat text to the sender's room
    #[serde(rename_all = "camelCase")]
    Message { msg: String, room_name: String },
    /// Unicast chat text to a single member of the sender's room
    /// # Fields
    /// * `to` - Target connection id or display name
    #[serde(rename_all = "camelCase")]
    PrivateMessage {
        to: String,
        message: String,
        room_name: String,
    },
}

/// Administrative commands, only honored from the room's admin connection
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum AdminCommand {
    /// Remove members from the room, by connection id or display name
    #[serde(rename_all = "camelCase")]
    Kick { target_ids: Vec<String> },
    /// Change the room capacity; never evicts existing members
    SetCapacity { value: String },
    /// Disconnect every member and delete the room
    CloseRoom,
    /// Broadcast an `[Admin]` server message to the room
    Announce { text: String },
}

/// Events sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Identity confirmation for the receiving connection
    #[serde(rename_all = "camelCase")]
    DisplayUserName {
        id: ConnectionId,
        name: String,
        is_admin: bool,
        display_room: String,
    },
    /// Snapshot of the room roster, connection id -> display name
    UserList { users: HashMap<ConnectionId, String> },
    /// Informational notice
    ServerMessage { message: String },
    /// Blocking notice, sent before a rejection or shutdown
    ServerAlert { message: String },
    /// Chat text relayed to the whole room
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        from: ConnectionId,
        name: String,
        msg: String,
    },
    /// Unicast chat delivery
    PrivateMessage {
        from: ConnectionId,
        name: String,
        message: String,
    },
    /// Result of a `joinRoom` request
    JoinAck {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

/// Synchronous join result returned through the relay handle
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JoinAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JoinAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl From<JoinAck> for ServerEvent {
    fn from(ack: JoinAck) -> Self {
        ServerEvent::JoinAck {
            success: ack.success,
            message: ack.message,
        }
    }
}
