// ============================
// crates/relay-lib/src/admin.rs
// ============================
//! Admin command processor: authority check, kick, capacity, room close.
use chat_relay_common::{AdminCommand, ConnectionId, ServerEvent};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::metric_keys;
use crate::RelayState;

impl RelayState {
    /// Execute an admin command against a room.
    ///
    /// Commands from anyone but the room's recorded admin are dropped
    /// without a reply.
    ///
    /// Returns the connection ids whose sessions must be closed after the
    /// configured kick delay; the caller schedules the deferred work.
    pub fn admin_command(
        &mut self,
        id: ConnectionId,
        room_name: &str,
        command: AdminCommand,
    ) -> Vec<ConnectionId> {
        let authorized = self
            .rooms
            .get(room_name)
            .is_some_and(|room| room.admin() == Some(id));
        if !authorized {
            debug!(%id, room = room_name, ?command, "unauthorized admin command dropped");
            return Vec::new();
        }

        match command {
            AdminCommand::Kick { target_ids } => self.kick(room_name, &target_ids),
            AdminCommand::SetCapacity { value } => {
                self.set_capacity(id, room_name, &value);
                Vec::new()
            }
            AdminCommand::CloseRoom => {
                self.close_room(room_name);
                Vec::new()
            }
            AdminCommand::Announce { text } => {
                self.announce(room_name, &text);
                Vec::new()
            }
        }
    }

    /// Resolve kick targets (by display name or connection id), announce
    /// the removals, and hand back the ids for deferred termination. The
    /// delay lets in-flight messages to the target drain first.
    fn kick(&mut self, room_name: &str, targets: &[String]) -> Vec<ConnectionId> {
        let Some(room) = self.rooms.get(room_name) else {
            return Vec::new();
        };
        let ids = room.connection_ids();

        let mut kicked = Vec::new();
        for target in targets {
            let Some(target_id) = room.resolve_target(target) else {
                debug!(room = room_name, target, "kick target not found");
                continue;
            };
            let display = room
                .member_name(target_id)
                .map_or_else(|| target_id.to_string(), str::to_string);
            self.broadcaster.to_room(
                &ids,
                &ServerEvent::ServerMessage {
                    message: format!("User '{display}' was removed by the admin."),
                },
            );
            counter!(metric_keys::USER_KICKED).increment(1);
            info!(room = room_name, target = %target_id, "member kicked");
            kicked.push(target_id);
        }
        kicked
    }

    /// Parse and apply a new capacity. Existing members above a lowered
    /// limit are never evicted; the limit only blocks future joins.
    fn set_capacity(&mut self, admin: ConnectionId, room_name: &str, value: &str) {
        match value.trim().parse::<usize>() {
            Ok(capacity) if capacity > 0 => {
                let ids = {
                    let Some(room) = self.rooms.get_mut(room_name) else {
                        return;
                    };
                    room.set_capacity(capacity);
                    room.connection_ids()
                };
                info!(room = room_name, capacity, "room capacity changed");
                self.broadcaster.to_room(
                    &ids,
                    &ServerEvent::ServerMessage {
                        message: format!("Room capacity is now {capacity}."),
                    },
                );
            }
            _ => {
                warn!(room = room_name, value, "invalid capacity value");
                self.broadcaster.to_one(
                    admin,
                    ServerEvent::ServerAlert {
                        message: RelayError::InvalidCapacity(value.to_string()).to_string(),
                    },
                );
            }
        }
    }

    /// Broadcast the closing alert and message, then terminate every member
    /// session and delete the room entry, admin record included.
    fn close_room(&mut self, room_name: &str) {
        let ids = {
            let Some(room) = self.rooms.get(room_name) else {
                return;
            };
            room.connection_ids()
        };

        self.broadcaster.to_room(
            &ids,
            &ServerEvent::ServerAlert {
                message: format!("Room '{room_name}' is being closed by the administrator."),
            },
        );
        self.broadcaster.to_room(
            &ids,
            &ServerEvent::ServerMessage {
                message: format!("Room '{room_name}' closed."),
            },
        );

        // terminate runs the full disconnect path; leave_room no-ops since
        // the room entry is already gone
        self.rooms.remove(room_name);
        for member in ids {
            self.terminate(member);
        }
        counter!(metric_keys::ROOM_CLOSED).increment(1);
        info!(room = room_name, "room closed by admin");
    }

    fn announce(&mut self, room_name: &str, text: &str) {
        let Some(room) = self.rooms.get(room_name) else {
            return;
        };
        let ids = room.connection_ids();
        self.broadcaster.to_room(
            &ids,
            &ServerEvent::ServerMessage {
                message: format!("[Admin] {text}"),
            },
        );
    }
}
