// ============================
// crates/relay-lib/src/membership.rs
// ============================
//! Membership protocol: join/leave sequencing, capacity enforcement,
//! username uniqueness, admin assignment and succession.
use chat_relay_common::{ConnectionId, JoinAck, ServerEvent};
use metrics::{counter, gauge};
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::metric_keys;
use crate::registry::OutboundSender;
use crate::RelayState;

impl RelayState {
    /// Register a freshly connected transport session.
    pub fn connect(&mut self, id: ConnectionId, tx: OutboundSender) {
        self.registry.insert(id, tx);
        counter!(metric_keys::WS_CONNECTION).increment(1);
        gauge!(metric_keys::WS_ACTIVE).increment(1.0);
        debug!(%id, "connection registered");
    }

    /// Handle a `joinRoom` request.
    ///
    /// The room is created on first reference. A join against a full room
    /// acks failure and terminates the session without touching membership
    /// state. A successful join admits the connection and, if the room has
    /// no admin yet, assigns this connection and tells it so. No display
    /// name is registered here.
    pub fn join_room(&mut self, id: ConnectionId, room_name: &str) -> JoinAck {
        let Some(info) = self.registry.get(id) else {
            return JoinAck::rejected("unknown connection");
        };

        // Rejoin handling: same room is a no-op, another room is left first
        // (this is also the only way to change a display name).
        if let Some(current) = info.room {
            if current == room_name {
                // the transport only relays acks from the outbound queue
                self.broadcaster.to_one(id, JoinAck::ok().into());
                return JoinAck::ok();
            }
            self.leave_room(id, &current);
            self.registry.clear_session(id);
        }

        let default_capacity = self.settings.default_room_capacity;
        let full = self
            .rooms
            .get_or_create(room_name, default_capacity)
            .is_full();

        if full {
            counter!(metric_keys::ROOM_JOIN_REJECTED).increment(1);
            warn!(%id, room = room_name, "join rejected, room full");
            let ack = JoinAck::rejected(RelayError::RoomFull.to_string());
            // the rejected connection is never admitted; the notice is
            // queued ahead of the close marker so the client sees it
            self.broadcaster.to_one(id, ack.clone().into());
            self.terminate(id);
            return ack;
        }

        let needs_admin = {
            let room = match self.rooms.get_mut(room_name) {
                Some(room) => room,
                None => return JoinAck::rejected(RelayError::RoomNotFound(room_name.into()).to_string()),
            };
            room.admit(id);
            if room.admin().is_none() {
                room.set_admin(Some(id));
                true
            } else {
                false
            }
        };

        self.registry.set_room(id, Some(room_name.to_string()));
        self.broadcaster.to_one(id, JoinAck::ok().into());
        if needs_admin {
            self.registry.set_admin(id, true);
            self.broadcaster.to_one(
                id,
                ServerEvent::ServerMessage {
                    message: format!("You are the administrator of room '{room_name}'."),
                },
            );
            info!(%id, room = room_name, "administrator assigned");
        }
        debug!(%id, room = room_name, "connection joined");
        JoinAck::ok()
    }

    /// Handle a `setUsername` request.
    ///
    /// A name colliding with a live member's (exact match) is rejected and
    /// the session terminated with no state change. Otherwise the roster is
    /// updated and notifications go out in a fixed order: identity
    /// confirmation, roster broadcast, welcome, join announcement.
    pub fn set_username(&mut self, id: ConnectionId, room_name: &str, name: String) {
        let Some(info) = self.registry.get(id) else {
            return;
        };
        let joined = info.room.as_deref() == Some(room_name)
            && self
                .rooms
                .get(room_name)
                .is_some_and(|room| room.is_admitted(id));
        if !joined {
            self.broadcaster.to_one(
                id,
                ServerEvent::ServerAlert {
                    message: RelayError::NotInRoom.to_string(),
                },
            );
            return;
        }

        let taken = self
            .rooms
            .get(room_name)
            .is_some_and(|room| room.name_taken(&name));
        if taken {
            warn!(%id, room = room_name, name, "username rejected, already taken");
            self.broadcaster.to_one(
                id,
                ServerEvent::ServerAlert {
                    message: RelayError::UsernameTaken(name).to_string(),
                },
            );
            self.terminate(id);
            return;
        }

        let Some((is_admin, ids, roster)) = self.rooms.get_mut(room_name).map(|room| {
            let is_admin = room.admin() == Some(id);
            room.register_name(id, name.clone());
            (is_admin, room.connection_ids(), room.roster())
        }) else {
            return;
        };

        self.registry.set_name(id, name.clone());
        self.registry.set_admin(id, is_admin);
        counter!(metric_keys::USER_JOINED).increment(1);
        info!(%id, room = room_name, name, is_admin, "user registered");

        // ordering contract: identity -> roster -> welcome -> announcement
        self.broadcaster.to_one(
            id,
            ServerEvent::DisplayUserName {
                id,
                name: name.clone(),
                is_admin,
                display_room: room_name.to_string(),
            },
        );
        self.broadcaster
            .to_room(&ids, &ServerEvent::UserList { users: roster });
        self.broadcaster.to_one(
            id,
            ServerEvent::ServerMessage {
                message: format!("Welcome to the server, {name}!"),
            },
        );
        self.broadcaster.to_room_except(
            &ids,
            id,
            &ServerEvent::ServerMessage {
                message: format!("User '{name}' joined the room."),
            },
        );
    }

    /// Handle a transport disconnect. Safe to call for connections that are
    /// already gone (the deferred kick may race a voluntary disconnect).
    pub fn disconnect(&mut self, id: ConnectionId) {
        let Some(info) = self.registry.remove(id) else {
            return;
        };
        gauge!(metric_keys::WS_ACTIVE).decrement(1.0);
        if let Some(room_name) = info.room {
            self.leave_room(id, &room_name);
        }
        debug!(%id, "connection dropped");
    }

    /// Queue the close marker for a connection and drop its session state.
    pub(crate) fn terminate(&mut self, id: ConnectionId) {
        self.broadcaster.close(id);
        self.disconnect(id);
    }

    /// Departure side effects for one room: leave announcement, roster
    /// update, room deletion, admin succession.
    ///
    /// Connections that never registered a display name drop silently.
    pub(crate) fn leave_room(&mut self, id: ConnectionId, room_name: &str) {
        let Some(room) = self.rooms.get_mut(room_name) else {
            return;
        };
        let was_admin = room.admin() == Some(id);
        let departed = room.member_name(id).map(str::to_string);

        if let Some(name) = &departed {
            let ids = room.connection_ids();
            self.broadcaster.to_room_except(
                &ids,
                id,
                &ServerEvent::ServerMessage {
                    message: format!("User '{name}' left the room."),
                },
            );
        }

        room.remove(id);

        if departed.is_some() {
            let ids = room.connection_ids();
            let roster = room.roster();
            self.broadcaster
                .to_room(&ids, &ServerEvent::UserList { users: roster });
        }

        if room.is_empty() {
            self.rooms.remove(room_name);
            info!(room = room_name, "room deleted, last member left");
            return;
        }

        if was_admin {
            self.assign_successor(room_name);
        }
    }

    /// Admin succession: promote the first remaining roster entry (or the
    /// earliest joined connection when nobody is named yet) and notify it.
    fn assign_successor(&mut self, room_name: &str) {
        let Some(room) = self.rooms.get_mut(room_name) else {
            return;
        };
        let Some(next) = room.succession_candidate() else {
            return;
        };
        room.set_admin(Some(next));
        let event = match room.member_name(next) {
            Some(name) => ServerEvent::DisplayUserName {
                id: next,
                name: name.to_string(),
                is_admin: true,
                display_room: room_name.to_string(),
            },
            None => ServerEvent::ServerMessage {
                message: format!("You are the administrator of room '{room_name}'."),
            },
        };
        self.registry.set_admin(next, true);
        self.broadcaster.to_one(next, event);
        info!(room = room_name, admin = %next, "admin succession");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::registry::{Outbound, OutboundReceiver};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn setup() -> RelayState {
        RelayState::new(Arc::new(Settings::default()))
    }

    fn connect(state: &mut RelayState) -> (ConnectionId, OutboundReceiver) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.connect(id, tx);
        (id, rx)
    }

    fn drain(rx: &mut OutboundReceiver) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            out.push(item);
        }
        out
    }

    #[tokio::test]
    async fn test_first_join_creates_room_and_assigns_admin() {
        let mut state = setup();
        let (a, mut rx_a) = connect(&mut state);

        let ack = state.join_room(a, "r1");
        assert!(ack.success);
        assert_eq!(state.rooms().get("r1").unwrap().admin(), Some(a));
        assert!(state.registry().get(a).unwrap().is_admin);

        let events = drain(&mut rx_a);
        assert!(matches!(
            &events[0],
            Outbound::Event(ServerEvent::JoinAck { success: true, .. })
        ));
        assert!(matches!(
            &events[1],
            Outbound::Event(ServerEvent::ServerMessage { message })
                if message.contains("administrator")
        ));
    }

    #[tokio::test]
    async fn test_join_at_capacity_rejects_and_terminates() {
        let mut state = setup();
        let (a, _rx_a) = connect(&mut state);
        let (b, _rx_b) = connect(&mut state);
        assert!(state.join_room(a, "r1").success);
        assert!(state.join_room(b, "r1").success);
        state
            .rooms
            .get_mut("r1")
            .unwrap()
            .set_capacity(2);

        let (c, mut rx_c) = connect(&mut state);
        let ack = state.join_room(c, "r1");
        assert!(!ack.success);
        assert_eq!(ack.message.as_deref(), Some("room full"));

        // never admitted, session dropped
        assert_eq!(state.rooms().get("r1").unwrap().occupancy(), 2);
        assert!(!state.registry().contains(c));

        // notice precedes the close marker
        let events = drain(&mut rx_c);
        assert!(matches!(
            &events[0],
            Outbound::Event(ServerEvent::JoinAck { success: false, .. })
        ));
        assert_eq!(events[1], Outbound::Close);
    }

    #[tokio::test]
    async fn test_set_username_notification_order() {
        let mut state = setup();
        let (a, mut rx_a) = connect(&mut state);
        state.join_room(a, "r1");
        drain(&mut rx_a);

        state.set_username(a, "r1", "alice".to_string());

        let events = drain(&mut rx_a);
        assert!(matches!(
            &events[0],
            Outbound::Event(ServerEvent::DisplayUserName { name, is_admin: true, .. })
                if name == "alice"
        ));
        assert!(matches!(&events[1], Outbound::Event(ServerEvent::UserList { users }) if users.len() == 1));
        assert!(matches!(
            &events[2],
            Outbound::Event(ServerEvent::ServerMessage { message })
                if message.starts_with("Welcome")
        ));
        assert_eq!(events.len(), 3, "join announcement must exclude the joiner");
    }

    #[tokio::test]
    async fn test_duplicate_username_terminates_without_mutation() {
        let mut state = setup();
        let (a, _rx_a) = connect(&mut state);
        state.join_room(a, "r1");
        state.set_username(a, "r1", "alice".to_string());

        let (b, mut rx_b) = connect(&mut state);
        state.join_room(b, "r1");
        drain(&mut rx_b);
        state.set_username(b, "r1", "alice".to_string());

        let events = drain(&mut rx_b);
        assert!(matches!(
            &events[0],
            Outbound::Event(ServerEvent::ServerAlert { message })
                if message.contains("already taken")
        ));
        assert_eq!(events[1], Outbound::Close);
        assert!(!state.registry().contains(b));

        let room = state.rooms().get("r1").unwrap();
        assert_eq!(room.roster().len(), 1);
        assert_eq!(room.roster().get(&a).map(String::as_str), Some("alice"));
    }

    #[tokio::test]
    async fn test_set_username_requires_join() {
        let mut state = setup();
        let (a, mut rx_a) = connect(&mut state);

        state.set_username(a, "r1", "alice".to_string());

        let events = drain(&mut rx_a);
        assert!(matches!(
            &events[0],
            Outbound::Event(ServerEvent::ServerAlert { .. })
        ));
        // connection kept, nothing created
        assert!(state.registry().contains(a));
        assert!(state.rooms().get("r1").is_none());
    }

    #[tokio::test]
    async fn test_admin_disconnect_promotes_first_roster_entry() {
        let mut state = setup();
        let (a, _rx_a) = connect(&mut state);
        let (b, mut rx_b) = connect(&mut state);
        let (c, _rx_c) = connect(&mut state);
        state.join_room(a, "r1");
        state.join_room(b, "r1");
        state.join_room(c, "r1");
        state.set_username(a, "r1", "alice".to_string());
        state.set_username(b, "r1", "bob".to_string());
        state.set_username(c, "r1", "carol".to_string());
        drain(&mut rx_b);

        state.disconnect(a);

        let room = state.rooms().get("r1").unwrap();
        assert_eq!(room.admin(), Some(b));
        assert!(state.registry().get(b).unwrap().is_admin);

        let events = drain(&mut rx_b);
        assert!(events.iter().any(|e| matches!(
            e,
            Outbound::Event(ServerEvent::DisplayUserName { id, is_admin: true, .. }) if *id == b
        )));
    }

    #[tokio::test]
    async fn test_unnamed_disconnect_is_a_raw_drop() {
        let mut state = setup();
        let (a, mut rx_a) = connect(&mut state);
        let (b, _rx_b) = connect(&mut state);
        state.join_room(a, "r1");
        state.set_username(a, "r1", "alice".to_string());
        state.join_room(b, "r1");
        drain(&mut rx_a);

        state.disconnect(b);

        // no membership-change notifications for unnamed departures
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(state.rooms().get("r1").unwrap().occupancy(), 1);
    }

    #[tokio::test]
    async fn test_last_departure_deletes_room_and_resets_capacity() {
        let mut state = setup();
        let (a, _rx_a) = connect(&mut state);
        state.join_room(a, "r1");
        state.set_username(a, "r1", "alice".to_string());
        state.rooms.get_mut("r1").unwrap().set_capacity(3);

        state.disconnect(a);
        assert!(state.rooms().get("r1").is_none());

        let (b, _rx_b) = connect(&mut state);
        state.join_room(b, "r1");
        assert_eq!(state.rooms().get("r1").unwrap().capacity(), 10);
    }

    #[tokio::test]
    async fn test_repeated_join_still_acks_on_the_wire() {
        let mut state = setup();
        let (a, mut rx_a) = connect(&mut state);
        assert!(state.join_room(a, "r1").success);
        assert!(state.join_room(a, "r1").success);

        let acks = drain(&mut rx_a)
            .into_iter()
            .filter(|e| matches!(e, Outbound::Event(ServerEvent::JoinAck { success: true, .. })))
            .count();
        assert_eq!(acks, 2, "every join request must ack on the outbound queue");
        assert_eq!(state.rooms().get("r1").unwrap().occupancy(), 1);
    }

    #[tokio::test]
    async fn test_rejoin_other_room_leaves_current_one() {
        let mut state = setup();
        let (a, _rx_a) = connect(&mut state);
        let (b, _rx_b) = connect(&mut state);
        state.join_room(a, "r1");
        state.join_room(b, "r1");
        state.set_username(a, "r1", "alice".to_string());
        state.set_username(b, "r1", "bob".to_string());

        state.join_room(a, "r2");

        let r1 = state.rooms().get("r1").unwrap();
        assert_eq!(r1.occupancy(), 1);
        assert_eq!(r1.admin(), Some(b));
        assert_eq!(state.rooms().get("r2").unwrap().admin(), Some(a));
        // the display name does not carry over to the new room
        assert!(state.registry().get(a).unwrap().name.is_none());
        assert!(state.rooms().get("r2").unwrap().roster().is_empty());
    }

    #[tokio::test]
    async fn test_capacity_invariant_after_every_join() {
        let mut state = setup();
        for _ in 0..15 {
            let (id, _rx) = connect(&mut state);
            state.join_room(id, "crowded");
            let room = state.rooms().get("crowded").unwrap();
            assert!(room.occupancy() <= room.capacity());
        }
        assert_eq!(state.rooms().get("crowded").unwrap().occupancy(), 10);
    }
}
