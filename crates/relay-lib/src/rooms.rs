// ============================
// crates/relay-lib/src/rooms.rs
// ============================
//! Room directory: room lifecycle, rosters, capacity, admin pointers.
use chat_relay_common::ConnectionId;
use metrics::{counter, gauge};
use std::collections::HashMap;

use crate::metric_keys;

/// A named, capacity-bounded group of connections sharing broadcasts.
#[derive(Debug)]
pub struct Room {
    capacity: usize,
    /// Every admitted connection, in admission order. Includes connections
    /// that have not yet claimed a display name.
    joined: Vec<ConnectionId>,
    /// Named roster, in registration order. Subset of `joined`.
    members: Vec<(ConnectionId, String)>,
    admin: Option<ConnectionId>,
}

impl Room {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            joined: Vec::new(),
            members: Vec::new(),
            admin: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Number of admitted connections, named or not. The capacity check
    /// runs against this before admission, so it can never overshoot.
    pub fn occupancy(&self) -> usize {
        self.joined.len()
    }

    pub fn is_full(&self) -> bool {
        self.joined.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.joined.is_empty()
    }

    /// Admit a connection. The caller must have checked `is_full` first.
    pub fn admit(&mut self, id: ConnectionId) {
        if !self.joined.contains(&id) {
            self.joined.push(id);
        }
    }

    pub fn is_admitted(&self, id: ConnectionId) -> bool {
        self.joined.contains(&id)
    }

    /// Exact, case-sensitive membership check on display names.
    pub fn name_taken(&self, name: &str) -> bool {
        self.members.iter().any(|(_, n)| n == name)
    }

    /// Record a display name for an admitted connection.
    pub fn register_name(&mut self, id: ConnectionId, name: String) {
        self.members.push((id, name));
    }

    pub fn member_name(&self, id: ConnectionId) -> Option<&str> {
        self.members
            .iter()
            .find(|(mid, _)| *mid == id)
            .map(|(_, n)| n.as_str())
    }

    /// Remove a connection from the room, returning its display name if it
    /// had registered one.
    pub fn remove(&mut self, id: ConnectionId) -> Option<String> {
        self.joined.retain(|jid| *jid != id);
        let name = self
            .members
            .iter()
            .position(|(mid, _)| *mid == id)
            .map(|idx| self.members.remove(idx).1);
        if self.admin == Some(id) {
            self.admin = None;
        }
        name
    }

    pub fn admin(&self) -> Option<ConnectionId> {
        self.admin
    }

    pub fn set_admin(&mut self, id: Option<ConnectionId>) {
        self.admin = id;
    }

    /// Deterministic admin successor: the first remaining roster entry in
    /// registration order, falling back to the earliest-joined connection
    /// when nobody has claimed a name yet.
    pub fn succession_candidate(&self) -> Option<ConnectionId> {
        self.members
            .first()
            .map(|(id, _)| *id)
            .or_else(|| self.joined.first().copied())
    }

    /// Roster snapshot for `userList` broadcasts.
    pub fn roster(&self) -> HashMap<ConnectionId, String> {
        self.members.iter().cloned().collect()
    }

    /// All admitted connection ids, in admission order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.joined.clone()
    }

    /// Resolve a kick/private-message target given either a connection id
    /// or a display name.
    pub fn resolve_target(&self, target: &str) -> Option<ConnectionId> {
        if let Ok(id) = target.parse::<ConnectionId>() {
            if self.is_admitted(id) {
                return Some(id);
            }
        }
        self.members
            .iter()
            .find(|(_, n)| n == target)
            .map(|(id, _)| *id)
    }
}

/// Process-wide mapping of room name -> room
pub struct RoomDirectory {
    rooms: HashMap<String, Room>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// Look up a room, creating it with the given capacity on first
    /// reference.
    pub fn get_or_create(&mut self, name: &str, default_capacity: usize) -> &mut Room {
        if !self.rooms.contains_key(name) {
            self.rooms.insert(name.to_string(), Room::new(default_capacity));
            counter!(metric_keys::ROOM_CREATED).increment(1);
            gauge!(metric_keys::ROOM_ACTIVE).set(self.rooms.len() as f64);
        }
        self.rooms.get_mut(name).expect("room inserted above")
    }

    pub fn get(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Room> {
        self.rooms.get_mut(name)
    }

    /// Delete a room and all its state, including the admin record.
    pub fn remove(&mut self, name: &str) -> Option<Room> {
        let removed = self.rooms.remove(name);
        if removed.is_some() {
            counter!(metric_keys::ROOM_DELETED).increment(1);
            gauge!(metric_keys::ROOM_ACTIVE).set(self.rooms.len() as f64);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_capacity_check_runs_over_all_admitted() {
        let mut room = Room::new(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        room.admit(a);
        assert!(!room.is_full());
        room.admit(b);
        assert!(room.is_full());
        // only `a` ever claims a name; the unnamed `b` still counts
        room.register_name(a, "alice".to_string());
        assert_eq!(room.occupancy(), 2);
        assert!(room.is_full());
    }

    #[test]
    fn test_name_uniqueness_is_case_sensitive() {
        let mut room = Room::new(10);
        let a = Uuid::new_v4();
        room.admit(a);
        room.register_name(a, "alice".to_string());

        assert!(room.name_taken("alice"));
        assert!(!room.name_taken("Alice"));
        assert!(!room.name_taken("alice "));
    }

    #[test]
    fn test_remove_clears_admin_and_roster() {
        let mut room = Room::new(10);
        let a = Uuid::new_v4();
        room.admit(a);
        room.set_admin(Some(a));
        room.register_name(a, "alice".to_string());

        assert_eq!(room.remove(a).as_deref(), Some("alice"));
        assert!(room.admin().is_none());
        assert!(room.is_empty());
        assert!(room.roster().is_empty());
    }

    #[test]
    fn test_succession_prefers_roster_order() {
        let mut room = Room::new(10);
        let admin = Uuid::new_v4();
        let unnamed = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        room.admit(admin);
        room.admit(unnamed);
        room.admit(b);
        room.admit(c);
        room.set_admin(Some(admin));
        room.register_name(admin, "alice".to_string());
        room.register_name(b, "bob".to_string());
        room.register_name(c, "carol".to_string());

        room.remove(admin);
        // first remaining roster entry wins, even though `unnamed` joined
        // earlier
        assert_eq!(room.succession_candidate(), Some(b));
    }

    #[test]
    fn test_succession_falls_back_to_join_order() {
        let mut room = Room::new(10);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        room.admit(a);
        room.admit(b);

        assert_eq!(room.succession_candidate(), Some(a));
    }

    #[test]
    fn test_resolve_target_by_id_or_name() {
        let mut room = Room::new(10);
        let a = Uuid::new_v4();
        room.admit(a);
        room.register_name(a, "alice".to_string());

        assert_eq!(room.resolve_target("alice"), Some(a));
        assert_eq!(room.resolve_target(&a.to_string()), Some(a));
        assert_eq!(room.resolve_target("nobody"), None);
    }

    #[test]
    fn test_directory_create_and_delete() {
        let mut directory = RoomDirectory::new();
        let room = directory.get_or_create("r1", 10);
        assert_eq!(room.capacity(), 10);

        // second lookup does not reset state
        directory.get_mut("r1").unwrap().set_capacity(3);
        assert_eq!(directory.get_or_create("r1", 10).capacity(), 3);

        directory.remove("r1");
        assert!(directory.is_empty());
        // recreation reverts to the default capacity
        assert_eq!(directory.get_or_create("r1", 10).capacity(), 10);
    }
}
