// ==============
// crates/relay-lib/src/metric_keys.rs

//! Central place for Prometheus metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_ACTIVE: &str = "ws.active";
pub const ROOM_CREATED: &str = "room.created";
pub const ROOM_DELETED: &str = "room.deleted";
pub const ROOM_ACTIVE: &str = "room.active";
pub const ROOM_JOIN_REJECTED: &str = "room.join_rejected";
pub const USER_JOINED: &str = "user.joined";
pub const USER_KICKED: &str = "user.kicked";
pub const ROOM_CLOSED: &str = "room.closed";
