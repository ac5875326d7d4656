// crates/relay-lib/src/error.rs

//! Central error type for the relay core.
use thiserror::Error;

/// Relay error kinds with their client-facing notices
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("room full")]
    RoomFull,

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("invalid capacity value: {0}")]
    InvalidCapacity(String),

    #[error("not authorized to run admin commands")]
    Unauthorized,

    #[error("room '{0}' does not exist")]
    RoomNotFound(String),

    #[error("connection has not joined a room")]
    NotInRoom,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RelayError {
    /// Whether this rejection also terminates the offending session.
    /// Termination happens only after the notice has been queued, so the
    /// client sees the reason before the channel closes.
    pub fn terminates_session(&self) -> bool {
        matches!(self, RelayError::RoomFull | RelayError::UsernameTaken(_))
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RelayError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RelayError::ConnectionClosed
    }
}
