// ============================
// crates/relay-lib/src/actor.rs
// ============================
//! The relay actor: single owner of all room and membership state.
//!
//! Inbound events queue on one mpsc channel and are handled to completion
//! in arrival order, so capacity and uniqueness checks can never interleave
//! with the mutations they guard. The deferred kick re-enters through the
//! same queue and is idempotent against a concurrent disconnect.
use chat_relay_common::{ClientEvent, ConnectionId, JoinAck};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::Settings;
use crate::error::RelayError;
use crate::registry::OutboundSender;
use crate::RelayState;

/// Message sent *into* the actor
#[derive(Debug)]
pub enum RelayMsg {
    /// A transport session opened
    Connect {
        id: ConnectionId,
        tx: OutboundSender,
    },
    /// `joinRoom` request with its ack callback
    JoinRoom {
        id: ConnectionId,
        room_name: String,
        resp_tx: mpsc::UnboundedSender<JoinAck>,
    },
    /// Any other inbound client event
    Event { id: ConnectionId, event: ClientEvent },
    /// A transport session dropped
    Disconnect { id: ConnectionId },
    /// Deferred kick firing after the configured delay
    CompleteKick { id: ConnectionId },
}

/// Handle that other components keep: the actor's command channel
#[derive(Clone)]
pub struct RelayHandle {
    cmd_tx: mpsc::UnboundedSender<RelayMsg>,
}

impl RelayHandle {
    pub fn connect(&self, id: ConnectionId, tx: OutboundSender) -> Result<(), RelayError> {
        self.cmd_tx.send(RelayMsg::Connect { id, tx })?;
        Ok(())
    }

    /// Request a room join and wait for the ack. The ack is also queued on
    /// the connection's outbound channel before any close marker.
    pub async fn join_room(
        &self,
        id: ConnectionId,
        room_name: String,
    ) -> Result<JoinAck, RelayError> {
        let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
        self.cmd_tx.send(RelayMsg::JoinRoom {
            id,
            room_name,
            resp_tx,
        })?;
        resp_rx.recv().await.ok_or(RelayError::ConnectionClosed)
    }

    pub fn event(&self, id: ConnectionId, event: ClientEvent) -> Result<(), RelayError> {
        self.cmd_tx.send(RelayMsg::Event { id, event })?;
        Ok(())
    }

    pub fn disconnect(&self, id: ConnectionId) -> Result<(), RelayError> {
        self.cmd_tx.send(RelayMsg::Disconnect { id })?;
        Ok(())
    }
}

pub struct RelayActor {
    state: RelayState,
    cmd_tx: mpsc::UnboundedSender<RelayMsg>,
}

impl RelayActor {
    pub fn new(settings: Arc<Settings>, cmd_tx: mpsc::UnboundedSender<RelayMsg>) -> Self {
        Self {
            state: RelayState::new(settings),
            cmd_tx,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RelayMsg>) {
        while let Some(msg) = rx.recv().await {
            self.handle(msg);
        }
        debug!("relay actor stopped");
    }

    fn handle(&mut self, msg: RelayMsg) {
        match msg {
            RelayMsg::Connect { id, tx } => self.state.connect(id, tx),
            RelayMsg::JoinRoom {
                id,
                room_name,
                resp_tx,
            } => {
                let ack = self.state.join_room(id, &room_name);
                let _ = resp_tx.send(ack);
            }
            RelayMsg::Event { id, event } => self.dispatch(id, event),
            RelayMsg::Disconnect { id } => self.state.disconnect(id),
            RelayMsg::CompleteKick { id } => self.state.terminate(id),
        }
    }

    fn dispatch(&mut self, id: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::JoinRoom { room_name } => {
                // joins without an ack callback still run the full protocol
                self.state.join_room(id, &room_name);
            }
            ClientEvent::SetUsername {
                username,
                room_name,
            } => self.state.set_username(id, &room_name, username),
            ClientEvent::AdminCommand { room_name, command } => {
                let kicked = self.state.admin_command(id, &room_name, command);
                for target in kicked {
                    self.schedule_kick(target);
                }
            }
            ClientEvent::Message { msg, room_name } => self.state.chat_message(id, &room_name, msg),
            ClientEvent::PrivateMessage {
                to,
                message,
                room_name,
            } => self.state.private_message(id, &room_name, &to, message),
        }
    }

    /// Close a kicked member's session after the configured delay, letting
    /// in-flight messages drain first. Fires through the command queue so
    /// it serializes with everything else.
    fn schedule_kick(&self, id: ConnectionId) {
        let cmd_tx = self.cmd_tx.clone();
        let delay = Duration::from_millis(self.state.settings.kick_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = cmd_tx.send(RelayMsg::CompleteKick { id });
        });
    }
}

/// Spawn the relay actor and return its handle
pub fn spawn_relay_actor(settings: Settings) -> RelayHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let actor = RelayActor::new(Arc::new(settings), cmd_tx.clone());

    tokio::spawn(async move {
        actor.run(cmd_rx).await;
    });

    RelayHandle { cmd_tx }
}
