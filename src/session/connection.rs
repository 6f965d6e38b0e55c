use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use uuid::Uuid;

use super::events::ClientEvent;

/// Identity of one live client transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Identity of one recording-to-transcript flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Transport-side view of a client connection.
///
/// Owned by the transport. Sessions only get a `ClientSink` and a
/// `Liveness`, neither of which keeps the connection alive.
pub struct Connection {
    id: ConnectionId,
    alive: watch::Sender<bool>,
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl Connection {
    pub fn new(outbound: mpsc::UnboundedSender<ClientEvent>) -> Self {
        let (alive, _) = watch::channel(true);
        Self {
            id: ConnectionId::new(),
            alive,
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_alive(&self) -> bool {
        *self.alive.borrow()
    }

    /// Report the transport as gone. Nothing is emitted afterwards.
    pub fn mark_disconnected(&self) {
        if self.alive.send_replace(false) {
            debug!("Connection {} marked disconnected", self.id);
        }
    }

    pub fn liveness(&self) -> Liveness {
        Liveness {
            rx: self.alive.subscribe(),
        }
    }

    pub fn client(&self) -> ClientSink {
        ClientSink {
            connection_id: self.id,
            outbound: self.outbound.clone(),
            liveness: self.liveness(),
        }
    }

    /// Emit an event to this connection
    pub fn emit(&self, event: ClientEvent) -> bool {
        self.client().emit(event)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.alive.send_replace(false);
    }
}

/// Non-owning view of a connection's liveness flag
#[derive(Clone)]
pub struct Liveness {
    rx: watch::Receiver<bool>,
}

impl Liveness {
    pub fn is_alive(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the connection is reported disconnected (or dropped)
    pub async fn disconnected(&mut self) {
        loop {
            let alive = *self.rx.borrow_and_update();
            if !alive {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Outbound half used by sessions to reach their client
#[derive(Clone)]
pub struct ClientSink {
    connection_id: ConnectionId,
    outbound: mpsc::UnboundedSender<ClientEvent>,
    liveness: Liveness,
}

impl ClientSink {
    /// Deliver `event` unless the connection was reported disconnected.
    /// Returns whether the event was handed to the transport.
    pub fn emit(&self, event: ClientEvent) -> bool {
        if !self.liveness.is_alive() {
            debug!(
                "Dropping {} event for disconnected {}",
                event.kind(),
                self.connection_id
            );
            return false;
        }
        self.outbound.send(event).is_ok()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }
}
