//! Connection handle
//!
//! `Client` is the broker's handle to one live connection. It carries a
//! server-assigned identity, the sending side of the connection's bounded
//! outbound queue, and a shutdown signal used to ask the connection's router
//! to stop. Clones share the same identity, queue and signal.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::{SendError, TrySendError};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

/// Server-assigned identity of a connection. Equality is by identity, never
/// by anything the peer controls (such as its address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
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

#[derive(Debug, Clone)]
pub struct Client {
    pub id: ConnectionId,
    sender: Sender<WsMessage>,
    shutdown: Arc<Notify>,
}

impl Client {
    /// Create a new client around the sending half of its outbound queue.
    pub fn new(sender: Sender<WsMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            sender,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Queue a frame without waiting. Fails when the queue is full or the
    /// writer side has gone away.
    pub fn try_send(&self, msg: WsMessage) -> Result<(), TrySendError<WsMessage>> {
        self.sender.try_send(msg)
    }

    /// Queue a frame, waiting for room in the queue.
    pub async fn send(&self, msg: WsMessage) -> Result<(), SendError<WsMessage>> {
        self.sender.send(msg).await
    }

    /// Ask the connection to shut down. The request is remembered even if
    /// nobody is waiting on `closed()` yet.
    pub fn close(&self) {
        self.shutdown.notify_one();
    }

    /// Resolves once `close()` has been called on any clone of this client.
    pub async fn closed(&self) {
        self.shutdown.notified().await;
    }

    /// The shutdown signal alone, for tasks that must not keep the outbound
    /// queue open.
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }
}
