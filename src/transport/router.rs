//! Protocol router
//!
//! One `Router` runs per connection. It decodes each inbound frame as an
//! `Envelope`, dispatches it to the broker, and queues the only reply the
//! protocol has (the payload of a successful pull) on the connection's
//! outbound channel.
//!
//! Rejected envelopes are logged and skipped; they never close the
//! connection and never produce an error frame. The router moves from
//! `Open` to `Closed` exactly once and deregisters the connection from the
//! broker on that transition, whether `run` returns or the router is dropped
//! mid-flight.

use std::io::ErrorKind;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{debug, info, warn};
use tungstenite::Error as WsError;
use tungstenite::error::ProtocolError as WsProtocolError;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{BroadcastOutcome, Broker};
use crate::client::{Client, ConnectionId};
use crate::transport::message::{Envelope, Role, TransmissionMode};
use crate::utils::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Why a connection's read loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnect {
    /// Close frame, end of stream, or the transport reporting a closed socket.
    Clean,
    /// The peer vanished without a closing handshake.
    Abnormal(String),
    /// Any other read error.
    Unexpected(String),
    /// Shut down from our side: evicted by a broadcast, or the writer failed.
    ShutDown,
    /// The outbound channel was gone when a reply had to be queued.
    WriterGone,
}

/// What a single accepted envelope did.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    Subscribed { added: bool },
    Pulled(Option<String>),
    Enqueued,
    Broadcast(BroadcastOutcome),
}

pub struct Router {
    broker: Arc<Broker>,
    client: Client,
    state: ConnectionState,
}

impl Router {
    pub fn new(broker: Arc<Broker>, client: Client) -> Self {
        Self {
            broker,
            client,
            state: ConnectionState::Open,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.client.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Decode one frame and apply it to the broker.
    pub fn handle_frame(&self, bytes: &[u8]) -> Result<Dispatch, ProtocolError> {
        let envelope = Envelope::decode(bytes)?;
        self.dispatch(envelope)
    }

    fn dispatch(&self, envelope: Envelope) -> Result<Dispatch, ProtocolError> {
        let id = self.client.id;
        let topic = envelope.topic.as_str();

        let dispatch = match (envelope.role, envelope.transmission_mode) {
            (Role::Unknown, _) => return Err(ProtocolError::UnknownRole),
            (Role::Producer, TransmissionMode::Unknown) => {
                return Err(ProtocolError::UnknownTransmissionMode);
            }
            (Role::Consumer, _) if envelope.subscribe => {
                let added = self.broker.subscribe(topic, &self.client);
                info!("{id} subscribed to topic {topic}");
                Dispatch::Subscribed { added }
            }
            (Role::Consumer, _) => {
                let payload = self.broker.dequeue(topic);
                if payload.is_none() {
                    debug!("No data in queue {topic} for {id}");
                }
                Dispatch::Pulled(payload)
            }
            (Role::Producer, TransmissionMode::Buffered) => {
                self.broker.enqueue(topic, envelope.message.clone());
                debug!("{id} buffered a message on {topic}");
                Dispatch::Enqueued
            }
            (Role::Producer, TransmissionMode::Broadcast) => {
                let outcome = match self.broker.broadcast(topic, &envelope) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Failed to broadcast on {topic} for {id}: {e}");
                        BroadcastOutcome::default()
                    }
                };
                debug!(
                    "{id} broadcast on {topic} to {} subscriber(s)",
                    outcome.delivered
                );
                Dispatch::Broadcast(outcome)
            }
        };

        Ok(dispatch)
    }

    /// Read frames until the stream ends, fails, or the connection is told to
    /// shut down. Always leaves the router `Closed`.
    pub async fn run<S>(mut self, mut frames: S) -> Disconnect
    where
        S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
    {
        let id = self.client.id;

        let reason = loop {
            let frame = tokio::select! {
                frame = frames.next() => frame,
                _ = self.client.closed() => break Disconnect::ShutDown,
            };

            let result = match frame {
                None | Some(Ok(WsMessage::Close(_))) => break Disconnect::Clean,
                Some(Ok(WsMessage::Text(text))) => self.handle_frame(text.as_bytes()),
                Some(Ok(WsMessage::Binary(data))) => self.handle_frame(&data),
                // ping/pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(err)) => break classify(&err),
            };

            match result {
                Ok(Dispatch::Pulled(Some(payload))) => {
                    if !self.reply(&payload).await {
                        break Disconnect::WriterGone;
                    }
                    debug!("Data sent to consumer {id}");
                }
                Ok(_) => {}
                Err(err) => warn!("Dropping envelope from {id}: {err}"),
            }
        };

        match &reason {
            Disconnect::Clean => info!("{id} disconnected"),
            Disconnect::ShutDown => info!("{id} shut down"),
            Disconnect::WriterGone => warn!("{id} lost its send loop"),
            Disconnect::Abnormal(e) => warn!("{id} closed abnormally: {e}"),
            Disconnect::Unexpected(e) => warn!("{id} read error: {e}"),
        }

        self.close();
        reason
    }

    async fn reply(&self, payload: &str) -> bool {
        let text = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode reply for {}: {e}", self.client.id);
                return true;
            }
        };
        self.client.send(WsMessage::text(text)).await.is_ok()
    }

    /// Deregister the connection. Only the first call has any effect.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        self.broker.remove_connection(&self.client.id);
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.close();
    }
}

pub(crate) fn classify(err: &WsError) -> Disconnect {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => Disconnect::Clean,
        WsError::Protocol(WsProtocolError::ResetWithoutClosingHandshake) => {
            Disconnect::Abnormal(err.to_string())
        }
        WsError::Io(io)
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) =>
        {
            Disconnect::Abnormal(err.to_string())
        }
        other => Disconnect::Unexpected(other.to_string()),
    }
}
