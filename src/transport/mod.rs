//! The `transport` module handles network communication with clients over
//! WebSockets.
//!
//! It defines the envelope exchanged with clients, the per-connection
//! router that turns envelopes into broker operations, and the server that
//! accepts connections and moves frames between sockets and routers.

pub mod message;
pub mod router;
pub mod websocket;

pub use message::{Envelope, Role, TransmissionMode};
pub use router::{ConnectionState, Disconnect, Dispatch, Router};
pub use websocket::{serve, start_websocket_server};

#[cfg(test)]
mod websocket_tests;
