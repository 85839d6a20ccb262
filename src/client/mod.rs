//! The `client` module defines the broker's view of a connected peer.
//!
//! It provides the `Client` handle, which encapsulates the identity of a
//! single connection, the channel for sending frames to it, and the signal
//! used to shut it down.

pub mod pubsub_client;
pub use pubsub_client::{Client, ConnectionId};
