//! # msgqueue
//!
//! `msgqueue` is a minimal in-memory message broker served over WebSockets.
//! Clients send JSON envelopes declaring themselves producers or consumers of
//! a topic. Producers either buffer messages for consumers to pull later, or
//! broadcast them to every consumer currently subscribed to the topic.
//!
//! ## Core Modules
//!
//! - `broker`: per-topic queues, subscriber sets and the connection index.
//! - `client`: the broker's handle to one live connection.
//! - `config`: loading server configuration from file and environment.
//! - `transport`: the envelope format, the per-connection router and the
//!   WebSocket server.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
