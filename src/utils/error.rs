//! The `error` module defines the error types used within `msgqueue`.
//!
//! `BrokerError` covers process-level failures that stop the server or an
//! operation outright. `ProtocolError` covers a single rejected envelope;
//! it is logged by the router and never sent back to the client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to encode outbound frame: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unrecognized role")]
    UnknownRole,

    #[error("unrecognized transmission mode")]
    UnknownTransmissionMode,
}
