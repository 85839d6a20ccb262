//! The `utils` module provides shared definitions used across the `msgqueue`
//! application: the error taxonomy and logging setup.

pub mod error;
pub mod logging;

pub use error::{BrokerError, ProtocolError};

#[cfg(test)]
mod tests;
