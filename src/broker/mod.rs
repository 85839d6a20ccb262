//! The `broker` module holds the shared topic state: buffered queues,
//! subscriber sets and the per-connection subscription index, composed by
//! the `Broker` engine.

pub mod engine;
pub mod queue;
pub mod registry;
pub mod tracker;

pub use engine::{BroadcastOutcome, Broker};
