//! Connection lifecycle tracker
//!
//! Inverse index from a connection to the topics it subscribed to, so that
//! tearing a connection down only visits its own topics.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::client::ConnectionId;

#[derive(Debug, Default)]
pub struct ConnectionTracker {
    topics_by_connection: DashMap<ConnectionId, HashSet<String>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `id` is subscribed to `topic`.
    pub fn record(&self, id: ConnectionId, topic: &str) {
        self.topics_by_connection
            .entry(id)
            .or_default()
            .insert(topic.to_string());
    }

    /// Forget `id` entirely, returning the topics it was subscribed to.
    /// A second call for the same id returns an empty set.
    pub fn take(&self, id: &ConnectionId) -> HashSet<String> {
        self.topics_by_connection
            .remove(id)
            .map(|(_, topics)| topics)
            .unwrap_or_default()
    }

    pub fn topics_for(&self, id: &ConnectionId) -> Vec<String> {
        self.topics_by_connection
            .get(id)
            .map(|topics| topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of connections holding at least one subscription.
    pub fn connection_count(&self) -> usize {
        self.topics_by_connection.len()
    }
}
