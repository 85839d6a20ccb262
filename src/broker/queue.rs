//! Topic queue store
//!
//! One FIFO buffer of pending payloads per topic, used by buffered-mode
//! producers and drained by pull-based consumers. Each topic's buffer sits
//! behind its own map entry, so pushes and pops on the same topic are
//! serialized while different topics proceed independently.

use std::collections::VecDeque;

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct TopicQueueStore {
    queues: DashMap<String, VecDeque<String>>,
}

impl TopicQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `payload` to the tail of `topic`'s buffer, creating it if needed.
    pub fn enqueue(&self, topic: &str, payload: String) {
        self.queues
            .entry(topic.to_string())
            .or_default()
            .push_back(payload);
    }

    /// Remove and return the head of `topic`'s buffer.
    ///
    /// `None` when the topic has never been written or is drained; that is a
    /// normal outcome, not an error. Never creates an entry.
    pub fn dequeue(&self, topic: &str) -> Option<String> {
        self.queues.get_mut(topic)?.pop_front()
    }

    /// Number of payloads waiting on `topic`.
    pub fn len(&self, topic: &str) -> usize {
        self.queues.get(topic).map_or(0, |q| q.len())
    }

    pub fn is_empty(&self, topic: &str) -> bool {
        self.len(topic) == 0
    }

    /// Whether `topic` has ever been given a buffer.
    pub fn contains_topic(&self, topic: &str) -> bool {
        self.queues.contains_key(topic)
    }
}
