//! Subscriber registry
//!
//! Maps each topic to the live connections subscribed to it. Subscriber sets
//! are keyed by `ConnectionId`, which makes subscribe idempotent.
//!
//! Concurrency notes:
//! - subscribe, unsubscribe and broadcast each hold the topic's exclusive
//!   map guard, so a broadcast never sees a subscriber set mid-update;
//! - broadcast only calls the non-blocking `try_send` while the guard is
//!   held. Socket writes happen later in each connection's writer task, so
//!   a slow subscriber never stalls the topic.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;
use tungstenite::protocol::Message as WsMessage;

use crate::client::{Client, ConnectionId};

/// Outcome of one broadcast: how many subscribers accepted the frame and
/// which ones could not take it.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<Client>,
}

#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    topics: DashMap<String, HashMap<ConnectionId, Client>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `client` to `topic`. Returns `false` if it was already subscribed.
    pub fn subscribe(&self, topic: &str, client: &Client) -> bool {
        let mut subscribers = self.topics.entry(topic.to_string()).or_default();
        match subscribers.entry(client.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(client.clone());
                true
            }
        }
    }

    /// Remove `id` from `topic`. Missing topic or subscriber is a no-op.
    pub fn unsubscribe(&self, topic: &str, id: &ConnectionId) -> bool {
        self.topics
            .get_mut(topic)
            .is_some_and(|mut subscribers| subscribers.remove(id).is_some())
    }

    /// Offer `msg` to every subscriber of `topic`.
    pub fn broadcast(&self, topic: &str, msg: &WsMessage) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let Some(subscribers) = self.topics.get_mut(topic) else {
            return report;
        };

        for (id, client) in subscribers.iter() {
            match client.try_send(msg.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Subscriber {id} on topic {topic} is not keeping up");
                    report.failed.push(client.clone());
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("Subscriber {id} on topic {topic} has gone away");
                    report.failed.push(client.clone());
                }
            }
        }

        report
    }

    pub fn is_subscribed(&self, topic: &str, id: &ConnectionId) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|subscribers| subscribers.contains_key(id))
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |subscribers| subscribers.len())
    }

    pub fn contains_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }
}
