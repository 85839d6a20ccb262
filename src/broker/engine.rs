//! Broker engine
//!
//! `Broker` composes the topic queue store, the subscriber registry and the
//! connection tracker behind one `&self` API. It holds no global lock: all
//! state is partitioned per topic (or per connection for the tracker), so it
//! is shared across connection tasks as a plain `Arc<Broker>`.
//!
//! A subscriber that cannot accept a broadcast frame is evicted: it is
//! removed from every topic it joined and asked to shut down.

use serde::Serialize;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::queue::TopicQueueStore;
use crate::broker::registry::SubscriberRegistry;
use crate::broker::tracker::ConnectionTracker;
use crate::client::{Client, ConnectionId};
use crate::utils::BrokerError;

/// What a broadcast achieved, after evictions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub evicted: Vec<ConnectionId>,
}

#[derive(Debug, Default)]
pub struct Broker {
    queues: TopicQueueStore,
    registry: SubscriberRegistry,
    tracker: ConnectionTracker,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, topic: &str, payload: String) {
        self.queues.enqueue(topic, payload);
    }

    pub fn dequeue(&self, topic: &str) -> Option<String> {
        self.queues.dequeue(topic)
    }

    /// Subscribe `client` to `topic`. Idempotent; returns `true` only for a
    /// new subscription.
    ///
    /// The registry insert happens before the tracker record. A
    /// `remove_connection` from another task that lands between the two
    /// leaves the new topic recorded, so the connection's own final cleanup
    /// still finds and removes it.
    pub fn subscribe(&self, topic: &str, client: &Client) -> bool {
        let added = self.registry.subscribe(topic, client);
        if added {
            self.tracker.record(client.id, topic);
        }
        added
    }

    /// Serialize `value` once and push it to every subscriber of `topic`.
    pub fn broadcast<T: Serialize>(
        &self,
        topic: &str,
        value: &T,
    ) -> Result<BroadcastOutcome, BrokerError> {
        let text = serde_json::to_string(value)?;
        let report = self.registry.broadcast(topic, &WsMessage::text(text));

        // registry guard is released; eviction takes its own locks
        let mut evicted = Vec::with_capacity(report.failed.len());
        for client in report.failed {
            self.remove_connection(&client.id);
            client.close();
            evicted.push(client.id);
        }

        Ok(BroadcastOutcome {
            delivered: report.delivered,
            evicted,
        })
    }

    /// Remove `id` from every topic it is subscribed to. Safe to call more
    /// than once and concurrently with broadcasts; once this returns no
    /// broadcast can reach the connection.
    pub fn remove_connection(&self, id: &ConnectionId) {
        let topics = self.tracker.take(id);
        if topics.is_empty() {
            debug!("No subscriptions to clean up for {id}");
            return;
        }

        for topic in &topics {
            if self.registry.unsubscribe(topic, id) {
                debug!("Unsubscribed {id} from topic {topic}");
            } else {
                warn!("{id} was tracked on topic {topic} but not registered there");
            }
        }

        info!("Cleaned up {id} from {} topic(s)", topics.len());
    }

    pub fn queue_len(&self, topic: &str) -> usize {
        self.queues.len(topic)
    }

    pub fn has_queue(&self, topic: &str) -> bool {
        self.queues.contains_topic(topic)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry.subscriber_count(topic)
    }

    pub fn is_subscribed(&self, topic: &str, id: &ConnectionId) -> bool {
        self.registry.is_subscribed(topic, id)
    }

    pub fn subscriptions_of(&self, id: &ConnectionId) -> Vec<String> {
        self.tracker.topics_for(id)
    }

    /// Number of connections that currently hold at least one subscription.
    pub fn subscribed_connections(&self) -> usize {
        self.tracker.connection_count()
    }
}
