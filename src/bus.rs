//! Messaging seam between the two services.
//!
//! Messages are JSON payloads published to named topics with a partition key.
//! Delivery is at-least-once; consumers must tolerate duplicates. Ordering is
//! guaranteed per key: everything a subscription receives arrives in publish order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::MessagingError;

/// One message as seen by a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub id: Uuid,
    pub topic: String,
    pub key: String,
    pub payload: String,
    pub published_at: DateTime<Utc>,
}

impl Envelope {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, MessagingError> {
        serde_json::from_str(&self.payload).map_err(|e| MessagingError::Decode {
            topic: self.topic.clone(),
            reason: e.to_string(),
        })
    }
}

pub trait EventBus: Send + Sync + 'static {
    /// Publishes `payload` to `topic`, partitioned by `key`.
    fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: String,
    ) -> impl Future<Output = Result<(), MessagingError>> + Send;
}

/// Receiving end of a subscription. Ends once the bus closes all its topics.
pub struct Subscription {
    topics: Vec<String>,
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Subscription {
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Waits for the next message; `None` once the subscription is closed and drained.
    pub async fn next(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Non-blocking poll.
    pub fn try_next(&mut self) -> Result<Envelope, MessagingError> {
        self.rx.try_recv().map_err(|_| MessagingError::Closed)
    }
}

/// In-process bus with one ordered channel per subscription.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    routes: Arc<Mutex<HashMap<String, Vec<mpsc::UnboundedSender<Envelope>>>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `topics`. Only messages published afterwards are delivered.
    pub fn subscribe(&self, topics: &[&str]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut routes = self.routes.lock();
        for topic in topics {
            routes
                .entry((*topic).to_string())
                .or_default()
                .push(tx.clone());
        }
        Subscription {
            topics: topics.iter().map(|t| (*t).to_string()).collect(),
            rx,
        }
    }

    /// Stops delivery on `topics`. Subscriptions end once none of their topics remain open.
    pub fn close_topics(&self, topics: &[&str]) {
        let mut routes = self.routes.lock();
        for topic in topics {
            routes.remove(*topic);
        }
    }

    fn deliver(&self, envelope: Envelope) -> usize {
        let mut routes = self.routes.lock();
        let Some(senders) = routes.get_mut(&envelope.topic) else {
            return 0;
        };
        senders.retain(|tx| tx.send(envelope.clone()).is_ok());
        senders.len()
    }
}

impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, key: &str, payload: String) -> Result<(), MessagingError> {
        let envelope = Envelope {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            key: key.to_string(),
            payload,
            published_at: Utc::now(),
        };
        let delivered = self.deliver(envelope);
        tracing::debug!(topic, key, subscribers = delivered, "Message published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(&["a", "b"]);

        bus.publish("a", "1", "first".into()).await.unwrap();
        bus.publish("b", "1", "second".into()).await.unwrap();
        bus.publish("a", "2", "third".into()).await.unwrap();

        let payloads: Vec<String> = [
            sub.next().await.unwrap(),
            sub.next().await.unwrap(),
            sub.next().await.unwrap(),
        ]
        .into_iter()
        .map(|env| env.payload)
        .collect();
        assert_eq!(payloads, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn fans_out_to_every_subscriber() {
        let bus = InMemoryEventBus::new();
        let mut one = bus.subscribe(&["t"]);
        let mut two = bus.subscribe(&["t"]);

        bus.publish("t", "k", "{}".into()).await.unwrap();

        assert_eq!(one.next().await.unwrap().key, "k");
        assert_eq!(two.next().await.unwrap().key, "k");
    }

    #[tokio::test]
    async fn unrelated_topics_are_not_delivered() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(&["wanted"]);
        bus.publish("other", "k", "{}".into()).await.unwrap();
        assert!(sub.try_next().is_err());
    }

    #[tokio::test]
    async fn closing_topics_ends_subscription_after_drain() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(&["t"]);
        bus.publish("t", "k", "last".into()).await.unwrap();
        bus.close_topics(&["t"]);

        assert_eq!(sub.next().await.unwrap().payload, "last");
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned() {
        let bus = InMemoryEventBus::new();
        let sub = bus.subscribe(&["t"]);
        drop(sub);
        bus.publish("t", "k", "{}".into()).await.unwrap();
        assert_eq!(bus.routes.lock().get("t").map(Vec::len), Some(0));
    }

    #[test]
    fn decode_reports_topic() {
        let envelope = Envelope {
            id: Uuid::new_v4(),
            topic: "ticket-created".into(),
            key: "1".into(),
            payload: "not json".into(),
            published_at: Utc::now(),
        };
        let err = envelope.decode::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, MessagingError::Decode { topic, .. } if topic == "ticket-created"));
    }
}
