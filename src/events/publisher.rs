use serde::Serialize;

use super::{EnrichmentResult, LifecycleEvent};
use crate::bus::EventBus;
use crate::config::Topics;
use crate::error::MessagingError;

/// Fire-and-forget publisher for lifecycle and result events.
///
/// Callers publish only after their local change is committed. A failed publish
/// is logged and swallowed; it never rolls back or fails the triggering operation.
#[derive(Clone)]
pub struct DomainEventPublisher<B> {
    bus: B,
    topics: Topics,
}

impl<B: EventBus> DomainEventPublisher<B> {
    pub fn new(bus: B, topics: Topics) -> Self {
        Self { bus, topics }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Returns whether the bus accepted the event.
    pub async fn publish_lifecycle(&self, event: &LifecycleEvent) -> bool {
        let topic = event.topic(&self.topics);
        let key = event.partition_key();
        tracing::info!(
            event_type = event.event_type(),
            correlation = %event.correlation(),
            "Publishing lifecycle event"
        );
        self.send(topic, &key, event).await
    }

    /// Returns whether the bus accepted the result.
    pub async fn publish_result(&self, result: &EnrichmentResult) -> bool {
        let key = result.correlation().key();
        tracing::info!(
            correlation = %result.correlation(),
            sentiment = %result.sentiment,
            "Publishing analysis result"
        );
        self.send(&self.topics.analysis_result, &key, result).await
    }

    async fn send<T: Serialize + ?Sized>(&self, topic: &str, key: &str, message: &T) -> bool {
        let outcome = match serde_json::to_string(message) {
            Ok(payload) => self.bus.publish(topic, key, payload).await,
            Err(e) => Err(MessagingError::PublishFailed {
                topic: topic.to_string(),
                reason: format!("serialization failed: {e}"),
            }),
        };
        match outcome {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(topic, key, error = %e, "Failed to publish event");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryEventBus;
    use crate::events::{Correlation, TicketUpdated};
    use chrono::Utc;

    struct FailingBus;

    impl EventBus for FailingBus {
        async fn publish(
            &self,
            topic: &str,
            _key: &str,
            _payload: String,
        ) -> Result<(), MessagingError> {
            Err(MessagingError::PublishFailed {
                topic: topic.to_string(),
                reason: "broker unavailable".into(),
            })
        }
    }

    fn updated() -> LifecycleEvent {
        LifecycleEvent::TicketUpdated(TicketUpdated {
            ticket_id: 4,
            title: "Slow dashboard".into(),
            description: "Takes a minute to load".into(),
            status_name: "IN_PROGRESS".into(),
            updated_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn lifecycle_goes_to_its_topic_keyed_by_id() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(&["ticket-updated"]);
        let publisher = DomainEventPublisher::new(bus, Topics::default());

        let event = updated();
        assert!(publisher.publish_lifecycle(&event).await);

        let envelope = sub.next().await.unwrap();
        assert_eq!(envelope.key, "4");
        let decoded: LifecycleEvent = envelope.decode().unwrap();
        assert_eq!(decoded, event);
    }

    #[tokio::test]
    async fn result_goes_to_result_topic() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(&["ai-analysis-result"]);
        let publisher = DomainEventPublisher::new(bus, Topics::default());

        let result = EnrichmentResult::fallback(Correlation::Comment(42));
        assert!(publisher.publish_result(&result).await);

        let envelope = sub.next().await.unwrap();
        assert_eq!(envelope.key, "42");
        let decoded: EnrichmentResult = envelope.decode().unwrap();
        assert_eq!(decoded.correlation(), Correlation::Comment(42));
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let publisher = DomainEventPublisher::new(FailingBus, Topics::default());
        assert!(!publisher.publish_lifecycle(&updated()).await);
        assert!(
            !publisher
                .publish_result(&EnrichmentResult::fallback(Correlation::Ticket(1)))
                .await
        );
    }
}
