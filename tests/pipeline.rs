use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;

use tickflow::applier::ResultApplier;
use tickflow::bus::{EventBus, InMemoryEventBus};
use tickflow::config::Topics;
use tickflow::domain::{Actor, Comment, NewTicket, Priority, SentimentScore};
use tickflow::enrichment::{Analysis, EnrichmentOrchestrator, ScoreRequest, SentimentProvider};
use tickflow::error::ProviderError;
use tickflow::events::{DomainEventPublisher, LifecycleEvent};
use tickflow::service::TicketService;
use tickflow::store::{InMemoryStore, TicketStore};
use tickflow::workflow::TicketStatus;

/// Answers tickets with a fixed score and category; never answers comments.
struct ScriptedProvider;

impl SentimentProvider for ScriptedProvider {
    async fn analyze(&self, request: &ScoreRequest) -> Result<Analysis, ProviderError> {
        match request {
            ScoreRequest::Ticket { .. } => Ok(Analysis {
                score: SentimentScore::clamped(-0.8),
                category: Some("Billing".into()),
            }),
            ScoreRequest::Comment { .. } => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Analysis::neutral())
            }
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct Pipeline {
    store: Arc<InMemoryStore>,
    bus: InMemoryEventBus,
    service: TicketService<InMemoryStore, InMemoryEventBus>,
    enrichment: tokio::task::JoinHandle<usize>,
    applier: tokio::task::JoinHandle<usize>,
    topics: Topics,
}

impl Pipeline {
    fn start() -> Self {
        let topics = Topics::default();
        let store = Arc::new(InMemoryStore::new());
        let bus = InMemoryEventBus::new();
        let publisher = DomainEventPublisher::new(bus.clone(), topics.clone());
        let service = TicketService::new(Arc::clone(&store), publisher.clone());

        let lifecycle = bus.subscribe(&topics.lifecycle());
        let results = bus.subscribe(&[topics.analysis_result.as_str()]);
        let orchestrator =
            EnrichmentOrchestrator::new(ScriptedProvider, publisher, Duration::from_millis(100));
        let enrichment = tokio::spawn(orchestrator.run(lifecycle));
        let applier = tokio::spawn(ResultApplier::new(Arc::clone(&store)).run(results));

        Self {
            store,
            bus,
            service,
            enrichment,
            applier,
            topics,
        }
    }

    /// Closes every topic in pipeline order and returns (scored, applied).
    async fn drain(self) -> (usize, usize) {
        self.bus.close_topics(&self.topics.lifecycle());
        let scored = self.enrichment.await.unwrap();
        self.bus
            .close_topics(&[self.topics.analysis_result.as_str()]);
        let applied = self.applier.await.unwrap();
        (scored, applied)
    }
}

#[tokio::test]
async fn created_ticket_gets_sentiment_and_category_without_status_change() {
    let pipeline = Pipeline::start();
    let ticket = pipeline
        .service
        .create_ticket(NewTicket {
            title: "Charged twice".into(),
            description: "I want my money back".into(),
            customer_id: 10,
            category_id: 6,
            priority: Priority::High,
        })
        .await
        .unwrap();

    let store = Arc::clone(&pipeline.store);
    assert_eq!(pipeline.drain().await, (1, 1));

    let stored = store.ticket(ticket.id).unwrap();
    assert_eq!(stored.sentiment_score, Some(SentimentScore::clamped(-0.8)));
    assert_eq!(stored.suggested_category.unwrap().name, "Billing");
    assert_eq!(stored.category.name, "General");
    assert_eq!(stored.status, TicketStatus::Open);
    assert_eq!(stored.version, ticket.version);
}

#[tokio::test]
async fn comment_timeout_yields_neutral_result_on_the_wire() {
    let pipeline = Pipeline::start();
    let mut observer = pipeline.bus.subscribe(&["ai-analysis-result"]);

    let ticket = pipeline
        .service
        .create_ticket(NewTicket {
            title: "Login broken".into(),
            description: "Cannot sign in".into(),
            customer_id: 10,
            category_id: 3,
            priority: Priority::Medium,
        })
        .await
        .unwrap();

    let comment = pipeline
        .store
        .insert_comment(Comment {
            id: 42,
            ticket_id: ticket.id,
            author: Actor::User(10),
            content: "Hello?".into(),
            internal: false,
            sentiment_score: None,
            created_at: Utc::now(),
        })
        .unwrap();
    let event = LifecycleEvent::comment_created(&comment);
    pipeline
        .bus
        .publish(
            &pipeline.topics.comment_created,
            &event.partition_key(),
            serde_json::to_string(&event).unwrap(),
        )
        .await
        .unwrap();

    let store = Arc::clone(&pipeline.store);
    assert_eq!(pipeline.drain().await, (2, 2));

    let mut comment_results = Vec::new();
    while let Ok(envelope) = observer.try_next() {
        let json: Value = serde_json::from_str(&envelope.payload).unwrap();
        if json.get("commentId").is_some() {
            comment_results.push(json);
        }
    }
    assert_eq!(comment_results.len(), 1);
    let result = &comment_results[0];
    assert_eq!(result["commentId"], 42);
    assert_eq!(result["sentimentScore"], 0.0);
    assert_eq!(result["eventType"], "AI_ANALYSIS_RESULT");
    assert!(result.get("ticketId").is_none());
    assert!(result.get("suggestedCategoryName").is_none());

    assert_eq!(
        store.comment(42).unwrap().sentiment_score,
        Some(SentimentScore::NEUTRAL)
    );
}

#[tokio::test]
async fn every_lifecycle_event_gets_exactly_one_result() {
    let pipeline = Pipeline::start();
    let mut observer = pipeline.bus.subscribe(&["ai-analysis-result"]);

    let ticket = pipeline
        .service
        .create_ticket(NewTicket {
            title: "Invoice question".into(),
            description: "Which plan am I on?".into(),
            customer_id: 10,
            category_id: 2,
            priority: Priority::Low,
        })
        .await
        .unwrap();
    pipeline
        .service
        .transition(
            ticket.id,
            TicketStatus::InProgress,
            Actor::User(20),
            Some("checking"),
        )
        .await
        .unwrap();
    pipeline
        .service
        .transition(ticket.id, TicketStatus::Resolved, Actor::User(20), None)
        .await
        .unwrap();

    let store = Arc::clone(&pipeline.store);
    assert_eq!(pipeline.drain().await, (3, 3));

    let mut ticket_ids = Vec::new();
    while let Ok(envelope) = observer.try_next() {
        let json: Value = serde_json::from_str(&envelope.payload).unwrap();
        assert!(json.get("commentId").is_none());
        ticket_ids.push(json["ticketId"].as_u64().unwrap());
    }
    assert_eq!(ticket_ids, vec![ticket.id; 3]);

    let stored = store.ticket(ticket.id).unwrap();
    assert_eq!(stored.status, TicketStatus::Resolved);
    assert!(stored.resolved_at.is_some());
    assert_eq!(stored.sentiment_score, Some(SentimentScore::clamped(-0.8)));
}
