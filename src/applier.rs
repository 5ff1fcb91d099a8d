use std::sync::Arc;

use crate::bus::{Envelope, Subscription};
use crate::domain::{Category, Comment, Ticket};
use crate::error::NotFoundError;
use crate::events::{AnalysisTarget, EnrichmentResult, SuggestedCategory};
use crate::store::TicketStore;

/// What an applied result touched.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Ticket(Ticket),
    Comment(Comment),
}

/// Merges enrichment results back into the record store.
///
/// Writes only the enrichment fields, so applying the same result again leaves the
/// store unchanged and never races with workflow saves.
pub struct ResultApplier<S> {
    store: Arc<S>,
}

impl<S: TicketStore> ResultApplier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn apply(&self, result: &EnrichmentResult) -> Result<Applied, NotFoundError> {
        let unresolved = || NotFoundError::Correlation(result.correlation());
        match &result.target {
            AnalysisTarget::Comment { comment_id } => self
                .store
                .update_comment_sentiment(*comment_id, result.sentiment)
                .map(Applied::Comment)
                .map_err(|_| unresolved()),
            AnalysisTarget::Ticket {
                ticket_id,
                suggested_category,
            } => {
                let category = suggested_category
                    .as_ref()
                    .and_then(|suggestion| self.resolve_category(suggestion));
                self.store
                    .update_ticket_analysis(*ticket_id, result.sentiment, category)
                    .map(Applied::Ticket)
                    .map_err(|_| unresolved())
            }
        }
    }

    /// Looks a suggestion up by id first, then by name.
    fn resolve_category(&self, suggestion: &SuggestedCategory) -> Option<Category> {
        let found = suggestion
            .id
            .and_then(|id| self.store.category(id))
            .or_else(|| {
                suggestion
                    .name
                    .as_deref()
                    .and_then(|name| self.store.category_by_name(name))
            });
        if found.is_none() {
            tracing::warn!(
                id = ?suggestion.id,
                name = suggestion.name.as_deref().unwrap_or("-"),
                "Suggested category not in catalog, applying score only"
            );
        }
        found
    }

    /// Decodes and applies one message. Failures are logged and dropped.
    pub fn handle_envelope(&self, envelope: &Envelope) -> Option<Applied> {
        let result = match envelope.decode::<EnrichmentResult>() {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    topic = %envelope.topic,
                    key = %envelope.key,
                    error = %e,
                    "Skipping undecodable analysis result"
                );
                return None;
            }
        };
        match self.apply(&result) {
            Ok(applied) => {
                tracing::info!(
                    correlation = %result.correlation(),
                    sentiment = %result.sentiment,
                    "Applied analysis result"
                );
                Some(applied)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping analysis result");
                None
            }
        }
    }

    /// Runs until the subscription closes. Returns the number of results applied.
    pub async fn run(self, mut subscription: Subscription) -> usize {
        tracing::info!(topics = ?subscription.topics(), "Result applier started");
        let mut applied = 0;
        while let Some(envelope) = subscription.next().await {
            if self.handle_envelope(&envelope).is_some() {
                applied += 1;
            }
        }
        tracing::info!(applied, "Result applier stopped");
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{EventBus, InMemoryEventBus};
    use crate::domain::{Actor, CommentId, Priority, SentimentScore, TicketId};
    use crate::events::Correlation;
    use crate::store::InMemoryStore;
    use crate::workflow::TicketStatus;
    use chrono::Utc;

    fn seeded() -> (Arc<InMemoryStore>, TicketId, CommentId) {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let ticket = store.insert_ticket(Ticket {
            id: store.next_ticket_id(),
            title: "Refund".into(),
            description: "Charged twice".into(),
            customer_id: 1,
            assigned_agent: None,
            category: store.category(6).unwrap(),
            priority: Priority::High,
            status: TicketStatus::InProgress,
            resolved_at: None,
            sentiment_score: None,
            suggested_category: None,
            created_at: now,
            updated_at: now,
            version: 0,
        });
        let comment = store
            .insert_comment(Comment {
                id: store.next_comment_id(),
                ticket_id: ticket.id,
                author: Actor::User(1),
                content: "Any news?".into(),
                internal: false,
                sentiment_score: None,
                created_at: now,
            })
            .unwrap();
        (store, ticket.id, comment.id)
    }

    fn score(v: f64) -> SentimentScore {
        SentimentScore::new(v).unwrap()
    }

    #[test]
    fn ticket_result_sets_score_and_category_only() {
        let (store, ticket_id, _) = seeded();
        let before = store.ticket(ticket_id).unwrap();
        let applier = ResultApplier::new(Arc::clone(&store));

        let result = EnrichmentResult::for_ticket(
            ticket_id,
            score(-0.8),
            Some(SuggestedCategory::named("Billing")),
        );
        let Applied::Ticket(ticket) = applier.apply(&result).unwrap() else {
            panic!("expected a ticket");
        };
        assert_eq!(ticket.sentiment_score, Some(score(-0.8)));
        assert_eq!(ticket.suggested_category.unwrap().name, "Billing");
        assert_eq!(ticket.status, before.status);
        assert_eq!(ticket.version, before.version);
        assert_eq!(ticket.category, before.category);
    }

    #[test]
    fn category_resolves_by_id_before_name() {
        let (store, ticket_id, _) = seeded();
        let applier = ResultApplier::new(Arc::clone(&store));
        let result = EnrichmentResult::for_ticket(
            ticket_id,
            score(0.1),
            Some(SuggestedCategory {
                id: Some(3),
                name: Some("Billing".into()),
            }),
        );
        applier.apply(&result).unwrap();
        assert_eq!(
            store.ticket(ticket_id).unwrap().suggested_category.unwrap().name,
            "Account Management"
        );
    }

    #[test]
    fn unknown_category_still_applies_score() {
        let (store, ticket_id, _) = seeded();
        let applier = ResultApplier::new(Arc::clone(&store));
        let result = EnrichmentResult::for_ticket(
            ticket_id,
            score(0.5),
            Some(SuggestedCategory::named("Shipping")),
        );
        applier.apply(&result).unwrap();
        let ticket = store.ticket(ticket_id).unwrap();
        assert_eq!(ticket.sentiment_score, Some(score(0.5)));
        assert_eq!(ticket.suggested_category, None);
    }

    #[test]
    fn comment_result_updates_comment() {
        let (store, ticket_id, comment_id) = seeded();
        let applier = ResultApplier::new(Arc::clone(&store));
        applier
            .apply(&EnrichmentResult::fallback(Correlation::Comment(comment_id)))
            .unwrap();
        assert_eq!(
            store.comment(comment_id).unwrap().sentiment_score,
            Some(SentimentScore::NEUTRAL)
        );
        assert_eq!(store.ticket(ticket_id).unwrap().sentiment_score, None);
    }

    #[test]
    fn unknown_target_is_unresolved() {
        let (store, _, _) = seeded();
        let applier = ResultApplier::new(store);
        let err = applier
            .apply(&EnrichmentResult::fallback(Correlation::Comment(999)))
            .unwrap_err();
        assert_eq!(err, NotFoundError::Correlation(Correlation::Comment(999)));
    }

    #[test]
    fn applying_twice_equals_applying_once() {
        let (store, ticket_id, _) = seeded();
        let applier = ResultApplier::new(Arc::clone(&store));
        let result = EnrichmentResult::for_ticket(
            ticket_id,
            score(-0.4),
            Some(SuggestedCategory::named("Billing")),
        );
        applier.apply(&result).unwrap();
        let once = store.ticket(ticket_id).unwrap();
        applier.apply(&result).unwrap();
        assert_eq!(store.ticket(ticket_id).unwrap(), once);
    }

    #[tokio::test]
    async fn run_applies_and_skips_invalid_messages() {
        let (store, ticket_id, comment_id) = seeded();
        let bus = InMemoryEventBus::new();
        let sub = bus.subscribe(&["ai-analysis-result"]);
        let handle = tokio::spawn(ResultApplier::new(Arc::clone(&store)).run(sub));

        let both_ids = format!(
            r#"{{"ticketId":{ticket_id},"commentId":{comment_id},"sentimentScore":0.2,"analyzedAt":"2025-01-01T00:00:00Z","eventType":"AI_ANALYSIS_RESULT"}}"#
        );
        let comment_only = format!(
            r#"{{"commentId":{comment_id},"sentimentScore":7.5,"analyzedAt":"2025-01-01T00:00:00Z","eventType":"AI_ANALYSIS_RESULT"}}"#
        );
        for payload in [both_ids, "garbage".to_string(), comment_only] {
            bus.publish("ai-analysis-result", "k", payload).await.unwrap();
        }
        bus.close_topics(&["ai-analysis-result"]);

        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(
            store.comment(comment_id).unwrap().sentiment_score,
            Some(score(1.0))
        );
        assert_eq!(store.ticket(ticket_id).unwrap().sentiment_score, None);
    }
}
