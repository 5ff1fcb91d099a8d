use std::time::Duration;

use tokio::time::timeout;

use super::provider::{Analysis, ScoreRequest, SentimentProvider};
use crate::bus::{Envelope, EventBus, Subscription};
use crate::domain::SentimentScore;
use crate::error::ProviderError;
use crate::events::{
    Correlation, DomainEventPublisher, EnrichmentResult, LifecycleEvent, SuggestedCategory,
};

/// What came out of one provider call. Failures are a value, not an error path.
#[derive(Debug)]
pub enum EnrichmentOutcome {
    Scored(Analysis),
    Fallback(ProviderError),
}

/// Consumes lifecycle events and emits exactly one enrichment result per event.
pub struct EnrichmentOrchestrator<P, B> {
    provider: P,
    publisher: DomainEventPublisher<B>,
    timeout: Duration,
}

impl<P: SentimentProvider, B: EventBus> EnrichmentOrchestrator<P, B> {
    pub fn new(provider: P, publisher: DomainEventPublisher<B>, timeout: Duration) -> Self {
        Self {
            provider,
            publisher,
            timeout,
        }
    }

    /// Calls the provider under the configured timeout.
    pub async fn evaluate(&self, request: &ScoreRequest) -> EnrichmentOutcome {
        match timeout(self.timeout, self.provider.analyze(request)).await {
            Ok(Ok(analysis)) => EnrichmentOutcome::Scored(analysis),
            Ok(Err(e)) => EnrichmentOutcome::Fallback(e),
            Err(_) => EnrichmentOutcome::Fallback(ProviderError::Timeout(
                u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Builds the result for `event`. Always succeeds.
    pub async fn enrich(&self, event: &LifecycleEvent) -> EnrichmentResult {
        let correlation = event.correlation();
        let request = ScoreRequest::for_event(event);
        match self.evaluate(&request).await {
            EnrichmentOutcome::Scored(analysis) => {
                tracing::info!(
                    %correlation,
                    provider = self.provider.name(),
                    sentiment = %analysis.score,
                    category = analysis.category.as_deref().unwrap_or("-"),
                    "Scored lifecycle event"
                );
                result_for(correlation, analysis.score, analysis.category)
            }
            EnrichmentOutcome::Fallback(e) => {
                tracing::warn!(
                    %correlation,
                    provider = self.provider.name(),
                    error = %e,
                    "Scoring failed, emitting neutral result"
                );
                EnrichmentResult::fallback(correlation)
            }
        }
    }

    /// Enriches one event and publishes the result.
    pub async fn process(&self, event: &LifecycleEvent) -> EnrichmentResult {
        let result = self.enrich(event).await;
        self.publisher.publish_result(&result).await;
        result
    }

    /// Decodes and processes one message. Undecodable messages are logged and skipped.
    pub async fn handle_envelope(&self, envelope: &Envelope) -> Option<EnrichmentResult> {
        match envelope.decode::<LifecycleEvent>() {
            Ok(event) => Some(self.process(&event).await),
            Err(e) => {
                tracing::error!(
                    topic = %envelope.topic,
                    key = %envelope.key,
                    error = %e,
                    "Skipping undecodable lifecycle message"
                );
                None
            }
        }
    }

    /// Runs until the subscription closes. Returns the number of results emitted.
    pub async fn run(self, mut subscription: Subscription) -> usize {
        tracing::info!(topics = ?subscription.topics(), "Enrichment consumer started");
        let mut processed = 0;
        while let Some(envelope) = subscription.next().await {
            if self.handle_envelope(&envelope).await.is_some() {
                processed += 1;
            }
        }
        tracing::info!(processed, "Enrichment consumer stopped");
        processed
    }
}

fn result_for(
    correlation: Correlation,
    score: SentimentScore,
    category: Option<String>,
) -> EnrichmentResult {
    match correlation {
        Correlation::Ticket(id) => {
            EnrichmentResult::for_ticket(id, score, category.map(SuggestedCategory::named))
        }
        Correlation::Comment(id) => EnrichmentResult::for_comment(id, score),
    }
}
