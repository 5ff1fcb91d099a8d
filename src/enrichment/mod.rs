//! Sentiment and category enrichment of lifecycle events.

pub mod orchestrator;
pub mod provider;
pub mod scorer;

pub use orchestrator::{EnrichmentOrchestrator, EnrichmentOutcome};
pub use provider::{Analysis, ScoreRequest, SentimentProvider};
pub use scorer::{KeywordScorer, LlmScorer, extract_analysis};
