mod analysis;
mod lifecycle;
mod publisher;

pub use analysis::{
    ANALYSIS_RESULT_EVENT_TYPE, AnalysisResultMessage, AnalysisTarget, Correlation,
    CorrelationError, EnrichmentResult, SuggestedCategory,
};
pub use lifecycle::{CommentCreated, LifecycleEvent, TicketCreated, TicketUpdated};
pub use publisher::DomainEventPublisher;
