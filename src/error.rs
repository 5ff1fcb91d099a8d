use thiserror::Error;

use crate::anthropic::AnthropicError;
use crate::events::Correlation;
use crate::workflow::TicketStatus;

/// Top-level error for record-keeping operations.
///
/// Only validation and not-found failures reach callers. Provider and messaging
/// failures are handled inside the asynchronous pipeline and never surface here.
#[derive(Debug, Error)]
pub enum TicketingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error(
        "Invalid status transition: cannot transition from {from} to {to}. Allowed transitions: {}",
        describe_targets(.allowed)
    )]
    InvalidTransition {
        from: TicketStatus,
        to: TicketStatus,
        allowed: Vec<TicketStatus>,
    },

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Sentiment score must be between -1.0 and 1.0, got {0}")]
    ScoreOutOfRange(f64),

    #[error("Field `{0}` must not be blank")]
    BlankField(&'static str),

    #[error("Category not found: {0}")]
    UnknownCategory(String),

    #[error("Ticket {ticket_id} is already assigned to agent {agent_id}")]
    AlreadyAssigned { ticket_id: u64, agent_id: u64 },

    #[error("Ticket {0} is not currently assigned")]
    NotAssigned(u64),

    #[error("Ticket is already assigned to agent {0}")]
    SameAgent(u64),
}

fn describe_targets(targets: &[TicketStatus]) -> String {
    if targets.is_empty() {
        return "NONE (terminal state)".to_string();
    }
    targets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("Ticket not found with ID: {0}")]
    Ticket(u64),

    #[error("Comment not found with ID: {0}")]
    Comment(u64),

    #[error("Unresolved correlation: no entity for {0}")]
    Correlation(Correlation),
}

/// Failure of a single scoring call. Always recovered by a fallback result.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Scoring provider timed out after {0}ms")]
    Timeout(u64),

    #[error("Scoring provider call failed: {0}")]
    Api(#[from] AnthropicError),

    #[error("Scoring provider returned an empty response")]
    EmptyResponse,

    #[error("Malformed provider output: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error)]
pub enum MessagingError {
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("Subscription closed")]
    Closed,

    #[error("Failed to decode message on topic '{topic}': {reason}")]
    Decode { topic: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Version conflict on ticket {ticket_id}: expected {expected}, found {actual}")]
    VersionConflict {
        ticket_id: u64,
        expected: u64,
        actual: u64,
    },

    #[error("Ticket {0} does not exist")]
    TicketNotFound(u64),

    #[error("Comment {0} does not exist")]
    CommentNotFound(u64),
}

impl TicketingError {
    /// Maps store misses onto the caller-facing not-found variant.
    pub(crate) fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { .. } => TicketingError::Store(err),
            StoreError::TicketNotFound(id) => TicketingError::NotFound(NotFoundError::Ticket(id)),
            StoreError::CommentNotFound(id) => {
                TicketingError::NotFound(NotFoundError::Comment(id))
            }
        }
    }
}
