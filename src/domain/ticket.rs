use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sentiment::SentimentScore;
use crate::workflow::TicketStatus;

pub type TicketId = u64;
pub type CommentId = u64;
pub type UserId = u64;
pub type CategoryId = u64;

/// The closed set of category labels the scoring provider may suggest.
pub const CATEGORY_CATALOG: [&str; 6] = [
    "Technical Support",
    "Billing",
    "Account Management",
    "Product Inquiry",
    "Feature Request",
    "General",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    /// The catalog with ids assigned in declaration order, starting at 1.
    pub fn catalog() -> Vec<Category> {
        CATEGORY_CATALOG
            .iter()
            .zip(1..)
            .map(|(name, id)| Category {
                id,
                name: (*name).to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
            Priority::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Who performed a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    User(UserId),
    System,
}

impl Actor {
    pub fn user_id(self) -> Option<UserId> {
        match self {
            Actor::User(id) => Some(id),
            Actor::System => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{id}"),
            Actor::System => write!(f, "system"),
        }
    }
}

/// A support ticket as owned by the record-keeping side.
///
/// Fields split into two families: the record family (title through `resolved_at`),
/// written by user actions and workflow transitions under the row `version`, and the
/// enrichment family (`sentiment_score`, `suggested_category`), written only by the
/// result applier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    pub customer_id: UserId,
    pub assigned_agent: Option<UserId>,
    pub category: Category,
    pub priority: Priority,
    pub status: TicketStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub sentiment_score: Option<SentimentScore>,
    pub suggested_category: Option<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// Input for creating a ticket.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub customer_id: UserId,
    pub category_id: CategoryId,
    pub priority: Priority,
}

/// Editable content fields of an existing ticket.
#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub ticket_id: TicketId,
    pub author: Actor,
    pub content: String,
    pub internal: bool,
    pub sentiment_score: Option<SentimentScore>,
    pub created_at: DateTime<Utc>,
}

/// A comment not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub ticket_id: TicketId,
    pub author: Actor,
    pub content: String,
    pub internal: bool,
}
