use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Correlation;
use crate::config::Topics;
use crate::domain::{Comment, CommentId, Ticket, TicketId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreated {
    pub ticket_id: TicketId,
    pub title: String,
    pub description: String,
    pub category_name: Option<String>,
    pub priority_name: Option<String>,
    pub customer_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdated {
    pub ticket_id: TicketId,
    pub title: String,
    pub description: String,
    pub status_name: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreated {
    pub comment_id: CommentId,
    pub ticket_id: TicketId,
    pub content: String,
    pub is_internal: bool,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// A ticket or comment lifecycle change, as published by the record-keeping side.
///
/// Serialized with an `eventType` discriminator (`TICKET_CREATED`, `TICKET_UPDATED`,
/// `COMMENT_CREATED`) next to the payload fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEvent {
    TicketCreated(TicketCreated),
    TicketUpdated(TicketUpdated),
    CommentCreated(CommentCreated),
}

impl LifecycleEvent {
    pub fn ticket_created(ticket: &Ticket) -> Self {
        LifecycleEvent::TicketCreated(TicketCreated {
            ticket_id: ticket.id,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            category_name: Some(ticket.category.name.clone()),
            priority_name: Some(ticket.priority.to_string()),
            customer_id: ticket.customer_id,
            created_at: ticket.created_at,
        })
    }

    pub fn ticket_updated(ticket: &Ticket) -> Self {
        LifecycleEvent::TicketUpdated(TicketUpdated {
            ticket_id: ticket.id,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            status_name: ticket.status.to_string(),
            updated_at: ticket.updated_at,
        })
    }

    pub fn comment_created(comment: &Comment) -> Self {
        LifecycleEvent::CommentCreated(CommentCreated {
            comment_id: comment.id,
            ticket_id: comment.ticket_id,
            content: comment.content.clone(),
            is_internal: comment.internal,
            user_id: comment.author.user_id(),
            created_at: comment.created_at,
        })
    }

    /// The entity a result for this event must be routed back to.
    pub fn correlation(&self) -> Correlation {
        match self {
            LifecycleEvent::TicketCreated(e) => Correlation::Ticket(e.ticket_id),
            LifecycleEvent::TicketUpdated(e) => Correlation::Ticket(e.ticket_id),
            LifecycleEvent::CommentCreated(e) => Correlation::Comment(e.comment_id),
        }
    }

    pub fn partition_key(&self) -> String {
        self.correlation().key()
    }

    pub fn topic<'a>(&self, topics: &'a Topics) -> &'a str {
        match self {
            LifecycleEvent::TicketCreated(_) => &topics.ticket_created,
            LifecycleEvent::TicketUpdated(_) => &topics.ticket_updated,
            LifecycleEvent::CommentCreated(_) => &topics.comment_created,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            LifecycleEvent::TicketCreated(_) => "TICKET_CREATED",
            LifecycleEvent::TicketUpdated(_) => "TICKET_UPDATED",
            LifecycleEvent::CommentCreated(_) => "COMMENT_CREATED",
        }
    }
}
