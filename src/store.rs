//! Persistence seam for the record-keeping side.
//!
//! Concurrency contract for the ticket row:
//! - [`TicketStore::save_ticket`] writes only the record-family fields and is guarded
//!   by an optimistic check on `version`, which it increments.
//! - [`TicketStore::update_ticket_analysis`] writes only the enrichment-family fields
//!   and neither checks nor bumps `version`.
//!
//! The two writers therefore never discard each other's changes, and two workflow
//! writers racing on the same row are serialized by the version check.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::{
    AuditEntry, Category, CategoryId, Comment, CommentId, SentimentScore, Ticket, TicketId,
};
use crate::error::StoreError;

pub trait TicketStore: Send + Sync + 'static {
    fn next_ticket_id(&self) -> TicketId;
    fn next_comment_id(&self) -> CommentId;

    /// Stores a new ticket with `version = 1`.
    fn insert_ticket(&self, ticket: Ticket) -> Ticket;
    fn ticket(&self, id: TicketId) -> Option<Ticket>;

    /// Persists the record-family fields of `ticket` if its `version` still matches.
    /// Returns the stored row with the incremented version.
    fn save_ticket(&self, ticket: &Ticket) -> Result<Ticket, StoreError>;

    /// Removes a ticket and its comments. Audit entries are kept.
    fn delete_ticket(&self, id: TicketId) -> Result<(), StoreError>;

    /// Field-scoped merge of enrichment data. `None` keeps the current suggestion.
    fn update_ticket_analysis(
        &self,
        id: TicketId,
        score: SentimentScore,
        suggested: Option<Category>,
    ) -> Result<Ticket, StoreError>;

    fn insert_comment(&self, comment: Comment) -> Result<Comment, StoreError>;
    fn comment(&self, id: CommentId) -> Option<Comment>;
    fn comments_for(&self, ticket_id: TicketId) -> Vec<Comment>;
    fn delete_comment(&self, id: CommentId) -> Result<(), StoreError>;
    fn update_comment_sentiment(
        &self,
        id: CommentId,
        score: SentimentScore,
    ) -> Result<Comment, StoreError>;

    fn append_audit(&self, entry: AuditEntry);
    fn audit_for(&self, ticket_id: TicketId) -> Vec<AuditEntry>;

    fn category(&self, id: CategoryId) -> Option<Category>;
    fn category_by_name(&self, name: &str) -> Option<Category>;
}

#[derive(Default)]
struct Tables {
    tickets: BTreeMap<TicketId, Ticket>,
    comments: BTreeMap<CommentId, Comment>,
    audit: Vec<AuditEntry>,
    categories: Vec<Category>,
    last_ticket_id: TicketId,
    last_comment_id: CommentId,
}

/// In-process store used by the demo binary and tests.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// A store seeded with the category catalog.
    pub fn new() -> Self {
        Self::with_categories(Category::catalog())
    }

    pub fn with_categories(categories: Vec<Category>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                categories,
                ..Tables::default()
            }),
        }
    }
}

impl TicketStore for InMemoryStore {
    fn next_ticket_id(&self) -> TicketId {
        let mut tables = self.tables.write();
        tables.last_ticket_id += 1;
        tables.last_ticket_id
    }

    fn next_comment_id(&self) -> CommentId {
        let mut tables = self.tables.write();
        tables.last_comment_id += 1;
        tables.last_comment_id
    }

    fn insert_ticket(&self, mut ticket: Ticket) -> Ticket {
        ticket.version = 1;
        self.tables
            .write()
            .tickets
            .insert(ticket.id, ticket.clone());
        ticket
    }

    fn ticket(&self, id: TicketId) -> Option<Ticket> {
        self.tables.read().tickets.get(&id).cloned()
    }

    fn save_ticket(&self, ticket: &Ticket) -> Result<Ticket, StoreError> {
        let mut tables = self.tables.write();
        let stored = tables
            .tickets
            .get_mut(&ticket.id)
            .ok_or(StoreError::TicketNotFound(ticket.id))?;

        if stored.version != ticket.version {
            return Err(StoreError::VersionConflict {
                ticket_id: ticket.id,
                expected: ticket.version,
                actual: stored.version,
            });
        }

        stored.title.clone_from(&ticket.title);
        stored.description.clone_from(&ticket.description);
        stored.customer_id = ticket.customer_id;
        stored.assigned_agent = ticket.assigned_agent;
        stored.category.clone_from(&ticket.category);
        stored.priority = ticket.priority;
        stored.status = ticket.status;
        stored.resolved_at = ticket.resolved_at;
        stored.updated_at = Utc::now();
        stored.version += 1;
        Ok(stored.clone())
    }

    fn delete_ticket(&self, id: TicketId) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables
            .tickets
            .remove(&id)
            .ok_or(StoreError::TicketNotFound(id))?;
        tables.comments.retain(|_, comment| comment.ticket_id != id);
        Ok(())
    }

    fn update_ticket_analysis(
        &self,
        id: TicketId,
        score: SentimentScore,
        suggested: Option<Category>,
    ) -> Result<Ticket, StoreError> {
        let mut tables = self.tables.write();
        let stored = tables
            .tickets
            .get_mut(&id)
            .ok_or(StoreError::TicketNotFound(id))?;
        stored.sentiment_score = Some(score);
        if suggested.is_some() {
            stored.suggested_category = suggested;
        }
        Ok(stored.clone())
    }

    fn insert_comment(&self, comment: Comment) -> Result<Comment, StoreError> {
        let mut tables = self.tables.write();
        if !tables.tickets.contains_key(&comment.ticket_id) {
            return Err(StoreError::TicketNotFound(comment.ticket_id));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    fn comment(&self, id: CommentId) -> Option<Comment> {
        self.tables.read().comments.get(&id).cloned()
    }

    fn comments_for(&self, ticket_id: TicketId) -> Vec<Comment> {
        self.tables
            .read()
            .comments
            .values()
            .filter(|comment| comment.ticket_id == ticket_id)
            .cloned()
            .collect()
    }

    fn delete_comment(&self, id: CommentId) -> Result<(), StoreError> {
        self.tables
            .write()
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::CommentNotFound(id))
    }

    fn update_comment_sentiment(
        &self,
        id: CommentId,
        score: SentimentScore,
    ) -> Result<Comment, StoreError> {
        let mut tables = self.tables.write();
        let stored = tables
            .comments
            .get_mut(&id)
            .ok_or(StoreError::CommentNotFound(id))?;
        stored.sentiment_score = Some(score);
        Ok(stored.clone())
    }

    fn append_audit(&self, entry: AuditEntry) {
        self.tables.write().audit.push(entry);
    }

    fn audit_for(&self, ticket_id: TicketId) -> Vec<AuditEntry> {
        self.tables
            .read()
            .audit
            .iter()
            .filter(|entry| entry.ticket_id == ticket_id)
            .cloned()
            .collect()
    }

    fn category(&self, id: CategoryId) -> Option<Category> {
        self.tables
            .read()
            .categories
            .iter()
            .find(|category| category.id == id)
            .cloned()
    }

    fn category_by_name(&self, name: &str) -> Option<Category> {
        let wanted = name.trim();
        self.tables
            .read()
            .categories
            .iter()
            .find(|category| category.name.eq_ignore_ascii_case(wanted))
            .cloned()
    }
}
