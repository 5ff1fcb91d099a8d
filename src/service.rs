//! Record-keeping façade: every user-driven change to tickets and comments goes
//! through [`TicketService`], which commits to the store first and publishes after.

use std::sync::Arc;

use chrono::Utc;

use crate::bus::EventBus;
use crate::domain::{
    Actor, AuditEntry, AuditTrail, Comment, CommentId, NewComment, NewTicket, Ticket, TicketId,
    TicketUpdate, UserId,
};
use crate::error::{NotFoundError, StoreError, TicketingError, ValidationError};
use crate::events::{DomainEventPublisher, LifecycleEvent};
use crate::store::TicketStore;
use crate::workflow::{TicketStatus, TransitionRecord, WorkflowDefinition, WorkflowEngine};

pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

pub struct TicketService<S, B> {
    store: Arc<S>,
    engine: WorkflowEngine,
    audit: AuditTrail<S>,
    publisher: DomainEventPublisher<B>,
    max_conflict_retries: u32,
}

impl<S: TicketStore, B: EventBus> TicketService<S, B> {
    pub fn new(store: Arc<S>, publisher: DomainEventPublisher<B>) -> Self {
        Self {
            audit: AuditTrail::new(Arc::clone(&store)),
            store,
            engine: WorkflowEngine::default(),
            publisher,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // --- tickets ---

    pub async fn create_ticket(&self, new: NewTicket) -> Result<Ticket, TicketingError> {
        let title = required("title", &new.title)?;
        let description = required("description", &new.description)?;
        let category = self
            .store
            .category(new.category_id)
            .ok_or_else(|| ValidationError::UnknownCategory(new.category_id.to_string()))?;

        let now = Utc::now();
        let ticket = self.store.insert_ticket(Ticket {
            id: self.store.next_ticket_id(),
            title,
            description,
            customer_id: new.customer_id,
            assigned_agent: None,
            category,
            priority: new.priority,
            status: TicketStatus::Open,
            resolved_at: None,
            sentiment_score: None,
            suggested_category: None,
            created_at: now,
            updated_at: now,
            version: 0,
        });
        tracing::info!(ticket_id = ticket.id, customer_id = ticket.customer_id, "Created ticket");

        self.publisher
            .publish_lifecycle(&LifecycleEvent::ticket_created(&ticket))
            .await;
        Ok(ticket)
    }

    /// Changes title and/or description. Blank values are rejected.
    pub async fn update_ticket(
        &self,
        id: TicketId,
        update: TicketUpdate,
    ) -> Result<Ticket, TicketingError> {
        let title = update
            .title
            .as_deref()
            .map(|t| required("title", t))
            .transpose()?;
        let description = update
            .description
            .as_deref()
            .map(|d| required("description", d))
            .transpose()?;

        let (ticket, ()) = self.save_with_retry(id, |ticket| {
            if let Some(title) = &title {
                ticket.title.clone_from(title);
            }
            if let Some(description) = &description {
                ticket.description.clone_from(description);
            }
            Ok(())
        })?;
        tracing::info!(ticket_id = id, version = ticket.version, "Updated ticket");

        self.publisher
            .publish_lifecycle(&LifecycleEvent::ticket_updated(&ticket))
            .await;
        Ok(ticket)
    }

    pub fn delete_ticket(&self, id: TicketId) -> Result<(), TicketingError> {
        self.store.delete_ticket(id).map_err(TicketingError::from_store)?;
        tracing::info!(ticket_id = id, "Deleted ticket");
        Ok(())
    }

    pub fn ticket(&self, id: TicketId) -> Result<Ticket, TicketingError> {
        self.load(id)
    }

    // --- workflow ---

    /// Moves a ticket to `target`.
    ///
    /// A version conflict on save reloads the ticket and re-validates the move, up
    /// to the configured number of retries.
    pub async fn transition(
        &self,
        id: TicketId,
        target: TicketStatus,
        actor: Actor,
        comment: Option<&str>,
    ) -> Result<TransitionRecord, TicketingError> {
        let (ticket, record) = self.save_with_retry(id, |ticket| {
            self.engine
                .transition(ticket, target, actor, comment)
                .map_err(TicketingError::from)
        })?;

        self.audit.record(record.audit.clone());
        // The status change has committed; a lost note must not undo its event.
        if let Some(note) = &record.note
            && let Err(e) = self.insert_comment(note, record.transitioned_at)
        {
            tracing::warn!(ticket_id = id, error = %e, "Failed to store transition note");
        }
        tracing::info!(
            ticket_id = id,
            from = %record.from,
            to = %record.to,
            actor = %actor,
            "Transitioned ticket"
        );

        self.publisher
            .publish_lifecycle(&LifecycleEvent::ticket_updated(&ticket))
            .await;
        Ok(record)
    }

    pub fn available_transitions(&self, id: TicketId) -> Result<Vec<TicketStatus>, TicketingError> {
        Ok(self.engine.available_transitions(&self.load(id)?))
    }

    pub fn can_transition(&self, id: TicketId, target: TicketStatus) -> Result<bool, TicketingError> {
        Ok(self.engine.can_transition(&self.load(id)?, target))
    }

    pub fn workflow_definition(&self) -> &'static WorkflowDefinition {
        self.engine.definition()
    }

    // --- assignment ---

    pub fn assign(&self, id: TicketId, agent: UserId, actor: Actor) -> Result<Ticket, TicketingError> {
        self.change_assignment(id, actor, |ticket| match ticket.assigned_agent {
            Some(current) => Err(ValidationError::AlreadyAssigned {
                ticket_id: ticket.id,
                agent_id: current,
            }),
            None => Ok(Some(agent)),
        })
    }

    pub fn reassign(&self, id: TicketId, agent: UserId, actor: Actor) -> Result<Ticket, TicketingError> {
        self.change_assignment(id, actor, |ticket| match ticket.assigned_agent {
            None => Err(ValidationError::NotAssigned(ticket.id)),
            Some(current) if current == agent => Err(ValidationError::SameAgent(agent)),
            Some(_) => Ok(Some(agent)),
        })
    }

    pub fn unassign(&self, id: TicketId, actor: Actor) -> Result<Ticket, TicketingError> {
        self.change_assignment(id, actor, |ticket| match ticket.assigned_agent {
            None => Err(ValidationError::NotAssigned(ticket.id)),
            Some(_) => Ok(None),
        })
    }

    fn change_assignment(
        &self,
        id: TicketId,
        actor: Actor,
        decide: impl Fn(&Ticket) -> Result<Option<UserId>, ValidationError>,
    ) -> Result<Ticket, TicketingError> {
        let (ticket, entry) = self.save_with_retry(id, |ticket| {
            let next = decide(ticket)?;
            let entry = AuditEntry::assignment_change(ticket.id, ticket.assigned_agent, next, actor);
            ticket.assigned_agent = next;
            Ok(entry)
        })?;
        tracing::info!(
            ticket_id = id,
            from = %entry.old_value,
            to = %entry.new_value,
            "Changed assignment"
        );
        self.audit.record(entry);
        Ok(ticket)
    }

    pub fn history(&self, id: TicketId) -> Vec<AuditEntry> {
        self.audit.history(id)
    }

    // --- comments ---

    pub async fn add_comment(&self, new: NewComment) -> Result<Comment, TicketingError> {
        let content = required("content", &new.content)?;
        let comment = self.insert_comment(
            &NewComment {
                content,
                ..new
            },
            Utc::now(),
        )?;
        tracing::info!(
            comment_id = comment.id,
            ticket_id = comment.ticket_id,
            internal = comment.internal,
            "Added comment"
        );

        self.publisher
            .publish_lifecycle(&LifecycleEvent::comment_created(&comment))
            .await;
        Ok(comment)
    }

    pub fn delete_comment(&self, id: CommentId) -> Result<(), TicketingError> {
        self.store.delete_comment(id).map_err(TicketingError::from_store)?;
        tracing::info!(comment_id = id, "Deleted comment");
        Ok(())
    }

    pub fn comment(&self, id: CommentId) -> Result<Comment, TicketingError> {
        self.store
            .comment(id)
            .ok_or(NotFoundError::Comment(id).into())
    }

    /// Comments of a ticket, oldest first.
    pub fn comments(&self, ticket_id: TicketId) -> Result<Vec<Comment>, TicketingError> {
        self.load(ticket_id)?;
        Ok(self.store.comments_for(ticket_id))
    }

    // --- helpers ---

    fn load(&self, id: TicketId) -> Result<Ticket, TicketingError> {
        self.store
            .ticket(id)
            .ok_or(NotFoundError::Ticket(id).into())
    }

    fn insert_comment(
        &self,
        new: &NewComment,
        created_at: chrono::DateTime<Utc>,
    ) -> Result<Comment, TicketingError> {
        self.store
            .insert_comment(Comment {
                id: self.store.next_comment_id(),
                ticket_id: new.ticket_id,
                author: new.author,
                content: new.content.clone(),
                internal: new.internal,
                sentiment_score: None,
                created_at,
            })
            .map_err(TicketingError::from_store)
    }

    /// Loads, mutates and saves a ticket, retrying on version conflicts.
    ///
    /// `mutate` runs against fresh state on every attempt, so its validation always
    /// sees the row that is actually being replaced.
    fn save_with_retry<T>(
        &self,
        id: TicketId,
        mut mutate: impl FnMut(&mut Ticket) -> Result<T, TicketingError>,
    ) -> Result<(Ticket, T), TicketingError> {
        let mut conflicts = 0;
        loop {
            let mut ticket = self.load(id)?;
            let outcome = mutate(&mut ticket)?;
            match self.store.save_ticket(&ticket) {
                Ok(saved) => return Ok((saved, outcome)),
                Err(StoreError::VersionConflict { expected, actual, .. })
                    if conflicts < self.max_conflict_retries =>
                {
                    conflicts += 1;
                    tracing::warn!(
                        ticket_id = id,
                        expected,
                        actual,
                        attempt = conflicts,
                        "Version conflict, retrying on fresh state"
                    );
                }
                Err(e) => return Err(TicketingError::from_store(e)),
            }
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::BlankField(field))
    } else {
        Ok(trimmed.to_string())
    }
}
