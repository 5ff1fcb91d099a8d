use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ticket::{Actor, TicketId, UserId};
use crate::store::TicketStore;
use crate::workflow::TicketStatus;

/// Label used in assignment history when no agent holds the ticket.
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditField {
    Status,
    AssignedAgent,
}

impl fmt::Display for AuditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditField::Status => write!(f, "status"),
            AuditField::AssignedAgent => write!(f, "assigned_agent"),
        }
    }
}

/// Immutable record of one tracked field change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub ticket_id: TicketId,
    pub field: AuditField,
    pub old_value: String,
    pub new_value: String,
    pub actor: Actor,
    pub changed_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn status_change(
        ticket_id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
        actor: Actor,
        changed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            field: AuditField::Status,
            old_value: from.to_string(),
            new_value: to.to_string(),
            actor,
            changed_at,
        }
    }

    pub fn assignment_change(
        ticket_id: TicketId,
        from: Option<UserId>,
        to: Option<UserId>,
        actor: Actor,
    ) -> Self {
        let label = |agent: Option<UserId>| {
            agent.map_or_else(|| UNASSIGNED.to_string(), |id| format!("agent:{id}"))
        };
        Self {
            ticket_id,
            field: AuditField::AssignedAgent,
            old_value: label(from),
            new_value: label(to),
            actor,
            changed_at: Utc::now(),
        }
    }
}

/// Append-only history of tracked ticket changes.
pub struct AuditTrail<S> {
    store: Arc<S>,
}

impl<S> Clone for AuditTrail<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TicketStore> AuditTrail<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn record(&self, entry: AuditEntry) {
        tracing::debug!(
            ticket_id = entry.ticket_id,
            field = %entry.field,
            old = %entry.old_value,
            new = %entry.new_value,
            actor = %entry.actor,
            "Recorded audit entry"
        );
        self.store.append_audit(entry);
    }

    /// Entries for a ticket, oldest first.
    pub fn history(&self, ticket_id: TicketId) -> Vec<AuditEntry> {
        self.store.audit_for(ticket_id)
    }
}
