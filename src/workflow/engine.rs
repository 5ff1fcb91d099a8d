use chrono::{DateTime, Utc};
use serde::Serialize;

use super::status::TicketStatus;
use crate::domain::{Actor, AuditEntry, NewComment, Ticket, TicketId};
use crate::error::ValidationError;

/// An immutable adjacency table: source status → allowed targets.
///
/// Every workflow query goes through [`WorkflowDefinition::targets`], so
/// `transition`, `can_transition` and `available_transitions` read one table.
#[derive(Debug)]
pub struct WorkflowDefinition {
    edges: &'static [(TicketStatus, &'static [TicketStatus])],
}

/// The support desk workflow.
pub static SUPPORT_WORKFLOW: WorkflowDefinition = WorkflowDefinition {
    edges: &[
        (
            TicketStatus::Open,
            &[
                TicketStatus::InProgress,
                TicketStatus::WaitingCustomer,
                TicketStatus::OnHold,
                TicketStatus::Closed,
            ],
        ),
        (
            TicketStatus::InProgress,
            &[
                TicketStatus::WaitingCustomer,
                TicketStatus::OnHold,
                TicketStatus::Resolved,
                TicketStatus::Open,
            ],
        ),
        (
            TicketStatus::WaitingCustomer,
            &[
                TicketStatus::InProgress,
                TicketStatus::OnHold,
                TicketStatus::Closed,
            ],
        ),
        (
            TicketStatus::OnHold,
            &[
                TicketStatus::Open,
                TicketStatus::InProgress,
                TicketStatus::Closed,
            ],
        ),
        (
            TicketStatus::Resolved,
            &[TicketStatus::Closed, TicketStatus::InProgress],
        ),
        (TicketStatus::Closed, &[]),
    ],
};

impl WorkflowDefinition {
    /// Allowed targets from `from`. Unlisted states have none.
    pub fn targets(&self, from: TicketStatus) -> &'static [TicketStatus] {
        self.edges
            .iter()
            .find(|(source, _)| *source == from)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    pub fn allows(&self, from: TicketStatus, to: TicketStatus) -> bool {
        from != to && self.targets(from).contains(&to)
    }

    pub fn is_terminal(&self, status: TicketStatus) -> bool {
        self.targets(status).is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = (TicketStatus, &'static [TicketStatus])> + '_ {
        self.edges.iter().copied()
    }
}

/// Everything a successful transition produced, for the caller to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub ticket_id: TicketId,
    pub from: TicketStatus,
    pub to: TicketStatus,
    pub audit: AuditEntry,
    #[serde(skip)]
    pub note: Option<NewComment>,
    pub transitioned_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub is_final: bool,
}

impl TransitionRecord {
    pub fn message(&self) -> String {
        format!(
            "Ticket successfully transitioned from {} to {}",
            self.from, self.to
        )
    }
}

/// Pure state-machine logic over a ticket's status. Performs no I/O.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowEngine {
    definition: &'static WorkflowDefinition,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new(&SUPPORT_WORKFLOW)
    }
}

impl WorkflowEngine {
    pub fn new(definition: &'static WorkflowDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &'static WorkflowDefinition {
        self.definition
    }

    pub fn available_transitions(&self, ticket: &Ticket) -> Vec<TicketStatus> {
        self.definition.targets(ticket.status).to_vec()
    }

    pub fn can_transition(&self, ticket: &Ticket, target: TicketStatus) -> bool {
        self.validate(ticket.status, target).is_ok()
    }

    fn validate(&self, from: TicketStatus, to: TicketStatus) -> Result<(), ValidationError> {
        if self.definition.allows(from, to) {
            Ok(())
        } else {
            Err(ValidationError::InvalidTransition {
                from,
                to,
                allowed: self.definition.targets(from).to_vec(),
            })
        }
    }

    /// Moves `ticket` to `target`, stamping the current time.
    pub fn transition(
        &self,
        ticket: &mut Ticket,
        target: TicketStatus,
        actor: Actor,
        comment: Option<&str>,
    ) -> Result<TransitionRecord, ValidationError> {
        self.transition_at(ticket, target, actor, comment, Utc::now())
    }

    /// Moves `ticket` to `target` as of `now`.
    ///
    /// - Entering `RESOLVED` stamps `resolved_at` only if it is unset.
    /// - Leaving `RESOLVED` for anything but `CLOSED` clears `resolved_at`.
    /// - A non-blank `comment` yields an internal system note.
    ///
    /// On error the ticket is left untouched.
    pub fn transition_at(
        &self,
        ticket: &mut Ticket,
        target: TicketStatus,
        actor: Actor,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TransitionRecord, ValidationError> {
        let from = ticket.status;
        self.validate(from, target)?;

        ticket.status = target;
        if target == TicketStatus::Resolved && ticket.resolved_at.is_none() {
            ticket.resolved_at = Some(now);
        }
        if from == TicketStatus::Resolved && target != TicketStatus::Closed {
            ticket.resolved_at = None;
        }

        let note = comment
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| NewComment {
                ticket_id: ticket.id,
                author: Actor::System,
                content: format!("Status changed from {from} to {target}: {text}"),
                internal: true,
            });

        Ok(TransitionRecord {
            ticket_id: ticket.id,
            from,
            to: target,
            audit: AuditEntry::status_change(ticket.id, from, target, actor, now),
            note,
            transitioned_at: now,
            resolved_at: ticket.resolved_at,
            is_final: self.definition.is_terminal(target),
        })
    }
}
