mod engine;
mod status;

pub use engine::{SUPPORT_WORKFLOW, TransitionRecord, WorkflowDefinition, WorkflowEngine};
pub use status::TicketStatus;
