mod audit;
mod sentiment;
mod ticket;

pub use audit::{AuditEntry, AuditField, AuditTrail, UNASSIGNED};
pub use sentiment::SentimentScore;
pub use ticket::{
    Actor, CATEGORY_CATALOG, Category, CategoryId, Comment, CommentId, NewComment, NewTicket,
    Priority, Ticket, TicketId, TicketUpdate, UserId,
};
