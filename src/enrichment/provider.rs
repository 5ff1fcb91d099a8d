use std::future::Future;

use crate::domain::SentimentScore;
use crate::error::ProviderError;
use crate::events::LifecycleEvent;

/// Text submitted for scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreRequest {
    Ticket {
        title: String,
        description: String,
        /// Current category, when the event carries one.
        category: Option<String>,
    },
    Comment {
        content: String,
    },
}

impl ScoreRequest {
    /// Builds the request for a lifecycle event. Updates carry no category.
    pub fn for_event(event: &LifecycleEvent) -> Self {
        match event {
            LifecycleEvent::TicketCreated(e) => ScoreRequest::Ticket {
                title: e.title.clone(),
                description: e.description.clone(),
                category: e.category_name.clone(),
            },
            LifecycleEvent::TicketUpdated(e) => ScoreRequest::Ticket {
                title: e.title.clone(),
                description: e.description.clone(),
                category: None,
            },
            LifecycleEvent::CommentCreated(e) => ScoreRequest::Comment {
                content: e.content.clone(),
            },
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, ScoreRequest::Comment { .. })
    }
}

/// A successful scoring. `category` is always one of the catalog names.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub score: SentimentScore,
    pub category: Option<String>,
}

impl Analysis {
    pub fn neutral() -> Self {
        Self {
            score: SentimentScore::NEUTRAL,
            category: None,
        }
    }
}

/// External scorer of sentiment and category.
pub trait SentimentProvider: Send + Sync + 'static {
    fn analyze(
        &self,
        request: &ScoreRequest,
    ) -> impl Future<Output = Result<Analysis, ProviderError>> + Send;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CommentCreated, TicketCreated, TicketUpdated};
    use chrono::Utc;

    #[test]
    fn created_ticket_keeps_category() {
        let event = LifecycleEvent::TicketCreated(TicketCreated {
            ticket_id: 1,
            title: "Refund".into(),
            description: "Charged twice".into(),
            category_name: Some("Billing".into()),
            priority_name: Some("HIGH".into()),
            customer_id: 3,
            created_at: Utc::now(),
        });
        assert_eq!(
            ScoreRequest::for_event(&event),
            ScoreRequest::Ticket {
                title: "Refund".into(),
                description: "Charged twice".into(),
                category: Some("Billing".into()),
            }
        );
    }

    #[test]
    fn updated_ticket_has_no_category() {
        let event = LifecycleEvent::TicketUpdated(TicketUpdated {
            ticket_id: 1,
            title: "Refund".into(),
            description: "Still charged twice".into(),
            status_name: "OPEN".into(),
            updated_at: Utc::now(),
        });
        let ScoreRequest::Ticket { category, .. } = ScoreRequest::for_event(&event) else {
            panic!("expected a ticket request");
        };
        assert_eq!(category, None);
    }

    #[test]
    fn comment_scores_body_only() {
        let event = LifecycleEvent::CommentCreated(CommentCreated {
            comment_id: 42,
            ticket_id: 1,
            content: "Thanks, works now".into(),
            is_internal: false,
            user_id: Some(3),
            created_at: Utc::now(),
        });
        let request = ScoreRequest::for_event(&event);
        assert!(request.is_comment());
        assert_eq!(
            request,
            ScoreRequest::Comment {
                content: "Thanks, works now".into()
            }
        );
    }
}
