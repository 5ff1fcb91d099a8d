use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CategoryId, CommentId, SentimentScore, TicketId};

pub const ANALYSIS_RESULT_EVENT_TYPE: &str = "AI_ANALYSIS_RESULT";

/// Identifier routing a message back to its originating entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Correlation {
    Ticket(TicketId),
    Comment(CommentId),
}

impl Correlation {
    /// Stringified id, used as the partition key.
    pub fn key(self) -> String {
        match self {
            Correlation::Ticket(id) | Correlation::Comment(id) => id.to_string(),
        }
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Correlation::Ticket(id) => write!(f, "ticket {id}"),
            Correlation::Comment(id) => write!(f, "comment {id}"),
        }
    }
}

/// A category proposed by the provider. At least one of id or name is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedCategory {
    pub id: Option<CategoryId>,
    pub name: Option<String>,
}

impl SuggestedCategory {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    fn from_parts(id: Option<CategoryId>, name: Option<String>) -> Option<Self> {
        let name = name.filter(|n| !n.trim().is_empty());
        (id.is_some() || name.is_some()).then_some(Self { id, name })
    }
}

/// Where an enrichment result belongs. Only ticket results can carry a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisTarget {
    Ticket {
        ticket_id: TicketId,
        suggested_category: Option<SuggestedCategory>,
    },
    Comment {
        comment_id: CommentId,
    },
}

impl AnalysisTarget {
    pub fn correlation(&self) -> Correlation {
        match self {
            AnalysisTarget::Ticket { ticket_id, .. } => Correlation::Ticket(*ticket_id),
            AnalysisTarget::Comment { comment_id } => Correlation::Comment(*comment_id),
        }
    }
}

/// Terminal outcome of enriching one lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnalysisResultMessage", into = "AnalysisResultMessage")]
pub struct EnrichmentResult {
    pub target: AnalysisTarget,
    pub sentiment: SentimentScore,
    pub analyzed_at: DateTime<Utc>,
}

impl EnrichmentResult {
    pub fn for_ticket(
        ticket_id: TicketId,
        sentiment: SentimentScore,
        suggested_category: Option<SuggestedCategory>,
    ) -> Self {
        Self {
            target: AnalysisTarget::Ticket {
                ticket_id,
                suggested_category,
            },
            sentiment,
            analyzed_at: Utc::now(),
        }
    }

    pub fn for_comment(comment_id: CommentId, sentiment: SentimentScore) -> Self {
        Self {
            target: AnalysisTarget::Comment { comment_id },
            sentiment,
            analyzed_at: Utc::now(),
        }
    }

    /// Neutral score, no category.
    pub fn fallback(correlation: Correlation) -> Self {
        match correlation {
            Correlation::Ticket(id) => Self::for_ticket(id, SentimentScore::NEUTRAL, None),
            Correlation::Comment(id) => Self::for_comment(id, SentimentScore::NEUTRAL),
        }
    }

    pub fn correlation(&self) -> Correlation {
        self.target.correlation()
    }

    pub fn suggested_category(&self) -> Option<&SuggestedCategory> {
        match &self.target {
            AnalysisTarget::Ticket {
                suggested_category, ..
            } => suggested_category.as_ref(),
            AnalysisTarget::Comment { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    #[error("analysis result carries both ticketId {ticket_id} and commentId {comment_id}")]
    Ambiguous {
        ticket_id: TicketId,
        comment_id: CommentId,
    },

    #[error("analysis result carries neither ticketId nor commentId")]
    Missing,
}

/// Wire shape of the `AI_ANALYSIS_RESULT` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResultMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<TicketId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<CommentId>,
    pub sentiment_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category_name: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    pub event_type: String,
}

impl TryFrom<AnalysisResultMessage> for EnrichmentResult {
    type Error = CorrelationError;

    /// Out-of-range scores are clamped; a category on a comment result is dropped.
    fn try_from(msg: AnalysisResultMessage) -> Result<Self, Self::Error> {
        let target = match (msg.ticket_id, msg.comment_id) {
            (Some(ticket_id), Some(comment_id)) => {
                return Err(CorrelationError::Ambiguous {
                    ticket_id,
                    comment_id,
                });
            }
            (None, None) => return Err(CorrelationError::Missing),
            (Some(ticket_id), None) => AnalysisTarget::Ticket {
                ticket_id,
                suggested_category: SuggestedCategory::from_parts(
                    msg.suggested_category_id,
                    msg.suggested_category_name,
                ),
            },
            (None, Some(comment_id)) => AnalysisTarget::Comment { comment_id },
        };
        Ok(Self {
            target,
            sentiment: SentimentScore::clamped(msg.sentiment_score),
            analyzed_at: msg.analyzed_at,
        })
    }
}

impl From<EnrichmentResult> for AnalysisResultMessage {
    fn from(result: EnrichmentResult) -> Self {
        let (ticket_id, comment_id, category) = match result.target {
            AnalysisTarget::Ticket {
                ticket_id,
                suggested_category,
            } => (Some(ticket_id), None, suggested_category),
            AnalysisTarget::Comment { comment_id } => (None, Some(comment_id), None),
        };
        let (suggested_category_id, suggested_category_name) =
            category.map_or((None, None), |c| (c.id, c.name));
        Self {
            ticket_id,
            comment_id,
            sentiment_score: result.sentiment.value(),
            suggested_category_id,
            suggested_category_name,
            analyzed_at: result.analyzed_at,
            event_type: ANALYSIS_RESULT_EVENT_TYPE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(ticket_id: Option<u64>, comment_id: Option<u64>, score: f64) -> AnalysisResultMessage {
        AnalysisResultMessage {
            ticket_id,
            comment_id,
            sentiment_score: score,
            suggested_category_id: None,
            suggested_category_name: Some("Billing".into()),
            analyzed_at: Utc::now(),
            event_type: ANALYSIS_RESULT_EVENT_TYPE.into(),
        }
    }

    #[test]
    fn exactly_one_correlation_id_is_required() {
        assert_eq!(
            EnrichmentResult::try_from(message(Some(1), Some(2), 0.1)),
            Err(CorrelationError::Ambiguous {
                ticket_id: 1,
                comment_id: 2
            })
        );
        assert_eq!(
            EnrichmentResult::try_from(message(None, None, 0.1)),
            Err(CorrelationError::Missing)
        );
        assert!(EnrichmentResult::try_from(message(Some(1), None, 0.1)).is_ok());
        assert!(EnrichmentResult::try_from(message(None, Some(2), 0.1)).is_ok());
    }

    #[test]
    fn encoded_results_carry_exactly_one_id() {
        let ticket: AnalysisResultMessage =
            EnrichmentResult::fallback(Correlation::Ticket(5)).into();
        assert_eq!((ticket.ticket_id, ticket.comment_id), (Some(5), None));

        let comment: AnalysisResultMessage =
            EnrichmentResult::fallback(Correlation::Comment(42)).into();
        assert_eq!((comment.ticket_id, comment.comment_id), (None, Some(42)));
        assert_eq!(comment.event_type, "AI_ANALYSIS_RESULT");
    }

    #[test]
    fn decode_clamps_score() {
        let result = EnrichmentResult::try_from(message(Some(1), None, -4.0)).unwrap();
        assert_eq!(result.sentiment.value(), -1.0);
    }

    #[test]
    fn comment_result_drops_category() {
        let result = EnrichmentResult::try_from(message(None, Some(9), 0.5)).unwrap();
        assert!(result.suggested_category().is_none());
    }

    #[test]
    fn comment_fallback_json() {
        let json = serde_json::to_value(EnrichmentResult::fallback(Correlation::Comment(42)))
            .unwrap();
        assert_eq!(json["commentId"], 42);
        assert_eq!(json["sentimentScore"], 0.0);
        assert!(json.get("ticketId").is_none());
        assert!(json.get("suggestedCategoryName").is_none());
    }

    #[test]
    fn ambiguous_json_fails_to_decode() {
        let payload = r#"{
            "ticketId": 1,
            "commentId": 2,
            "sentimentScore": 0.3,
            "analyzedAt": "2025-03-01T10:00:00Z",
            "eventType": "AI_ANALYSIS_RESULT"
        }"#;
        assert!(serde_json::from_str::<EnrichmentResult>(payload).is_err());
    }

    #[test]
    fn blank_category_name_is_no_suggestion() {
        let mut msg = message(Some(3), None, 0.0);
        msg.suggested_category_name = Some("  ".into());
        let result = EnrichmentResult::try_from(msg).unwrap();
        assert!(result.suggested_category().is_none());
    }

    #[test]
    fn correlation_key_and_display() {
        assert_eq!(Correlation::Ticket(12).key(), "12");
        assert_eq!(Correlation::Comment(42).to_string(), "comment 42");
    }
}
