use serde_json::{Map, Value};

use super::provider::{Analysis, ScoreRequest, SentimentProvider};
use crate::anthropic::{MessageSender, MessagesRequest};
use crate::domain::{CATEGORY_CATALOG, SentimentScore};
use crate::error::ProviderError;

const SCORE_FIELD: &str = "sentimentScore";
const CATEGORY_FIELD: &str = "suggestedCategory";
const SYSTEM_PROMPT: &str = "You analyze customer support messages. \
Reply with a single JSON object and nothing else.";

/// Scores text with a Messages API call and parses the reply defensively.
pub struct LlmScorer<C> {
    client: C,
    model: String,
    max_tokens: u32,
}

impl<C: MessageSender> LlmScorer<C> {
    pub fn new(client: C, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
        }
    }

    fn request_for(&self, request: &ScoreRequest) -> MessagesRequest {
        MessagesRequest::single(self.model.clone(), self.max_tokens, build_prompt(request))
            .with_system(SYSTEM_PROMPT)
    }
}

impl<C: MessageSender + 'static> SentimentProvider for LlmScorer<C> {
    async fn analyze(&self, request: &ScoreRequest) -> Result<Analysis, ProviderError> {
        let response = self.client.send_message(&self.request_for(request)).await?;
        let text = response.text();
        tracing::debug!(model = %self.model, reply = %text, "Scoring reply");
        extract_analysis(&text, request)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

fn build_prompt(request: &ScoreRequest) -> String {
    match request {
        ScoreRequest::Ticket {
            title,
            description,
            category,
        } => {
            let options = CATEGORY_CATALOG
                .iter()
                .map(|name| format!("\"{name}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Analyze the following customer support ticket and provide:\n\
                 1. Sentiment score (between -1.0 for very negative and 1.0 for very positive)\n\
                 2. Suggested category from these options: {options}\n\
                 \n\
                 Ticket Title: {title}\n\
                 Ticket Description: {description}\n\
                 Current Category: {}\n\
                 \n\
                 Respond with ONLY valid JSON, no other text.\n\
                 Format: {{\"{SCORE_FIELD}\": <number>, \"{CATEGORY_FIELD}\": \"<category>\"}}",
                category.as_deref().unwrap_or("unknown")
            )
        }
        ScoreRequest::Comment { content } => format!(
            "Analyze the sentiment of this customer support comment.\n\
             Provide a sentiment score between -1.0 (very negative) and 1.0 (very positive).\n\
             \n\
             Comment: {content}\n\
             \n\
             Respond with ONLY valid JSON, no other text.\n\
             Format: {{\"{SCORE_FIELD}\": <number>}}"
        ),
    }
}

/// Parses provider free text into an [`Analysis`].
///
/// Uses the first well-formed JSON object in `text`. Inside it, a missing or
/// unparsable score reads as neutral, and a category outside the catalog is dropped.
/// Comment requests never yield a category.
pub fn extract_analysis(text: &str, request: &ScoreRequest) -> Result<Analysis, ProviderError> {
    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    let object = first_json_object(text)
        .ok_or_else(|| ProviderError::Malformed(format!("no JSON object in reply: {text}")))?;

    let score = object
        .get(SCORE_FIELD)
        .and_then(score_value)
        .map(SentimentScore::clamped)
        .unwrap_or_default();

    let category = if request.is_comment() {
        None
    } else {
        object
            .get(CATEGORY_FIELD)
            .and_then(Value::as_str)
            .and_then(|label| {
                let known = catalog_name(label);
                if known.is_none() {
                    tracing::debug!(label, "Discarding category outside the catalog");
                }
                known
            })
    };

    Ok(Analysis { score, category })
}

fn first_json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

fn score_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn catalog_name(label: &str) -> Option<String> {
    let label = label.trim();
    CATEGORY_CATALOG
        .iter()
        .find(|name| name.eq_ignore_ascii_case(label))
        .map(|name| (*name).to_string())
}

/// Offline scorer using weighted keyword matching. Never fails.
pub struct KeywordScorer;

impl KeywordScorer {
    const NEGATIVE: &'static [(&'static str, u32)] = &[
        ("furious", 10),
        ("angry", 10),
        ("unacceptable", 10),
        ("terrible", 8),
        ("frustrat", 7),
        ("broken", 6),
        ("charged twice", 6),
        ("crash", 5),
        ("still", 3),
        ("slow", 3),
        ("not working", 5),
    ];

    const POSITIVE: &'static [(&'static str, u32)] = &[
        ("thank", 8),
        ("great", 8),
        ("love", 8),
        ("works now", 10),
        ("resolved", 5),
        ("appreciate", 7),
        ("helpful", 6),
    ];

    const CATEGORY_KEYWORDS: &'static [(&'static str, &'static str, u32)] = &[
        ("refund", "Billing", 10),
        ("invoice", "Billing", 10),
        ("charged", "Billing", 8),
        ("payment", "Billing", 8),
        ("password", "Account Management", 10),
        ("login", "Account Management", 7),
        ("account", "Account Management", 5),
        ("error", "Technical Support", 7),
        ("crash", "Technical Support", 10),
        ("bug", "Technical Support", 8),
        ("price", "Product Inquiry", 7),
        ("does it support", "Product Inquiry", 8),
        ("feature", "Feature Request", 8),
        ("would be nice", "Feature Request", 10),
        ("please add", "Feature Request", 10),
    ];

    /// Net polarity of `text`, scaled into the score range.
    pub fn sentiment(text: &str) -> SentimentScore {
        let lower = text.to_lowercase();
        let weigh = |table: &[(&str, u32)]| -> u32 {
            table
                .iter()
                .filter(|(keyword, _)| lower.contains(keyword))
                .map(|(_, weight)| weight)
                .sum()
        };
        let negative = weigh(Self::NEGATIVE);
        let positive = weigh(Self::POSITIVE);
        let spread = (positive + negative).max(10);
        SentimentScore::clamped((f64::from(positive) - f64::from(negative)) / f64::from(spread))
    }

    /// Highest-scoring catalog category; ties go to the earlier table entry.
    pub fn category(text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        let mut scores: Vec<(&str, u32)> = Vec::new();
        for &(keyword, category, weight) in Self::CATEGORY_KEYWORDS {
            if lower.contains(keyword) {
                match scores.iter_mut().find(|(name, _)| *name == category) {
                    Some((_, score)) => *score += weight,
                    None => scores.push((category, weight)),
                }
            }
        }
        let mut best: Option<(&str, u32)> = None;
        for (name, score) in scores {
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((name, score));
            }
        }
        best.map(|(name, _)| name.to_string())
    }
}

impl SentimentProvider for KeywordScorer {
    async fn analyze(&self, request: &ScoreRequest) -> Result<Analysis, ProviderError> {
        Ok(match request {
            ScoreRequest::Ticket {
                title, description, ..
            } => {
                let text = format!("{title}\n{description}");
                Analysis {
                    score: Self::sentiment(&text),
                    category: Self::category(&text),
                }
            }
            ScoreRequest::Comment { content } => Analysis {
                score: Self::sentiment(content),
                category: None,
            },
        })
    }

    fn name(&self) -> &'static str {
        "keywords"
    }
}
