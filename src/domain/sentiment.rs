use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A sentiment score guaranteed to lie in `[-1.0, 1.0]`.
///
/// `-1.0` is very negative, `1.0` very positive, `0.0` neutral. The neutral value is
/// also what a failed enrichment leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SentimentScore(f64);

impl SentimentScore {
    pub const MIN: f64 = -1.0;
    pub const MAX: f64 = 1.0;
    pub const NEUTRAL: SentimentScore = SentimentScore(0.0);

    /// Strict constructor: rejects NaN and anything outside the range.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if value.is_nan() || !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::ScoreOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Lenient constructor for untrusted input. NaN maps to neutral.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::NEUTRAL;
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for SentimentScore {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl TryFrom<f64> for SentimentScore {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SentimentScore> for f64 {
    fn from(score: SentimentScore) -> Self {
        score.0
    }
}

impl fmt::Display for SentimentScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
