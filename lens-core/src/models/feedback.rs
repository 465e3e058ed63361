use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Tone label attached to every stored feedback row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict, case-sensitive parse. `"positive"` is not a sentiment.
impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sentiment::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown sentiment: {:?}", s))
    }
}

/// A row ready for insertion; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewFeedback {
    pub content: String,
    pub sentiment: Sentiment,
    pub summary: String,
    pub created_at: String,
}

impl NewFeedback {
    pub fn new(content: impl Into<String>, sentiment: Sentiment, summary: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sentiment,
            summary: summary.into(),
            created_at: utc_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedbackRecord {
    pub id: i64,
    pub content: String,
    pub sentiment: String,
    pub summary: String,
    pub created_at: String,
}

/// Current UTC time as ISO-8601 with microseconds and a trailing `Z`.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
