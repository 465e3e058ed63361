//! Model output handling for feedback analysis
//!
//! The inference service returns free-form text. This module builds the
//! instruction sent to it, locates the JSON object inside whatever comes back,
//! and repairs that object into an [`Analysis`] by defaulting, never rejecting.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::Sentiment;

/// Substituted when the model omits `summary` or leaves it empty.
pub const FALLBACK_SUMMARY: &str = "No summary available";

/// Normalized analysis of one piece of feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub summary: String,
    pub sentiment: Sentiment,
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("AI did not return valid JSON")]
    NoJsonObject,

    #[error("AI returned malformed JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// How to locate the JSON object inside raw model text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// First `{` through last `}`. Two fragments in one reply are merged into
    /// a single span, which then fails to parse.
    #[default]
    Greedy,
    /// First brace-balanced object, skipping braces inside JSON strings.
    Balanced,
}

/// Instruction asking the model for a `{summary, sentiment}` JSON object.
pub fn build_prompt(feedback: &str) -> String {
    format!(
        r#"Analyze the following feedback and return a JSON object with two fields: "summary" (a short summary in 1-2 sentences) and "sentiment" (one of: "Positive", "Negative", or "Neutral").

Feedback: {feedback}

Return only valid JSON in this exact format:
{{
  "summary": "your summary here",
  "sentiment": "Positive|Negative|Neutral"
}}"#
    )
}

/// Find the JSON object candidate in `text`. Returns `None` when there is none.
pub fn extract_json_object(text: &str, mode: ExtractionMode) -> Option<&str> {
    match mode {
        ExtractionMode::Greedy => extract_greedy(text),
        ExtractionMode::Balanced => extract_balanced(text),
    }
}

fn extract_greedy(text: &str) -> Option<&str> {
    let re = Regex::new(r"\{[\s\S]*\}").ok()?;
    re.find(text).map(|m| m.as_str())
}

fn extract_balanced(text: &str) -> Option<&str> {
    text.match_indices('{')
        .find_map(|(start, _)| balanced_end(&text[start..]).map(|end| &text[start..start + end]))
}

/// Byte length of the balanced object at the start of `s` (which begins with `{`).
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract, parse and repair a raw model reply.
pub fn parse_analysis(raw: &str, mode: ExtractionMode) -> Result<Analysis, AnalysisError> {
    let candidate = extract_json_object(raw, mode).ok_or(AnalysisError::NoJsonObject)?;
    let value: Value = serde_json::from_str(candidate)?;
    Ok(normalize(&value))
}

/// Coerce a parsed reply into shape. Unknown or non-string sentiment becomes
/// `Neutral`; a missing, empty or non-string summary becomes [`FALLBACK_SUMMARY`].
pub fn normalize(value: &Value) -> Analysis {
    let sentiment = value
        .get("sentiment")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Sentiment>().ok())
        .unwrap_or(Sentiment::Neutral);

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_SUMMARY)
        .to_string();

    Analysis { summary, sentiment }
}
