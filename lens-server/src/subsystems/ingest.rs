//! Feedback ingestion — the request path behind the HTTP front end
//!
//! One call to [`FeedbackIngestor::handle`] validates the request, asks the
//! inference backend for an analysis, repairs the reply, writes one row and
//! builds the JSON response. Every outcome, including failure, is a
//! `(StatusCode, Value)` pair; nothing is raised to the caller.

use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use lens_core::analysis::{self, Analysis, ExtractionMode};
use lens_core::{FeedbackStore, InferenceBackend, NewFeedback};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const SUCCESS_MESSAGE: &str = "Feedback saved successfully";

/// Which injected handle is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Inference,
    Store,
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("{0} binding not available")]
    MissingCapability(Binding),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Missing or invalid 'feedback' field")]
    InvalidFeedback,

    #[error("Failed to analyze feedback: {0}")]
    Analysis(String),

    #[error("Failed to save feedback to database: {0}")]
    Persistence(String),

    #[error("Failed to process request: {0}")]
    Processing(String),
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Binding::Inference => "AI",
            Binding::Store => "DB",
        })
    }
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            IngestError::InvalidFeedback => StatusCode::BAD_REQUEST,
            IngestError::MissingCapability(_)
            | IngestError::Analysis(_)
            | IngestError::Persistence(_)
            | IngestError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body: `{error}` for client errors, `{error, details}` otherwise.
    pub fn body(&self) -> Value {
        match self {
            IngestError::MissingCapability(binding) => serde_json::json!({
                "error": self.to_string(),
                "details": match binding {
                    Binding::Inference => "Configure the [inference] section and set CLOUDFLARE_API_TOKEN",
                    Binding::Store => "Configure the [database] section and make sure the database is reachable",
                },
            }),
            IngestError::MethodNotAllowed | IngestError::InvalidFeedback => {
                serde_json::json!({ "error": self.to_string() })
            }
            IngestError::Analysis(details) => serde_json::json!({
                "error": "Failed to analyze feedback",
                "details": details,
            }),
            IngestError::Persistence(details) => serde_json::json!({
                "error": "Failed to save feedback to database",
                "details": details,
            }),
            IngestError::Processing(details) => serde_json::json!({
                "error": "Failed to process request",
                "details": details,
            }),
        }
    }

    pub fn into_http(self) -> (StatusCode, Value) {
        (self.status(), self.body())
    }
}

/// Injected handles, as supplied by the host. Either may be absent.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub inference: Option<Arc<dyn InferenceBackend>>,
    pub store: Option<Arc<dyn FeedbackStore>>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: &'static str,
    pub id: i64,
    pub data: IngestData,
}

#[derive(Debug, Serialize)]
pub struct IngestData {
    pub feedback: String,
    pub sentiment: lens_core::Sentiment,
    pub summary: String,
}

pub struct FeedbackIngestor {
    inference: Arc<dyn InferenceBackend>,
    store: Arc<dyn FeedbackStore>,
    extraction: ExtractionMode,
}

impl FeedbackIngestor {
    /// Validate the bindings once. Fails with `MissingCapability` for the first
    /// absent handle (inference is checked before the store).
    pub fn new(capabilities: Capabilities, extraction: ExtractionMode) -> Result<Self, IngestError> {
        let inference = capabilities
            .inference
            .ok_or(IngestError::MissingCapability(Binding::Inference))?;
        let store = capabilities
            .store
            .ok_or(IngestError::MissingCapability(Binding::Store))?;

        Ok(Self {
            inference,
            store,
            extraction,
        })
    }

    pub fn store(&self) -> &Arc<dyn FeedbackStore> {
        &self.store
    }

    /// Full request contract: always a status and a JSON body.
    pub async fn handle(&self, method: &Method, body: &[u8]) -> (StatusCode, Value) {
        match self.process(method, body).await {
            Ok(response) => match serde_json::to_value(&response) {
                Ok(v) => (StatusCode::OK, v),
                Err(e) => IngestError::Processing(e.to_string()).into_http(),
            },
            Err(e) => {
                if e.status().is_server_error() {
                    tracing::error!(error = %e, "Feedback request failed");
                } else {
                    tracing::warn!(error = %e, "Feedback request rejected");
                }
                e.into_http()
            }
        }
    }

    async fn process(&self, method: &Method, body: &[u8]) -> Result<IngestResponse, IngestError> {
        if method != Method::POST {
            return Err(IngestError::MethodNotAllowed);
        }

        let feedback = parse_feedback(body)?;
        let analysis = self.analyze(&feedback).await?;
        let id = self.persist(&feedback, &analysis).await?;

        Ok(IngestResponse {
            success: true,
            message: SUCCESS_MESSAGE,
            id,
            data: IngestData {
                feedback,
                sentiment: analysis.sentiment,
                summary: analysis.summary,
            },
        })
    }

    /// Ask the model for an analysis and repair whatever it returns.
    pub async fn analyze(&self, feedback: &str) -> Result<Analysis, IngestError> {
        let prompt = analysis::build_prompt(feedback);

        let raw = self
            .inference
            .run(&prompt)
            .await
            .map_err(|e| IngestError::Analysis(e.to_string()))?;

        tracing::debug!(model = self.inference.model(), raw = %raw, "Model reply received");

        analysis::parse_analysis(&raw, self.extraction)
            .map_err(|e| IngestError::Analysis(e.to_string()))
    }

    /// Write one row stamped with the current UTC time.
    pub async fn persist(&self, feedback: &str, analysis: &Analysis) -> Result<i64, IngestError> {
        let row = NewFeedback::new(feedback, analysis.sentiment, analysis.summary.clone());

        let id = self
            .store
            .insert(&row)
            .await
            .map_err(|e| IngestError::Persistence(e.to_string()))?;

        tracing::info!(id = id, sentiment = %analysis.sentiment, "Feedback saved");

        Ok(id)
    }
}

/// Body must be a JSON object whose `feedback` is a non-empty string.
pub fn parse_feedback(body: &[u8]) -> Result<String, IngestError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| IngestError::InvalidFeedback)?;

    match value.get("feedback").and_then(Value::as_str) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(IngestError::InvalidFeedback),
    }
}
