//! Inference module for Feedback Lens — hosted text-generation backends
//!
//! Provides an `InferenceBackend` trait with one implementation:
//! - **Workers AI** — text generation via the Cloudflare REST API
//!
//! Calls are single-shot. A failed request is reported to the caller as-is.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::InferenceConfig;

/// Env var holding the Workers AI API token
pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

// ============================================================================
// InferenceBackend trait
// ============================================================================

/// Abstraction over text-generation providers.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Run a free-form completion for `prompt` and return the raw text.
    async fn run(&self, prompt: &str) -> Result<String, InferenceError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing API token (set CLOUDFLARE_API_TOKEN)")]
    MissingApiToken,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// Workers AI API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// WorkersAiClient
// ============================================================================

/// Workers AI client — calls `/accounts/{account}/ai/run/{model}`.
#[derive(Debug, Clone)]
pub struct WorkersAiClient {
    client: Client,
    api_token: String,
    account_id: String,
    model: String,
    max_tokens: Option<u32>,
    base_url: String,
}

impl WorkersAiClient {
    pub fn new(config: &InferenceConfig, api_token: Option<String>) -> Result<Self, InferenceError> {
        let base_url = config.base_url.clone();
        Self::with_base_url(config, api_token, base_url)
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: &InferenceConfig,
        api_token: Option<String>,
        base_url: String,
    ) -> Result<Self, InferenceError> {
        let api_token = api_token
            .or_else(|| std::env::var(API_TOKEN_ENV).ok())
            .unwrap_or_default();

        if api_token.is_empty() {
            return Err(InferenceError::MissingApiToken);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_token,
            account_id: config.account_id.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn run_url(&self) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url, self.account_id, self.model
        )
    }
}

#[async_trait]
impl InferenceBackend for WorkersAiClient {
    async fn run(&self, prompt: &str) -> Result<String, InferenceError> {
        let request = RunRequest {
            prompt,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.run_url())
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let envelope = serde_json::from_str::<RunEnvelope>(&body).ok();

        if !status.is_success() {
            let (code, message) = envelope
                .and_then(|e| e.errors.into_iter().next())
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), body));

            tracing::error!(code = code, message = %message, "Workers AI API error");

            return Err(InferenceError::Api { code, message });
        }

        let envelope = envelope.ok_or_else(|| {
            InferenceError::InvalidResponse(format!("unparseable envelope: {}", body))
        })?;

        if envelope.success == Some(false) {
            let (code, message) = envelope
                .errors
                .into_iter()
                .next()
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), "request reported success=false".to_string()));
            return Err(InferenceError::Api { code, message });
        }

        let result = envelope
            .result
            .ok_or_else(|| InferenceError::InvalidResponse("missing result".to_string()))?;

        Ok(response_text(result))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// `result.response` when it is a string, otherwise the whole result as JSON text.
fn response_text(result: Value) -> String {
    match result.get("response").and_then(Value::as_str) {
        Some(text) => text.to_string(),
        None => match result {
            Value::String(s) => s,
            other => other.to_string(),
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================
