//! Ollama Provider Implementation
//!
//! Provides integration with Ollama's local LLM API.
//!
//! # Features
//!
//! - Async HTTP communication with Ollama API
//! - Configurable endpoint and model
//! - Retry logic with exponential backoff
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use carehero_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3.1");
//! ```

use crate::{or_filler, LlmError};
use async_trait::async_trait;
use carehero_domain::{CapabilityError, GenerationRequest, TextGenerator};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Request body for Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

/// Response from Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "llama3.1", "mistral")
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create a new Ollama provider at `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Self {
        Self::new(DEFAULT_ENDPOINT, model)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    fn request_body<'a>(&'a self, request: &'a GenerationRequest) -> OllamaGenerateRequest<'a> {
        OllamaGenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }

    /// One POST to `/api/generate`
    async fn attempt(&self, body: &OllamaGenerateRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<OllamaGenerateResponse>()
                .await
                .map(|parsed| parsed.response)
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e))),
            reqwest::StatusCode::NOT_FOUND => Err(LlmError::ModelNotAvailable(self.model.clone())),
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(LlmError::RateLimitExceeded),
            status => {
                let detail = response.text().await.unwrap_or_default();
                Err(LlmError::Communication(format!("HTTP {}: {}", status, detail)))
            }
        }
    }

    /// Generate a completion, retrying transient failures
    ///
    /// A missing model or an unparseable body fails immediately; connection
    /// errors, rate limits and server errors are retried with a doubling delay
    /// starting at one second.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let body = self.request_body(request);
        let mut delay = Duration::from_secs(1);

        for attempt in 1..=self.max_retries {
            match self.attempt(&body).await {
                Ok(text) => {
                    debug!(model = %self.model, chars = text.len(), attempt, "Completion received");
                    return Ok(text);
                }
                Err(e @ (LlmError::ModelNotAvailable(_) | LlmError::InvalidResponse(_))) => {
                    return Err(e)
                }
                Err(e) if attempt == self.max_retries => return Err(e),
                Err(e) => {
                    warn!(attempt, ?delay, error = %e, "Ollama request failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }

        Err(LlmError::Communication("No attempts made".to_string()))
    }
}

#[async_trait]
impl TextGenerator for OllamaProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, CapabilityError> {
        let text = self.complete(request).await?;
        Ok(or_filler(text))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
