//! CareHero Text-Generation Layer
//!
//! Implementations of the `TextGenerator` trait from `carehero-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//!
//! Both honor the capability contract: an empty completion is replaced by
//! [`SAFE_FILLER`] instead of surfacing as an error.
//!
//! # Examples
//!
//! ```
//! use carehero_domain::{GenerationRequest, TextGenerator};
//! use carehero_llm::MockProvider;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = rt.block_on(provider.generate(&GenerationRequest::new("hi"))).unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod ollama;

use async_trait::async_trait;
use carehero_domain::{CapabilityError, CapabilityErrorKind, GenerationRequest, TextGenerator};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub use ollama::OllamaProvider;

/// Returned in place of an empty or blocked completion
pub const SAFE_FILLER: &str =
    "I'm here to help. Could you tell me a little more about what you're experiencing?";

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl From<LlmError> for CapabilityError {
    fn from(err: LlmError) -> Self {
        let kind = match &err {
            LlmError::Communication(_) | LlmError::ModelNotAvailable(_) => {
                CapabilityErrorKind::Unavailable
            }
            LlmError::InvalidResponse(_) => CapabilityErrorKind::InvalidResponse,
            LlmError::RateLimitExceeded => CapabilityErrorKind::RateLimited,
            LlmError::Other(_) => CapabilityErrorKind::Other,
        };
        CapabilityError::new(kind, err.to_string())
    }
}

/// Replace blank completions with the safe filler
pub fn or_filler(text: String) -> String {
    if text.trim().is_empty() {
        SAFE_FILLER.to_string()
    } else {
        text
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail,
}

/// Mock LLM provider for deterministic testing
///
/// Lookup order for a request: exact prompt match, then the first rule whose
/// key is a substring of the system prompt or prompt, then the default.
///
/// # Examples
///
/// ```
/// use carehero_domain::{GenerationRequest, TextGenerator};
/// use carehero_llm::MockProvider;
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let mut provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// provider.add_rule("ZIP", "What is your ZIP code?");
///
/// let exact = rt.block_on(provider.generate(&GenerationRequest::new("prompt1"))).unwrap();
/// assert_eq!(exact, "response1");
/// let ruled = rt.block_on(provider.generate(&GenerationRequest::new("ask for ZIP"))).unwrap();
/// assert_eq!(ruled, "What is your ZIP code?");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, MockReply>>>,
    rules: Arc<Mutex<Vec<(String, MockReply)>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            rules: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a specific response for an exact prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).insert(prompt.into(), MockReply::Text(response.into()));
    }

    /// Configure to return an error for an exact prompt
    pub fn add_error(&mut self, prompt: impl Into<String>) {
        lock(&self.responses).insert(prompt.into(), MockReply::Fail);
    }

    /// Respond with `response` whenever the request contains `needle`
    pub fn add_rule(&mut self, needle: impl Into<String>, response: impl Into<String>) {
        lock(&self.rules).push((needle.into(), MockReply::Text(response.into())));
    }

    /// Fail whenever the request contains `needle`
    pub fn add_error_rule(&mut self, needle: impl Into<String>) {
        lock(&self.rules).push((needle.into(), MockReply::Fail));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        lock(&self.prompts).clear();
    }

    fn reply_for(&self, request: &GenerationRequest) -> MockReply {
        if let Some(reply) = lock(&self.responses).get(&request.prompt) {
            return reply.clone();
        }
        let haystack = format!(
            "{}\n{}",
            request.system.as_deref().unwrap_or_default(),
            request.prompt
        );
        lock(&self.rules)
            .iter()
            .find(|(needle, _)| haystack.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| MockReply::Text(self.default_response.clone()))
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl TextGenerator for MockProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, CapabilityError> {
        lock(&self.prompts).push(request.prompt.clone());

        match self.reply_for(request) {
            MockReply::Fail => Err(LlmError::Other("Mock error".to_string()).into()),
            MockReply::Text(text) => Ok(or_filler(text)),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
