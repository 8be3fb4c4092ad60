//! Trait definitions for external capabilities
//!
//! These traits define the boundaries between the intake pipeline and its
//! collaborators. Infrastructure implementations live in other crates.

use crate::PatientRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Category of an external capability failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityErrorKind {
    /// Backend not reachable
    Unavailable,
    /// Call did not finish in time
    Timeout,
    /// Backend answered with something unusable
    InvalidResponse,
    /// Backend asked us to slow down
    RateLimited,
    /// Anything else
    Other,
}

/// Error returned by every capability trait
///
/// Implementations convert their own error enums into this so the
/// pipeline can contain failures without knowing the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityError {
    /// Failure category
    pub kind: CapabilityErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl CapabilityError {
    /// Create an error of the given kind
    pub fn new(kind: CapabilityErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Backend not reachable
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CapabilityErrorKind::Unavailable, message)
    }

    /// Call timed out
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(CapabilityErrorKind::Timeout, message)
    }

    /// Unusable response
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(CapabilityErrorKind::InvalidResponse, message)
    }

    /// Anything else
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(CapabilityErrorKind::Other, message)
    }
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for CapabilityError {}

/// A single text-generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System prompt (role template)
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion length bound
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Create a request with default sampling parameters
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    /// Set the system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token bound
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text-generation capability
///
/// Implementations must return a safe filler string for empty or blocked
/// completions rather than an error.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion
    async fn generate(&self, request: &GenerationRequest) -> Result<String, CapabilityError>;

    /// Model identifier for logs
    fn model_name(&self) -> &str;
}

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title
    pub title: String,
    /// Result URL
    pub url: String,
    /// Snippet or page text
    #[serde(default)]
    pub text: String,
}

/// Web search capability
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query
    async fn search(&self, query: &str, num_results: usize)
        -> Result<Vec<SearchHit>, CapabilityError>;
}

/// Answer to a natural-language question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Free-text answer
    pub answer_text: String,
}

/// Question-answering capability
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    /// Ask a question
    async fn answer(&self, question: &str) -> Result<Answer, CapabilityError>;
}

/// Starts a browser process for one discovery run
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a browser
    async fn launch(&self) -> Result<Arc<dyn Browser>, CapabilityError>;
}

/// A running browser shared by all tasks of a discovery run
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open an isolated context (one per institution)
    async fn new_context(&self) -> Result<Box<dyn BrowserContext>, CapabilityError>;

    /// Shut the browser down
    async fn close(&self) -> Result<(), CapabilityError>;
}

/// An isolated browsing context
#[async_trait]
pub trait BrowserContext: Send {
    /// Load a URL, failing if it does not finish within `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), CapabilityError>;

    /// Run a script in the page and return its JSON result
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, CapabilityError>;

    /// URL of the currently loaded page
    async fn current_url(&mut self) -> Result<String, CapabilityError>;

    /// PNG screenshot of the page
    async fn screenshot(&mut self) -> Result<Vec<u8>, CapabilityError>;

    /// Tear the context down
    async fn close(&mut self) -> Result<(), CapabilityError>;
}

/// Trait for storing and retrieving session records
///
/// Implemented by the infrastructure layer (carehero-store)
pub trait SessionStore {
    /// Error type for store operations
    type Error;

    /// Get the record for a session
    fn get(&self, session_id: &str) -> Result<Option<PatientRecord>, Self::Error>;

    /// Insert or replace a record, keyed by its session id
    fn put(&mut self, record: PatientRecord) -> Result<(), Self::Error>;

    /// Remove a session; returns true if it existed
    fn delete(&mut self, session_id: &str) -> Result<bool, Self::Error>;

    /// Ids of all live sessions
    fn session_ids(&self) -> Result<Vec<String>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_request_builder() {
        let req = GenerationRequest::new("hello")
            .with_system("be brief")
            .with_temperature(0.1)
            .with_max_tokens(50);
        assert_eq!(req.system.as_deref(), Some("be brief"));
        assert_eq!(req.max_tokens, 50);
    }

    #[test]
    fn test_capability_error_display() {
        let err = CapabilityError::timeout("navigation");
        assert_eq!(err.to_string(), "Timeout: navigation");
    }
}
