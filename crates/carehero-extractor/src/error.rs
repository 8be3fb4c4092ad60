//! Error types for the field extractor
//!
//! None of these reach the caller of `FieldExtractor::extract`; they select
//! the fallback path and are logged.

use thiserror::Error;

/// Errors that can occur during LLM-assisted extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Text-generation capability error
    #[error("LLM error: {0}")]
    Llm(String),

    /// LLM call exceeded the configured timeout
    #[error("Extraction timeout")]
    Timeout,

    /// LLM output did not match the expected schema
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl From<carehero_domain::CapabilityError> for ExtractorError {
    fn from(e: carehero_domain::CapabilityError) -> Self {
        ExtractorError::Llm(e.to_string())
    }
}
