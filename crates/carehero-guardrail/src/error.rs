//! Guardrail error types

use thiserror::Error;

/// Errors that can occur while building a guardrail policy
#[derive(Error, Debug)]
pub enum GuardrailError {
    /// A rule pattern failed to compile
    #[error("Invalid rule pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
