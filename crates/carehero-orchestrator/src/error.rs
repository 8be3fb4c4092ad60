//! Error types for session orchestration

use carehero_domain::RequiredField;
use carehero_guardrail::GuardrailError;
use carehero_store::StoreError;
use thiserror::Error;

/// Plain-language text shown for failures the user cannot act on
pub const INTERNAL_ERROR_MESSAGE: &str =
    "I'm sorry, something went wrong on our side. Please try again in a moment.";

/// Errors that can occur while handling a session
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Session store error
    #[error("Storage error: {0}")]
    Store(String),

    /// Archive directory could not be prepared
    #[error("Archive error: {0}")]
    Archive(#[from] StoreError),

    /// Guardrail policy could not be built
    #[error("Guardrail error: {0}")]
    Guardrail(#[from] GuardrailError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No record for the session id
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// Blank user message
    #[error("Empty message")]
    EmptyMessage,

    /// Correction value failed validation
    #[error("Invalid value for {field}")]
    InvalidCorrection {
        /// Field being corrected
        field: RequiredField,
    },

    /// Background discovery task panicked or was cancelled
    #[error("Discovery task failed: {0}")]
    Discovery(String),
}

impl OrchestratorError {
    /// Text safe to show a chat user
    ///
    /// Internal details are never included; they are logged instead.
    pub fn user_message(&self) -> String {
        match self {
            OrchestratorError::UnknownSession(_) => {
                "I couldn't find that conversation. Please start a new one.".to_string()
            }
            OrchestratorError::EmptyMessage => "Please type a message.".to_string(),
            OrchestratorError::InvalidCorrection { field } => {
                format!("That doesn't look like a valid {}.", field.label())
            }
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}
