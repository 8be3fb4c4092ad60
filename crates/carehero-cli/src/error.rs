//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Orchestrator error
    #[error(transparent)]
    Orchestrator(#[from] carehero_orchestrator::OrchestratorError),

    /// Discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] carehero_discovery::DiscoveryError),

    /// Session store error
    #[error("Store error: {0}")]
    Store(#[from] carehero_store::StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    /// Text to show in the chat REPL
    ///
    /// Orchestrator failures use their plain-language message; details go
    /// to the log.
    pub fn chat_message(&self) -> String {
        match self {
            CliError::Orchestrator(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
