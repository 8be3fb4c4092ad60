//! Configuration for the field extractor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the FieldExtractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum time for a single LLM extraction call (seconds)
    pub llm_timeout_secs: u64,

    /// History length (entries, current message included) within which a
    /// missing condition may be synthesized from symptoms
    pub early_turn_window: usize,

    /// User text longer than this is truncated before prompting (characters)
    pub max_input_chars: usize,
}

impl ExtractorConfig {
    /// Get the LLM timeout as a Duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.llm_timeout_secs == 0 {
            return Err("llm_timeout_secs must be greater than 0".to_string());
        }
        if self.max_input_chars == 0 {
            return Err("max_input_chars must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            llm_timeout_secs: 30,
            early_turn_window: 3,
            max_input_chars: 4_000,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: short timeout, falls back to regex sooner
    pub fn aggressive() -> Self {
        Self {
            llm_timeout_secs: 10,
            early_turn_window: 3,
            max_input_chars: 2_000,
        }
    }

    /// Lenient preset: waits longer on slow local models
    pub fn lenient() -> Self {
        Self {
            llm_timeout_secs: 120,
            early_turn_window: 5,
            max_input_chars: 8_000,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
