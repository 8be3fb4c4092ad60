//! Configuration for the role router

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sampling settings per conversational role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Intake role temperature
    pub intake_temperature: f32,

    /// Intake role completion budget (tokens)
    pub intake_max_tokens: u32,

    /// Reasoning role temperature
    pub reasoning_temperature: f32,

    /// Reasoning role completion budget (tokens)
    pub reasoning_max_tokens: u32,

    /// User text sent to the reasoning role on the transition turn
    pub initial_reasoning_prompt: String,

    /// Maximum time for one role call (seconds)
    pub role_timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            intake_temperature: 0.7,
            intake_max_tokens: 300,
            reasoning_temperature: 0.5,
            reasoning_max_tokens: 1000,
            initial_reasoning_prompt: "Let's analyze your condition in more detail".to_string(),
            role_timeout_secs: 60,
        }
    }
}

impl RouterConfig {
    /// Get the role timeout as a Duration
    pub fn role_timeout(&self) -> Duration {
        Duration::from_secs(self.role_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, t) in [
            ("intake_temperature", self.intake_temperature),
            ("reasoning_temperature", self.reasoning_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("{} must be between 0.0 and 2.0", name));
            }
        }
        if self.intake_max_tokens == 0 || self.reasoning_max_tokens == 0 {
            return Err("max_tokens must be greater than 0".to_string());
        }
        if self.initial_reasoning_prompt.trim().is_empty() {
            return Err("initial_reasoning_prompt must not be empty".to_string());
        }
        if self.role_timeout_secs == 0 {
            return Err("role_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
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
