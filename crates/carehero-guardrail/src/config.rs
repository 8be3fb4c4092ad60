//! Guardrail configuration

use serde::{Deserialize, Serialize};

/// Configuration for the guardrail policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Screen user input at all
    pub enabled: bool,

    /// Screen role output
    pub validate_outputs: bool,

    /// Characters of validated text kept in audit events
    pub excerpt_chars: usize,

    /// Block directive phrasing ("you should take") without a consult disclaimer
    pub require_disclaimer_for_directives: bool,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            validate_outputs: true,
            excerpt_chars: 150,
            require_disclaimer_for_directives: true,
        }
    }
}

impl GuardrailConfig {
    /// Input screening only; role output passes through
    pub fn lenient() -> Self {
        Self {
            validate_outputs: false,
            require_disclaimer_for_directives: false,
            ..Self::default()
        }
    }

    /// Everything off; events are still emitted as unchecked passes
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            validate_outputs: false,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.excerpt_chars == 0 {
            return Err("excerpt_chars must be greater than 0".to_string());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GuardrailConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.excerpt_chars, 150);
    }

    #[test]
    fn test_zero_excerpt_invalid() {
        let config = GuardrailConfig {
            excerpt_chars: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = GuardrailConfig::from_toml("validate_outputs = false").unwrap();
        assert!(config.enabled);
        assert!(!config.validate_outputs);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GuardrailConfig::lenient();
        let parsed = GuardrailConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }
}
