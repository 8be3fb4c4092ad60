//! Top-level configuration
//!
//! One TOML document configures the whole pipeline:
//!
//! ```toml
//! guardrails_enabled = true
//! discovery_enabled = true
//! data_dir = "data"
//!
//! [router]
//! intake_temperature = 0.7
//!
//! [discovery]
//! max_concurrent = 3
//! ```

use carehero_discovery::DiscoveryConfig;
use carehero_extractor::ExtractorConfig;
use carehero_guardrail::GuardrailConfig;
use carehero_router::RouterConfig;
use carehero_store::InMemorySessionStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the SessionOrchestrator and everything below it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Screen input and output through the guardrail policy
    pub guardrails_enabled: bool,

    /// Run institution and appointment discovery once a record is complete
    pub discovery_enabled: bool,

    /// Write snapshot and discovery files under `data_dir`
    pub archive_enabled: bool,

    /// Directory for archived JSON files
    pub data_dir: PathBuf,

    /// Idle sessions expire after this many seconds (0 = never)
    pub session_ttl_secs: u64,

    /// Live session bound; the least recently written is evicted (0 = unbounded)
    pub max_sessions: usize,

    /// Guardrail policy
    pub guardrail: GuardrailConfig,

    /// Field extraction
    pub extractor: ExtractorConfig,

    /// Conversational roles
    pub router: RouterConfig,

    /// Institution search and appointment discovery
    pub discovery: DiscoveryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            guardrails_enabled: true,
            discovery_enabled: true,
            archive_enabled: true,
            data_dir: PathBuf::from("data"),
            session_ttl_secs: 86_400,
            max_sessions: 1_000,
            guardrail: GuardrailConfig::default(),
            extractor: ExtractorConfig::default(),
            router: RouterConfig::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Conversation only: no discovery and nothing written to disk
    pub fn chat_only() -> Self {
        Self {
            discovery_enabled: false,
            archive_enabled: false,
            ..Self::default()
        }
    }

    /// Validate this configuration and every nested section
    pub fn validate(&self) -> Result<(), String> {
        if self.archive_enabled && self.data_dir.as_os_str().is_empty() {
            return Err("data_dir must be set when archive_enabled is true".to_string());
        }
        self.guardrail
            .validate()
            .map_err(|e| format!("guardrail: {}", e))?;
        self.extractor
            .validate()
            .map_err(|e| format!("extractor: {}", e))?;
        self.router.validate().map_err(|e| format!("router: {}", e))?;
        self.discovery
            .validate()
            .map_err(|e| format!("discovery: {}", e))?;
        Ok(())
    }

    /// Guardrail settings with the top-level toggle applied
    pub fn effective_guardrail(&self) -> GuardrailConfig {
        if self.guardrails_enabled {
            self.guardrail.clone()
        } else {
            GuardrailConfig::disabled()
        }
    }

    /// In-memory session store honoring the TTL and capacity settings
    pub fn memory_store(&self) -> InMemorySessionStore {
        let ttl = (self.session_ttl_secs > 0).then_some(self.session_ttl_secs);
        let max = (self.max_sessions > 0).then_some(self.max_sessions);
        InMemorySessionStore::with_limits(ttl, max)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.guardrails_enabled);
        assert_eq!(config.discovery.max_concurrent, 3);
    }

    #[test]
    fn test_nested_errors_are_prefixed() {
        let mut config = OrchestratorConfig::default();
        config.discovery.max_concurrent = 0;
        let err = config.validate().unwrap_err();
        assert!(err.starts_with("discovery:"), "{}", err);
    }

    #[test]
    fn test_guardrail_toggle() {
        let config = OrchestratorConfig {
            guardrails_enabled: false,
            ..Default::default()
        };
        let effective = config.effective_guardrail();
        assert!(!effective.enabled);
        assert!(!effective.validate_outputs);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = OrchestratorConfig::from_toml(
            r#"
            discovery_enabled = false
            data_dir = "/tmp/carehero"

            [discovery]
            max_concurrent = 5
            "#,
        )
        .unwrap();
        assert!(!config.discovery_enabled);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/carehero"));
        assert_eq!(config.discovery.max_concurrent, 5);
        assert_eq!(config.discovery.batch_delay_ms, 2_000);
        assert_eq!(config.router, RouterConfig::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = OrchestratorConfig::chat_only();
        let toml_str = config.to_toml().unwrap();
        let back = OrchestratorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_memory_store_limits() {
        let config = OrchestratorConfig {
            session_ttl_secs: 0,
            max_sessions: 0,
            ..Default::default()
        };
        assert!(config.memory_store().is_empty());
    }
}
