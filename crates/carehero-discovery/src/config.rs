//! Configuration for institution search and appointment discovery

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the InstitutionFinder and AppointmentDiscoveryEngine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Institutions processed concurrently (batch size)
    pub max_concurrent: usize,

    /// Pause between batches (milliseconds)
    pub batch_delay_ms: u64,

    /// Page-load timeout per navigation (seconds)
    pub navigation_timeout_secs: u64,

    /// Upper bound on one institution's whole pipeline (seconds)
    pub institution_timeout_secs: u64,

    /// Follow an appointment/booking link after the first page load
    pub follow_booking_links: bool,

    /// Page text sent to the LLM is truncated to this many characters
    pub llm_text_limit: usize,

    /// Maximum time for the LLM content analysis call (seconds)
    pub llm_timeout_secs: u64,

    /// Maximum slots produced by the regex fallback
    pub regex_fallback_cap: usize,

    /// Maximum slots kept after cleaning
    pub cleaned_slot_cap: usize,

    /// Placeholder slots emitted when nothing was found
    pub synthetic_slot_count: usize,

    /// Institutions returned by the finder
    pub max_institutions: usize,

    /// Results requested from the search provider
    pub search_num_results: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            batch_delay_ms: 2_000,
            navigation_timeout_secs: 30,
            institution_timeout_secs: 120,
            follow_booking_links: true,
            llm_text_limit: 8_000,
            llm_timeout_secs: 60,
            regex_fallback_cap: 10,
            cleaned_slot_cap: 8,
            synthetic_slot_count: 6,
            max_institutions: 5,
            search_num_results: 15,
        }
    }
}

impl DiscoveryConfig {
    /// Aggressive preset: more parallelism, shorter waits
    pub fn aggressive() -> Self {
        Self {
            max_concurrent: 6,
            batch_delay_ms: 500,
            navigation_timeout_secs: 15,
            institution_timeout_secs: 60,
            llm_timeout_secs: 30,
            ..Self::default()
        }
    }

    /// Lenient preset: one site at a time, generous timeouts
    pub fn lenient() -> Self {
        Self {
            max_concurrent: 1,
            batch_delay_ms: 5_000,
            navigation_timeout_secs: 60,
            institution_timeout_secs: 300,
            llm_timeout_secs: 120,
            ..Self::default()
        }
    }

    /// Get the inter-batch delay as a Duration
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Get the navigation timeout as a Duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Get the per-institution timeout as a Duration
    pub fn institution_timeout(&self) -> Duration {
        Duration::from_secs(self.institution_timeout_secs)
    }

    /// Get the LLM timeout as a Duration
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".to_string());
        }
        if self.navigation_timeout_secs == 0 || self.institution_timeout_secs == 0 {
            return Err("timeouts must be greater than 0".to_string());
        }
        if self.institution_timeout_secs < self.navigation_timeout_secs {
            return Err(
                "institution_timeout_secs must be at least navigation_timeout_secs".to_string(),
            );
        }
        if self.llm_text_limit == 0 {
            return Err("llm_text_limit must be greater than 0".to_string());
        }
        if self.cleaned_slot_cap == 0 {
            return Err("cleaned_slot_cap must be greater than 0".to_string());
        }
        if self.synthetic_slot_count > self.cleaned_slot_cap {
            return Err("synthetic_slot_count cannot exceed cleaned_slot_cap".to_string());
        }
        if self.max_institutions == 0 || self.search_num_results < self.max_institutions {
            return Err(
                "search_num_results must be at least max_institutions (and both > 0)".to_string(),
            );
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
    fn test_defaults() {
        let config = DiscoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.cleaned_slot_cap, 8);
        assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(DiscoveryConfig::aggressive().validate().is_ok());
        assert!(DiscoveryConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = DiscoveryConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_synthetic_cannot_exceed_cap() {
        let config = DiscoveryConfig {
            synthetic_slot_count: 9,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config = DiscoveryConfig::from_toml("max_concurrent = 2\nbatch_delay_ms = 0").unwrap();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.batch_delay_ms, 0);
        assert_eq!(config.regex_fallback_cap, 10);
    }
}
