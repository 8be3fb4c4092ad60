//! Guardrail audit events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a guardrail rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Crisis or imminent harm
    Critical,
    /// Policy violation
    High,
    /// Soft violation
    Medium,
    /// Pass events
    Info,
}

impl Severity {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record emitted for every validation call, pass or fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailEvent {
    /// Event kind: the matched rule category, or "input_validation" / "output_validation" for passes
    pub event_type: String,

    /// Severity of the matched rule, `Info` for passes
    pub severity: Severity,

    /// Whether the text was blocked
    pub blocked: bool,

    /// Bounded excerpt of the validated text
    pub input_excerpt: String,

    /// Seconds since Unix epoch
    pub timestamp: u64,

    /// Session the text belongs to, if known
    pub session_id: Option<String>,
}

/// Take at most `max_chars` characters without splitting a code point
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_is_char_safe() {
        assert_eq!(excerpt("héllo wörld", 4), "héll");
        assert_eq!(excerpt("abc", 10), "abc");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical < Severity::High);
        assert!(Severity::Medium < Severity::Info);
    }
}
