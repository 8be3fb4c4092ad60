//! Guardrail policy

use crate::audit::{AuditSink, TracingAuditSink};
use crate::rules::{self, Rule, RuleCategory, DISCLAIMER_PHRASES, DIRECTIVE_PHRASES};
use crate::{GuardrailConfig, GuardrailError};
use carehero_domain::{excerpt, now_secs, GuardrailEvent, Severity};
use std::sync::Arc;

/// Replaces role output that fails validation
pub const SAFE_OUTPUT_FALLBACK: &str = "I apologize, but I need to be more careful with my response. Let me rephrase that to ensure I'm providing safe and appropriate information. Please consult with a healthcare professional for specific medical advice.";

/// Outcome of one validation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailVerdict {
    /// Whether the text may pass
    pub allowed: bool,

    /// User-facing advisory when blocked
    pub rejection_message: Option<String>,

    /// Matched rule category when blocked
    pub category: Option<RuleCategory>,

    /// Matched rule severity, `Info` when allowed
    pub severity: Severity,
}

impl GuardrailVerdict {
    fn pass() -> Self {
        Self {
            allowed: true,
            rejection_message: None,
            category: None,
            severity: Severity::Info,
        }
    }

    fn block(category: RuleCategory, severity: Severity, message: &str) -> Self {
        Self {
            allowed: false,
            rejection_message: Some(message.to_string()),
            category: Some(category),
            severity,
        }
    }
}

/// Stateless pattern validator with an audit side channel
pub struct GuardrailPolicy {
    config: GuardrailConfig,
    input_rules: Vec<Rule>,
    output_rules: Vec<Rule>,
    sink: Arc<dyn AuditSink>,
}

impl GuardrailPolicy {
    /// Create a policy that audits through `tracing`
    pub fn new(config: GuardrailConfig) -> Result<Self, GuardrailError> {
        Self::with_sink(config, Arc::new(TracingAuditSink))
    }

    /// Create a policy with a custom audit sink
    pub fn with_sink(
        config: GuardrailConfig,
        sink: Arc<dyn AuditSink>,
    ) -> Result<Self, GuardrailError> {
        config.validate().map_err(GuardrailError::Config)?;
        Ok(Self {
            config,
            input_rules: rules::input_rules()?,
            output_rules: rules::output_rules()?,
            sink,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    /// Screen inbound user text
    ///
    /// Rules are checked in priority order (self-harm, illegal content,
    /// dangerous dosage, advice requests); the first match blocks.
    pub fn validate_input(&self, text: &str, session_id: Option<&str>) -> GuardrailVerdict {
        if !self.config.enabled {
            self.emit("input_unchecked", Severity::Info, false, text, session_id);
            return GuardrailVerdict::pass();
        }

        let lowered = text.to_lowercase();
        if let Some(rule) = self.input_rules.iter().find(|r| r.matches(&lowered)) {
            self.emit(rule.category.as_str(), rule.severity, true, text, session_id);
            return GuardrailVerdict::block(rule.category, rule.severity, rule.message);
        }

        self.emit("input_validation", Severity::Info, false, text, session_id);
        GuardrailVerdict::pass()
    }

    /// Screen outbound role text
    ///
    /// Definitive claims always block. Directive phrasing blocks unless the
    /// text also carries a consult-a-professional disclaimer.
    pub fn validate_output(&self, text: &str, session_id: Option<&str>) -> GuardrailVerdict {
        if !self.config.validate_outputs {
            self.emit("output_unchecked", Severity::Info, false, text, session_id);
            return GuardrailVerdict::pass();
        }

        let lowered = text.to_lowercase();
        if let Some(rule) = self.output_rules.iter().find(|r| r.matches(&lowered)) {
            let event_type = format!("output_{}", rule.category.as_str());
            self.emit(&event_type, rule.severity, true, text, session_id);
            return GuardrailVerdict::block(rule.category, rule.severity, rule.message);
        }

        if self.config.require_disclaimer_for_directives {
            let directive = DIRECTIVE_PHRASES.iter().any(|p| lowered.contains(p));
            let disclaimed = DISCLAIMER_PHRASES.iter().any(|p| lowered.contains(p));
            if directive && !disclaimed {
                let category = RuleCategory::MissingDisclaimer;
                let event_type = format!("output_{}", category.as_str());
                self.emit(&event_type, Severity::Medium, true, text, session_id);
                return GuardrailVerdict::block(
                    category,
                    Severity::Medium,
                    rules::OUTPUT_DISCLAIMER_MESSAGE,
                );
            }
        }

        self.emit("output_validation", Severity::Info, false, text, session_id);
        GuardrailVerdict::pass()
    }

    fn emit(
        &self,
        event_type: &str,
        severity: Severity,
        blocked: bool,
        text: &str,
        session_id: Option<&str>,
    ) {
        self.sink.record(&GuardrailEvent {
            event_type: event_type.to_string(),
            severity,
            blocked,
            input_excerpt: excerpt(text, self.config.excerpt_chars),
            timestamp: now_secs(),
            session_id: session_id.map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;

    fn policy() -> (GuardrailPolicy, Arc<InMemoryAuditSink>) {
        let sink = Arc::new(InMemoryAuditSink::new());
        let policy = GuardrailPolicy::with_sink(GuardrailConfig::default(), sink.clone()).unwrap();
        (policy, sink)
    }

    #[test]
    fn test_self_harm_blocked_with_crisis_message() {
        let (policy, _) = policy();
        for text in [
            "I want to kill myself",
            "sometimes I want to die",
            "I might hurt myself tonight",
            "I've been feeling SUICIDAL",
        ] {
            let verdict = policy.validate_input(text, None);
            assert!(!verdict.allowed, "{text}");
            assert_eq!(verdict.category, Some(RuleCategory::SelfHarm));
            assert!(verdict.rejection_message.unwrap().contains("911"));
        }
    }

    #[test]
    fn test_self_harm_wins_over_dosage() {
        let (policy, _) = policy();
        let verdict = policy.validate_input("I want to end my life and take 50 pills", None);
        assert_eq!(verdict.category, Some(RuleCategory::SelfHarm));
        assert_eq!(verdict.severity, Severity::Critical);
    }

    #[test]
    fn test_illegal_content() {
        let (policy, _) = policy();
        let verdict = policy.validate_input("where can I get street drugs", None);
        assert_eq!(verdict.category, Some(RuleCategory::IllegalContent));
        assert_eq!(verdict.severity, Severity::High);
    }

    #[test]
    fn test_dangerous_dosage() {
        let (policy, _) = policy();
        for text in ["can I swallow 20 tablets", "what about 30 capsules", "the whole bottle of pills"] {
            let verdict = policy.validate_input(text, None);
            assert_eq!(verdict.category, Some(RuleCategory::DangerousDosage), "{text}");
            assert!(verdict.rejection_message.unwrap().contains("1-800-222-1222"));
        }
    }

    #[test]
    fn test_medical_advice_request() {
        let (policy, _) = policy();
        for text in [
            "Should I take more pills for this?",
            "what medication works for migraines",
            "how much of a dose is safe",
            "please diagnose me",
            "is it cancer?",
        ] {
            let verdict = policy.validate_input(text, None);
            assert_eq!(verdict.category, Some(RuleCategory::MedicalAdviceRequest), "{text}");
        }
    }

    #[test]
    fn test_ordinary_input_allowed() {
        let (policy, _) = policy();
        for text in ["I have a terrible headache", "90210", "555-123-4567", "Blue Cross"] {
            assert!(policy.validate_input(text, None).allowed, "{text}");
        }
    }

    #[test]
    fn test_every_call_emits_event() {
        let (policy, sink) = policy();
        policy.validate_input("hello", Some("s-1"));
        policy.validate_input("I want to die", Some("s-1"));
        policy.validate_output("Thanks for sharing.", Some("s-1"));

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert!(!events[0].blocked);
        assert_eq!(events[0].event_type, "input_validation");
        assert!(events[1].blocked);
        assert_eq!(events[1].event_type, "self_harm");
        assert_eq!(events[2].event_type, "output_validation");
        assert!(events.iter().all(|e| e.session_id.as_deref() == Some("s-1")));
    }

    #[test]
    fn test_excerpt_bounded() {
        let (policy, sink) = policy();
        let long = "a".repeat(500);
        policy.validate_input(&long, None);
        assert_eq!(sink.events()[0].input_excerpt.len(), 150);
    }

    #[test]
    fn test_output_claims_blocked() {
        let (policy, _) = policy();
        for (text, category) in [
            ("Based on this, you have diabetes.", RuleCategory::DiagnosisGiven),
            ("Please stop taking your medication.", RuleCategory::MedicationAdvice),
            ("You don't need a doctor for this.", RuleCategory::MedicalDismissal),
            ("This will cure your headache.", RuleCategory::CureClaim),
            ("It's guaranteed to work.", RuleCategory::GuaranteeClaim),
        ] {
            let verdict = policy.validate_output(text, None);
            assert!(!verdict.allowed, "{text}");
            assert_eq!(verdict.category, Some(category), "{text}");
        }
    }

    #[test]
    fn test_directive_requires_disclaimer() {
        let (policy, _) = policy();
        let bare = policy.validate_output("I recommend resting and drinking water.", None);
        assert_eq!(bare.category, Some(RuleCategory::MissingDisclaimer));
        assert_eq!(bare.severity, Severity::Medium);

        let disclaimed = policy.validate_output(
            "I recommend resting. Please consult a healthcare provider if it persists.",
            None,
        );
        assert!(disclaimed.allowed);
    }

    #[test]
    fn test_lenient_skips_output() {
        let sink = Arc::new(InMemoryAuditSink::new());
        let policy = GuardrailPolicy::with_sink(GuardrailConfig::lenient(), sink.clone()).unwrap();
        assert!(policy.validate_output("This will cure you.", None).allowed);
        assert_eq!(sink.events()[0].event_type, "output_unchecked");
    }

    #[test]
    fn test_disabled_allows_everything() {
        let policy = GuardrailPolicy::new(GuardrailConfig::disabled()).unwrap();
        assert!(policy.validate_input("I want to kill myself", None).allowed);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: self-harm phrases block regardless of surrounding text
        #[test]
        fn test_self_harm_blocks_in_any_context(
            prefix in "[a-zA-Z0-9 ,.!?]{0,40}",
            suffix in "[a-zA-Z0-9 ,.!?]{0,40}",
            phrase in prop::sample::select(vec![
                "kill myself",
                "hurt myself",
                "harm me",
                "want to die",
                "end my life",
            ]),
        ) {
            let policy = GuardrailPolicy::new(GuardrailConfig::default()).unwrap();
            let text = format!("{} {} {}", prefix, phrase, suffix);
            let verdict = policy.validate_input(&text, None);
            prop_assert!(!verdict.allowed);
            prop_assert_eq!(verdict.category, Some(RuleCategory::SelfHarm));
        }
    }
}
