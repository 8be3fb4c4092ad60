//! Rule tables
//!
//! Order matters: the first matching rule wins. Patterns are matched against
//! lowercased text.

use carehero_domain::Severity;
use regex::Regex;

use crate::GuardrailError;

/// What a rule guards against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    /// Suicidal ideation or self-harm
    SelfHarm,
    /// Illegal drugs or prescription fraud
    IllegalContent,
    /// Overdose-sized quantities
    DangerousDosage,
    /// Requests for diagnosis, medication or dosage advice
    MedicalAdviceRequest,
    /// Output asserting a diagnosis
    DiagnosisGiven,
    /// Output directing medication changes
    MedicationAdvice,
    /// Output discouraging professional care
    MedicalDismissal,
    /// Output promising a cure
    CureClaim,
    /// Output guaranteeing an outcome
    GuaranteeClaim,
    /// Directive output lacking a consult disclaimer
    MissingDisclaimer,
}

impl RuleCategory {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::SelfHarm => "self_harm",
            RuleCategory::IllegalContent => "illegal_content",
            RuleCategory::DangerousDosage => "dangerous_dosage",
            RuleCategory::MedicalAdviceRequest => "medical_advice_request",
            RuleCategory::DiagnosisGiven => "diagnosis_given",
            RuleCategory::MedicationAdvice => "medication_advice",
            RuleCategory::MedicalDismissal => "medical_dismissal",
            RuleCategory::CureClaim => "cure_claim",
            RuleCategory::GuaranteeClaim => "guarantee_claim",
            RuleCategory::MissingDisclaimer => "missing_disclaimer",
        }
    }
}

pub(crate) const CRISIS_MESSAGE: &str = "I'm concerned about your safety. Please contact emergency services (911) or a crisis helpline if you're in immediate danger.";

pub(crate) const ILLEGAL_MESSAGE: &str =
    "I can only provide information about legal medical treatments and services.";

pub(crate) const DOSAGE_MESSAGE: &str = "I'm very concerned about this request. Taking large amounts of medication can be extremely dangerous. Please contact emergency services (911) or poison control (1-800-222-1222) immediately if you're considering this.";

pub(crate) const ADVICE_MESSAGE: &str = "I cannot provide specific medical advice or diagnoses. Please consult with a healthcare professional for medical guidance.";

pub(crate) const OUTPUT_CLAIM_MESSAGE: &str =
    "Response contains potential medical advice that requires professional consultation.";

pub(crate) const OUTPUT_DISCLAIMER_MESSAGE: &str =
    "Medical advice should include appropriate disclaimers about consulting healthcare professionals.";

struct RuleSpec {
    category: RuleCategory,
    severity: Severity,
    patterns: &'static [&'static str],
    message: &'static str,
}

const INPUT_RULES: &[RuleSpec] = &[
    RuleSpec {
        category: RuleCategory::SelfHarm,
        severity: Severity::Critical,
        patterns: &[
            r"\b(kill|suicide|harm|hurt)\s+(myself|me)\b",
            r"\b(want to die|end my life)\b",
            r"\bsuicidal\b",
        ],
        message: CRISIS_MESSAGE,
    },
    RuleSpec {
        category: RuleCategory::IllegalContent,
        severity: Severity::High,
        patterns: &[
            r"\b(illegal drugs|street drugs)\b",
            r"\b(prescription fraud|fake prescription)\b",
        ],
        message: ILLEGAL_MESSAGE,
    },
    RuleSpec {
        category: RuleCategory::DangerousDosage,
        severity: Severity::Critical,
        patterns: &[
            r"\b(take|ingest|swallow)\s+(\d{2,}|\d+\s+(pills|tablets))\b",
            r"\b(\d{2,})\s+(pills|tablets|capsules)\b",
            r"\bwhole bottle\b.*\b(pills|medication)\b",
        ],
        message: DOSAGE_MESSAGE,
    },
    RuleSpec {
        category: RuleCategory::MedicalAdviceRequest,
        severity: Severity::High,
        patterns: &[
            r"\bshould i take\b.*\b(medication|pills|drugs)\b",
            r"\bwhat medication\b",
            r"\bhow much\b.*\b(dosage|dose)\b",
            r"\bdiagnose me\b",
            r"\bis it cancer\b",
        ],
        message: ADVICE_MESSAGE,
    },
];

const OUTPUT_RULES: &[RuleSpec] = &[
    RuleSpec {
        category: RuleCategory::DiagnosisGiven,
        severity: Severity::High,
        patterns: &[
            r"\byou have\b.*\b(cancer|diabetes|heart disease)\b",
            r"\byou are diagnosed with\b",
        ],
        message: OUTPUT_CLAIM_MESSAGE,
    },
    RuleSpec {
        category: RuleCategory::MedicationAdvice,
        severity: Severity::High,
        patterns: &[r"\btake this medication\b", r"\bstop taking your medication\b"],
        message: OUTPUT_CLAIM_MESSAGE,
    },
    RuleSpec {
        category: RuleCategory::MedicalDismissal,
        severity: Severity::High,
        patterns: &[r"\byou don'?t need a doctor\b"],
        message: OUTPUT_CLAIM_MESSAGE,
    },
    RuleSpec {
        category: RuleCategory::CureClaim,
        severity: Severity::High,
        patterns: &[r"\bthis will cure\b"],
        message: OUTPUT_CLAIM_MESSAGE,
    },
    RuleSpec {
        category: RuleCategory::GuaranteeClaim,
        severity: Severity::High,
        patterns: &[r"\bguaranteed to work\b"],
        message: OUTPUT_CLAIM_MESSAGE,
    },
];

/// Phrases that make output directive
pub(crate) const DIRECTIVE_PHRASES: &[&str] = &[
    "you should take",
    "i recommend",
    "my advice is",
    "you need to",
    "definitely do this",
];

/// Any of these satisfies the disclaimer requirement
pub(crate) const DISCLAIMER_PHRASES: &[&str] = &[
    "consult",
    "healthcare provider",
    "medical professional",
    "doctor",
    "emergency",
];

/// A rule with compiled patterns
pub(crate) struct Rule {
    pub category: RuleCategory,
    pub severity: Severity,
    pub message: &'static str,
    patterns: Vec<Regex>,
}

impl Rule {
    pub fn matches(&self, lowered: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(lowered))
    }
}

fn compile(specs: &[RuleSpec]) -> Result<Vec<Rule>, GuardrailError> {
    specs
        .iter()
        .map(|spec| {
            let patterns = spec
                .patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Rule {
                category: spec.category,
                severity: spec.severity,
                message: spec.message,
                patterns,
            })
        })
        .collect()
}

pub(crate) fn input_rules() -> Result<Vec<Rule>, GuardrailError> {
    compile(INPUT_RULES)
}

pub(crate) fn output_rules() -> Result<Vec<Rule>, GuardrailError> {
    compile(OUTPUT_RULES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(input_rules().unwrap().len(), 4);
        assert_eq!(output_rules().unwrap().len(), 5);
    }

    #[test]
    fn test_input_priority_order() {
        let rules = input_rules().unwrap();
        let order: Vec<_> = rules.iter().map(|r| r.category).collect();
        assert_eq!(
            order,
            vec![
                RuleCategory::SelfHarm,
                RuleCategory::IllegalContent,
                RuleCategory::DangerousDosage,
                RuleCategory::MedicalAdviceRequest,
            ]
        );
    }
}
