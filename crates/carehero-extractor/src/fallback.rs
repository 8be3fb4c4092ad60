//! Deterministic regex extraction
//!
//! Used whenever the LLM strategy fails. Condition and insurance are
//! captured verbatim (the whole trimmed message) when a keyword is present.

use carehero_domain::{PartialFields, PatientRecord, RequiredField};
use regex::Regex;
use std::sync::LazyLock;

/// Presence of any of these marks the message as describing a condition
pub const MEDICAL_KEYWORDS: &[&str] = &[
    "pain", "ache", "hurt", "sick", "condition", "problem", "headache", "fever", "nausea",
    "dizzy", "cough", "cold", "flu", "infection", "injury", "broken", "sprain", "cut", "burn",
    "rash", "allergy",
];

/// Presence of any of these marks the message as naming an insurer
pub const INSURANCE_KEYWORDS: &[&str] = &[
    "insurance",
    "aetna",
    "blue cross",
    "bluecross",
    "medicare",
    "medicaid",
    "cigna",
    "humana",
    "anthem",
    "kaiser",
    "bcbs",
    "united healthcare",
    "unitedhealthcare",
];

static ZIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{5}\b").unwrap());

static PHONES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // 555-123-4567, 555.123.4567, 5551234567
        Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap(),
        // (555) 123-4567
        Regex::new(r"\(\d{3}\)\s*\d{3}[-.]?\d{4}").unwrap(),
        Regex::new(r"\b\d{10}\b").unwrap(),
    ]
});

static SYMPTOM_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = MEDICAL_KEYWORDS.join("|");
    Regex::new(&format!(r"(?i)\b({})\b", alternation)).unwrap()
});

/// First 5-digit run
pub fn find_zip(text: &str) -> Option<String> {
    ZIP.find(text).map(|m| m.as_str().to_string())
}

/// First phone-shaped match, trying patterns in order
pub fn find_phone(text: &str) -> Option<String> {
    PHONES
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().to_string())
}

/// True when the text mentions a medical keyword
pub fn mentions_condition(text: &str) -> bool {
    let lowered = text.to_lowercase();
    MEDICAL_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// True when the text mentions an insurer
pub fn mentions_insurance(text: &str) -> bool {
    let lowered = text.to_lowercase();
    INSURANCE_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Whole-word medical keywords, in order of appearance, without repeats
pub fn find_symptoms(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in SYMPTOM_WORDS.find_iter(text) {
        let word = m.as_str().to_lowercase();
        if !found.contains(&word) {
            found.push(word);
        }
    }
    found
}

/// Regex extraction restricted to fields still empty on `record`
pub fn extract_fields(text: &str, record: &PatientRecord) -> PartialFields {
    let mut fields = PartialFields::default();
    let trimmed = text.trim();

    if record.field(RequiredField::MedicalCondition).is_none() && mentions_condition(trimmed) {
        fields.medical_condition = Some(trimmed.to_string());
    }
    if record.field(RequiredField::ZipCode).is_none() {
        fields.zip_code = find_zip(trimmed);
    }
    if record.field(RequiredField::PhoneNumber).is_none() {
        fields.phone_number = find_phone(trimmed);
    }
    if record.field(RequiredField::Insurance).is_none() && mentions_insurance(trimmed) {
        fields.insurance = Some(trimmed.to_string());
    }
    fields.symptoms = find_symptoms(trimmed);

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_zip() {
        assert_eq!(find_zip("I live in 90210").as_deref(), Some("90210"));
        assert_eq!(find_zip("call 555-123-4567"), None);
        assert_eq!(find_zip("5551234567"), None);
    }

    #[test]
    fn test_find_phone_formats() {
        assert_eq!(find_phone("555-123-4567").as_deref(), Some("555-123-4567"));
        assert_eq!(find_phone("555.123.4567").as_deref(), Some("555.123.4567"));
        assert_eq!(find_phone("reach me at (555) 123-4567").as_deref(), Some("(555) 123-4567"));
        assert_eq!(find_phone("5551234567").as_deref(), Some("5551234567"));
        assert_eq!(find_phone("90210"), None);
    }

    #[test]
    fn test_condition_captured_verbatim() {
        let record = PatientRecord::new("s");
        let fields = extract_fields("  I have a terrible headache ", &record);
        assert_eq!(fields.medical_condition.as_deref(), Some("I have a terrible headache"));
        assert_eq!(fields.symptoms, vec!["headache".to_string()]);
    }

    #[test]
    fn test_insurance_captured_verbatim() {
        let record = PatientRecord::new("s");
        let fields = extract_fields("Blue Cross", &record);
        assert_eq!(fields.insurance.as_deref(), Some("Blue Cross"));
        assert!(fields.medical_condition.is_none());
    }

    #[test]
    fn test_only_empty_fields_returned() {
        let mut record = PatientRecord::new("s");
        record.set_field_if_empty(RequiredField::ZipCode, "90210");
        let fields = extract_fields("my new zip is 10001", &record);
        assert!(fields.zip_code.is_none());
    }

    #[test]
    fn test_symptoms_in_order() {
        assert_eq!(
            find_symptoms("Fever and a cough, plus more fever"),
            vec!["fever".to_string(), "cough".to_string()]
        );
    }

    #[test]
    fn test_nothing_found() {
        let record = PatientRecord::new("s");
        assert!(extract_fields("hello there", &record).is_empty());
    }
}
