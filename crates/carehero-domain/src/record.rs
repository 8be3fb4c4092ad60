//! Patient record - the session entity collected during intake

use crate::now_secs;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The patient
    User,
    /// The intake role collecting required fields
    IntakeRole,
    /// The reasoning role analyzing symptoms
    ReasoningRole,
    /// System notices (transitions, corrections)
    System,
}

impl Speaker {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::IntakeRole => "intake_role",
            Speaker::ReasoningRole => "reasoning_role",
            Speaker::System => "system",
        }
    }
}

/// A single entry in the append-only conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// When the entry was recorded (seconds since Unix epoch)
    pub timestamp: u64,

    /// Who said it
    pub speaker: Speaker,

    /// What was said
    pub message: String,
}

/// The four fields that must be present before a record is complete
///
/// Declaration order is the order in which intake asks for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    /// Primary complaint
    MedicalCondition,
    /// 5-digit postal code
    ZipCode,
    /// Contact phone number
    PhoneNumber,
    /// Insurance provider
    Insurance,
}

impl RequiredField {
    /// All required fields in intake priority order
    pub const PRIORITY: [RequiredField; 4] = [
        RequiredField::MedicalCondition,
        RequiredField::ZipCode,
        RequiredField::PhoneNumber,
        RequiredField::Insurance,
    ];

    /// Get the snake_case key used in JSON and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredField::MedicalCondition => "medical_condition",
            RequiredField::ZipCode => "zip_code",
            RequiredField::PhoneNumber => "phone_number",
            RequiredField::Insurance => "insurance",
        }
    }

    /// Human-readable label for prompts and progress messages
    pub fn label(&self) -> &'static str {
        match self {
            RequiredField::MedicalCondition => "medical condition",
            RequiredField::ZipCode => "ZIP code",
            RequiredField::PhoneNumber => "phone number",
            RequiredField::Insurance => "insurance",
        }
    }

    /// Parse from a key or a common alias
    ///
    /// # Examples
    ///
    /// ```
    /// use carehero_domain::RequiredField;
    ///
    /// assert_eq!(RequiredField::parse("zip"), Some(RequiredField::ZipCode));
    /// assert_eq!(RequiredField::parse("phone_number"), Some(RequiredField::PhoneNumber));
    /// assert_eq!(RequiredField::parse("age"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "medical_condition" | "condition" => Some(RequiredField::MedicalCondition),
            "zip_code" | "zip" | "zipcode" => Some(RequiredField::ZipCode),
            "phone_number" | "phone" => Some(RequiredField::PhoneNumber),
            "insurance" => Some(RequiredField::Insurance),
            _ => None,
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields found in one piece of user text
///
/// Produced by the field extractor; applied to a record with
/// [`PatientRecord::apply`], which only fills fields that are still empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFields {
    /// Extracted medical condition
    pub medical_condition: Option<String>,
    /// Extracted ZIP code
    pub zip_code: Option<String>,
    /// Extracted phone number
    pub phone_number: Option<String>,
    /// Extracted insurance provider
    pub insurance: Option<String>,
    /// Symptoms mentioned in the text
    #[serde(default)]
    pub symptoms: Vec<String>,
}

impl PartialFields {
    /// True when nothing was found
    pub fn is_empty(&self) -> bool {
        self.medical_condition.is_none()
            && self.zip_code.is_none()
            && self.phone_number.is_none()
            && self.insurance.is_none()
            && self.symptoms.is_empty()
    }

    /// Get the value for a required field
    pub fn get(&self, field: RequiredField) -> Option<&str> {
        match field {
            RequiredField::MedicalCondition => self.medical_condition.as_deref(),
            RequiredField::ZipCode => self.zip_code.as_deref(),
            RequiredField::PhoneNumber => self.phone_number.as_deref(),
            RequiredField::Insurance => self.insurance.as_deref(),
        }
    }

    /// Set the value for a required field
    pub fn set(&mut self, field: RequiredField, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            RequiredField::MedicalCondition => self.medical_condition = value,
            RequiredField::ZipCode => self.zip_code = value,
            RequiredField::PhoneNumber => self.phone_number = value,
            RequiredField::Insurance => self.insurance = value,
        }
    }
}

/// The mutable session entity
///
/// Invariants:
/// - `session_id` and `created_at` never change after construction
/// - each required field is written at most once by [`set_field_if_empty`](Self::set_field_if_empty);
///   only [`correct_field`](Self::correct_field) may replace a value
/// - `symptoms` keeps insertion order and suppresses duplicates
/// - `conversation_history` is append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    session_id: String,
    created_at: u64,
    medical_condition: Option<String>,
    zip_code: Option<String>,
    phone_number: Option<String>,
    insurance: Option<String>,
    #[serde(default)]
    symptoms: Vec<String>,
    reasoning_analysis: Option<String>,
    #[serde(default)]
    conversation_history: Vec<ConversationEntry>,
}

impl PatientRecord {
    /// Create an empty record for a session
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            created_at: now_secs(),
            medical_condition: None,
            zip_code: None,
            phone_number: None,
            insurance: None,
            symptoms: Vec::new(),
            reasoning_analysis: None,
            conversation_history: Vec::new(),
        }
    }

    /// Create an empty record with a freshly generated session id
    pub fn with_new_session() -> Self {
        Self::new(crate::new_session_id())
    }

    /// Session identifier
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Creation timestamp (seconds since Unix epoch)
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Medical condition, if collected
    pub fn medical_condition(&self) -> Option<&str> {
        self.medical_condition.as_deref()
    }

    /// ZIP code, if collected
    pub fn zip_code(&self) -> Option<&str> {
        self.zip_code.as_deref()
    }

    /// Phone number, if collected
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// Insurance provider, if collected
    pub fn insurance(&self) -> Option<&str> {
        self.insurance.as_deref()
    }

    /// Symptoms in the order they were first mentioned
    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    /// Accumulated reasoning output
    pub fn reasoning_analysis(&self) -> Option<&str> {
        self.reasoning_analysis.as_deref()
    }

    /// Full conversation log
    pub fn conversation_history(&self) -> &[ConversationEntry] {
        &self.conversation_history
    }

    /// Get a required field by key
    pub fn field(&self, field: RequiredField) -> Option<&str> {
        match field {
            RequiredField::MedicalCondition => self.medical_condition(),
            RequiredField::ZipCode => self.zip_code(),
            RequiredField::PhoneNumber => self.phone_number(),
            RequiredField::Insurance => self.insurance(),
        }
    }

    fn slot_mut(&mut self, field: RequiredField) -> &mut Option<String> {
        match field {
            RequiredField::MedicalCondition => &mut self.medical_condition,
            RequiredField::ZipCode => &mut self.zip_code,
            RequiredField::PhoneNumber => &mut self.phone_number,
            RequiredField::Insurance => &mut self.insurance,
        }
    }

    /// True iff all four required fields are present
    pub fn is_complete(&self) -> bool {
        RequiredField::PRIORITY.iter().all(|f| self.field(*f).is_some())
    }

    /// Required fields still missing, in priority order
    pub fn missing_fields(&self) -> Vec<RequiredField> {
        RequiredField::PRIORITY
            .iter()
            .copied()
            .filter(|f| self.field(*f).is_none())
            .collect()
    }

    /// The next field intake should ask for
    pub fn next_missing_field(&self) -> Option<RequiredField> {
        RequiredField::PRIORITY
            .iter()
            .copied()
            .find(|f| self.field(*f).is_none())
    }

    /// Write a field only if it is still empty
    ///
    /// Blank values are ignored. Returns true when the value was written.
    pub fn set_field_if_empty(&mut self, field: RequiredField, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let slot = self.slot_mut(field);
        if slot.is_some() {
            return false;
        }
        *slot = Some(value.to_string());
        true
    }

    /// Explicitly replace a field value
    ///
    /// This is the only way to change a field that is already set. The
    /// correction is logged to the conversation history as a system entry.
    /// Returns the previous value.
    pub fn correct_field(&mut self, field: RequiredField, value: &str) -> Option<String> {
        let value = value.trim().to_string();
        let previous = self.slot_mut(field).replace(value.clone());
        let message = match &previous {
            Some(old) => format!("{} corrected from '{}' to '{}'", field.label(), old, value),
            None => format!("{} set to '{}'", field.label(), value),
        };
        self.record_message(Speaker::System, message);
        previous
    }

    /// Apply extracted fields, filling only empty slots
    ///
    /// Returns the required fields that were written by this call.
    pub fn apply(&mut self, fields: &PartialFields) -> Vec<RequiredField> {
        let mut written = Vec::new();
        for field in RequiredField::PRIORITY {
            if let Some(value) = fields.get(field) {
                if self.set_field_if_empty(field, value) {
                    written.push(field);
                }
            }
        }
        for symptom in &fields.symptoms {
            self.add_symptom(symptom);
        }
        written
    }

    /// Add a symptom, ignoring blanks and case-insensitive duplicates
    pub fn add_symptom(&mut self, symptom: &str) -> bool {
        let symptom = symptom.trim();
        if symptom.is_empty() {
            return false;
        }
        let exists = self
            .symptoms
            .iter()
            .any(|s| s.eq_ignore_ascii_case(symptom));
        if exists {
            return false;
        }
        self.symptoms.push(symptom.to_string());
        true
    }

    /// Append reasoning output, separated from earlier analysis by a blank line
    pub fn append_reasoning_analysis(&mut self, analysis: &str) {
        let analysis = analysis.trim();
        if analysis.is_empty() {
            return;
        }
        match &mut self.reasoning_analysis {
            Some(existing) => {
                existing.push_str("\n\n");
                existing.push_str(analysis);
            }
            None => self.reasoning_analysis = Some(analysis.to_string()),
        }
    }

    /// Append an entry to the conversation log
    pub fn record_message(&mut self, speaker: Speaker, message: impl Into<String>) {
        self.conversation_history.push(ConversationEntry {
            timestamp: now_secs(),
            speaker,
            message: message.into(),
        });
    }

    /// Number of messages the user has sent
    pub fn user_turns(&self) -> usize {
        self.conversation_history
            .iter()
            .filter(|e| e.speaker == Speaker::User)
            .count()
    }

    /// Last four digits of the phone number, or "0000"
    pub fn phone_suffix(&self) -> String {
        let digits: String = self
            .phone_number
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if digits.len() >= 4 {
            digits[digits.len() - 4..].to_string()
        } else {
            "0000".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_record() -> PatientRecord {
        let mut record = PatientRecord::new("s-1");
        record.set_field_if_empty(RequiredField::MedicalCondition, "headache");
        record.set_field_if_empty(RequiredField::ZipCode, "90210");
        record.set_field_if_empty(RequiredField::PhoneNumber, "555-123-4567");
        record.set_field_if_empty(RequiredField::Insurance, "Blue Cross");
        record
    }

    #[test]
    fn test_new_record_is_incomplete() {
        let record = PatientRecord::new("s-1");
        assert!(!record.is_complete());
        assert_eq!(record.missing_fields().len(), 4);
        assert_eq!(record.next_missing_field(), Some(RequiredField::MedicalCondition));
    }

    #[test]
    fn test_complete_record() {
        let record = complete_record();
        assert!(record.is_complete());
        assert!(record.missing_fields().is_empty());
        assert_eq!(record.next_missing_field(), None);
    }

    #[test]
    fn test_write_once() {
        let mut record = PatientRecord::new("s-1");
        assert!(record.set_field_if_empty(RequiredField::ZipCode, "90210"));
        assert!(!record.set_field_if_empty(RequiredField::ZipCode, "10001"));
        assert_eq!(record.zip_code(), Some("90210"));
    }

    #[test]
    fn test_blank_values_ignored() {
        let mut record = PatientRecord::new("s-1");
        assert!(!record.set_field_if_empty(RequiredField::Insurance, "   "));
        assert_eq!(record.insurance(), None);
    }

    #[test]
    fn test_next_missing_follows_priority() {
        let mut record = PatientRecord::new("s-1");
        record.set_field_if_empty(RequiredField::Insurance, "Aetna");
        record.set_field_if_empty(RequiredField::MedicalCondition, "cough");
        assert_eq!(record.next_missing_field(), Some(RequiredField::ZipCode));
    }

    #[test]
    fn test_apply_partial_fields() {
        let mut record = PatientRecord::new("s-1");
        record.set_field_if_empty(RequiredField::ZipCode, "90210");

        let mut fields = PartialFields::default();
        fields.set(RequiredField::ZipCode, "10001");
        fields.set(RequiredField::PhoneNumber, "555-123-4567");
        fields.symptoms = vec!["fever".to_string(), "Fever".to_string()];

        let written = record.apply(&fields);
        assert_eq!(written, vec![RequiredField::PhoneNumber]);
        assert_eq!(record.zip_code(), Some("90210"));
        assert_eq!(record.symptoms(), &["fever".to_string()]);
    }

    #[test]
    fn test_symptoms_keep_insertion_order() {
        let mut record = PatientRecord::new("s-1");
        record.add_symptom("nausea");
        record.add_symptom("dizziness");
        record.add_symptom("NAUSEA");
        assert_eq!(record.symptoms(), &["nausea".to_string(), "dizziness".to_string()]);
    }

    #[test]
    fn test_correct_field_logs_system_entry() {
        let mut record = complete_record();
        let previous = record.correct_field(RequiredField::ZipCode, "10001");
        assert_eq!(previous.as_deref(), Some("90210"));
        assert_eq!(record.zip_code(), Some("10001"));

        let last = record.conversation_history().last().unwrap();
        assert_eq!(last.speaker, Speaker::System);
        assert!(last.message.contains("90210"));
    }

    #[test]
    fn test_user_turns() {
        let mut record = PatientRecord::new("s-1");
        record.record_message(Speaker::User, "hi");
        record.record_message(Speaker::IntakeRole, "hello");
        record.record_message(Speaker::User, "headache");
        assert_eq!(record.user_turns(), 2);
        assert_eq!(record.conversation_history().len(), 3);
    }

    #[test]
    fn test_phone_suffix() {
        let record = complete_record();
        assert_eq!(record.phone_suffix(), "4567");
        assert_eq!(PatientRecord::new("x").phone_suffix(), "0000");
    }

    #[test]
    fn test_serde_round_trip() {
        let mut record = complete_record();
        record.record_message(Speaker::User, "hello");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains('\n'));
        let back: PatientRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_required_field_parse() {
        assert_eq!(RequiredField::parse("Condition"), Some(RequiredField::MedicalCondition));
        assert_eq!(RequiredField::parse("insurance"), Some(RequiredField::Insurance));
        assert_eq!(RequiredField::parse("name"), None);
    }

    #[test]
    fn test_reasoning_analysis_accumulates() {
        let mut record = PatientRecord::new("s");
        record.append_reasoning_analysis("first");
        record.append_reasoning_analysis("  ");
        record.append_reasoning_analysis("second");
        assert_eq!(record.reasoning_analysis(), Some("first\n\nsecond"));
    }
}
