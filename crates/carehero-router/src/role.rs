//! Conversational roles and conversation states

use carehero_domain::{PatientRecord, Speaker};
use carehero_extractor::prompt::{record_context, EXTRACTION_SYSTEM_PROMPT};
use serde::{Deserialize, Serialize};
use std::fmt;

const INTAKE_SYSTEM_PROMPT: &str = "You are a friendly and professional medical intake specialist having a real conversation with a patient. Gather basic patient information one piece at a time through natural dialogue. Be empathetic and patient. When a patient greets you, greet them back warmly and ask what brings them in today. Never invent conversations or data; only respond to what the patient actually says.";

const REASONING_SYSTEM_PROMPT: &str = "You are an experienced medical assistant specializing in symptom analysis. Based on the patient's reported condition you identify related symptoms, ask relevant follow-up questions and give preliminary, non-diagnostic observations. Always remind the patient to consult a healthcare professional.";

/// A conversational role, each bound to one prompt template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Collects the required fields, one question at a time
    Intake,
    /// Symptom analysis once intake is complete
    Reasoning,
    /// Structures the conversation into JSON
    Extraction,
}

impl Role {
    /// System prompt for this role
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Role::Intake => INTAKE_SYSTEM_PROMPT,
            Role::Reasoning => REASONING_SYSTEM_PROMPT,
            Role::Extraction => EXTRACTION_SYSTEM_PROMPT,
        }
    }

    /// Speaker recorded in the conversation history
    pub fn speaker(&self) -> Speaker {
        match self {
            Role::Intake => Speaker::IntakeRole,
            Role::Reasoning => Speaker::ReasoningRole,
            Role::Extraction => Speaker::System,
        }
    }

    /// Role name used in responses and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Intake => "intake",
            Role::Reasoning => "reasoning",
            Role::Extraction => "extraction",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversation state, derived from record completeness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    /// Required fields still missing
    Collecting,
    /// All required fields present
    Analyzing,
}

impl ConversationState {
    /// State for a record
    pub fn of(record: &PatientRecord) -> Self {
        if record.is_complete() {
            ConversationState::Analyzing
        } else {
            ConversationState::Collecting
        }
    }
}

/// What the caller should expect from the next turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    /// Intake continues
    ContinueCollecting,
    /// This turn completed the record and ran the first analysis
    ReasoningAnalysis,
    /// Symptom analysis continues
    ContinueSymptomAnalysis,
}

impl NextStep {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            NextStep::ContinueCollecting => "continue_collecting",
            NextStep::ReasoningAnalysis => "reasoning_analysis",
            NextStep::ContinueSymptomAnalysis => "continue_symptom_analysis",
        }
    }
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt for the intake role
pub(crate) fn intake_prompt(user_text: &str, record: &PatientRecord) -> String {
    let instruction = match record.next_missing_field() {
        Some(field) => format!(
            "Acknowledge anything the patient just shared, then ask for exactly one missing item: their {}.",
            field.label()
        ),
        None => "All required information has been collected. Thank the patient and let them know you will now look at their condition in more detail.".to_string(),
    };
    format!(
        "Respond naturally to the patient. Do not answer with JSON.\n\n{}\n\nCurrent patient data: {}\n\nPatient said: {}",
        instruction,
        record_context(record),
        user_text
    )
}

/// Prompt for the reasoning role
pub(crate) fn reasoning_prompt(user_text: &str, record: &PatientRecord, initial: bool) -> String {
    let focus = if initial {
        "This is the initial analysis: give a comprehensive first assessment and ask specific questions about the symptoms."
    } else {
        "If the patient mentions new symptoms, acknowledge them and ask about those symptoms specifically."
    };
    format!(
        "{}\n\nPatient's medical condition: {}\nCurrent patient data: {}\n\nPatient said: {}",
        focus,
        record.medical_condition().unwrap_or("Not specified"),
        record_context(record),
        user_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use carehero_domain::RequiredField;

    #[test]
    fn test_state_follows_completeness() {
        let mut record = PatientRecord::new("s");
        assert_eq!(ConversationState::of(&record), ConversationState::Collecting);
        for field in RequiredField::PRIORITY {
            record.set_field_if_empty(field, "x");
        }
        assert_eq!(ConversationState::of(&record), ConversationState::Analyzing);
    }

    #[test]
    fn test_intake_prompt_asks_for_next_field() {
        let mut record = PatientRecord::new("s");
        record.set_field_if_empty(RequiredField::MedicalCondition, "headache");
        let prompt = intake_prompt("hello", &record);
        assert!(prompt.contains(RequiredField::ZipCode.label()));
        assert!(prompt.contains("Patient said: hello"));
    }

    #[test]
    fn test_reasoning_prompt_defaults_condition() {
        let record = PatientRecord::new("s");
        let prompt = reasoning_prompt("more pain", &record, false);
        assert!(prompt.contains("Not specified"));
    }

    #[test]
    fn test_next_step_wire_names() {
        assert_eq!(NextStep::ReasoningAnalysis.to_string(), "reasoning_analysis");
        let json = serde_json::to_string(&NextStep::ContinueSymptomAnalysis).unwrap();
        assert_eq!(json, "\"continue_symptom_analysis\"");
    }

    #[test]
    fn test_roles_have_distinct_prompts() {
        assert_ne!(Role::Intake.system_prompt(), Role::Reasoning.system_prompt());
        assert_eq!(Role::Extraction.system_prompt(), EXTRACTION_SYSTEM_PROMPT);
    }
}
