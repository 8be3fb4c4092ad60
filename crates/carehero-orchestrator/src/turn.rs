//! Per-turn and per-session views returned to callers

use carehero_domain::{PartialFields, PatientRecord, RequiredField};
use carehero_router::{ConversationState, NextStep, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal phase of one dispatched turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Intake continues
    ContinueCollecting,
    /// Record completed this turn; first analysis included
    ReasoningAnalysis,
    /// Symptom analysis continues
    ContinueSymptomAnalysis,
    /// Guardrail blocked the inbound text; nothing else ran
    InputValidationFailed,
    /// Guardrail blocked the role output; response replaced, data kept
    OutputValidationFailed,
}

impl From<NextStep> for TurnPhase {
    fn from(step: NextStep) -> Self {
        match step {
            NextStep::ContinueCollecting => TurnPhase::ContinueCollecting,
            NextStep::ReasoningAnalysis => TurnPhase::ReasoningAnalysis,
            NextStep::ContinueSymptomAnalysis => TurnPhase::ContinueSymptomAnalysis,
        }
    }
}

impl TurnPhase {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::ContinueCollecting => "continue_collecting",
            TurnPhase::ReasoningAnalysis => "reasoning_analysis",
            TurnPhase::ContinueSymptomAnalysis => "continue_symptom_analysis",
            TurnPhase::InputValidationFailed => "input_validation_failed",
            TurnPhase::OutputValidationFailed => "output_validation_failed",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced the response text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Responder {
    /// The guardrail policy
    Guardrail,
    /// The intake role
    Intake,
    /// The reasoning role
    Reasoning,
}

impl From<Role> for Responder {
    fn from(role: Role) -> Self {
        match role {
            Role::Intake => Responder::Intake,
            Role::Reasoning | Role::Extraction => Responder::Reasoning,
        }
    }
}

/// Result of one dispatched turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    /// Session the turn belongs to (newly created when none was given)
    pub session_id: String,

    /// Text for the user
    pub response: String,

    /// Producer of `response`
    pub responder: Responder,

    /// Terminal phase of the turn
    pub phase: TurnPhase,

    /// Guardrail advisory when the output was replaced
    pub warning: Option<String>,

    /// Fields collected so far
    pub collected: PartialFields,

    /// Fields still missing, in intake order
    pub missing_fields: Vec<RequiredField>,

    /// True when this turn started background discovery
    pub discovery_started: bool,
}

impl TurnResponse {
    /// True when the record is complete
    pub fn is_complete(&self) -> bool {
        self.missing_fields.is_empty()
    }
}

/// Progress of background discovery for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryState {
    /// Not started (record incomplete or discovery disabled)
    NotStarted,
    /// Running in the background
    Running,
    /// Finished; results are available
    Finished,
}

/// Snapshot of a session for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Session id
    pub session_id: String,
    /// Conversation state
    pub state: ConversationState,
    /// Fields collected so far
    pub collected: PartialFields,
    /// Fields still missing, in intake order
    pub missing_fields: Vec<RequiredField>,
    /// Field the intake role will ask for next
    pub next_field: Option<RequiredField>,
    /// Ordered symptom set
    pub symptoms: Vec<String>,
    /// History entries
    pub conversation_turns: usize,
    /// Background discovery progress
    pub discovery: DiscoveryState,
}

/// Fields currently set on `record`
pub(crate) fn collected_fields(record: &PatientRecord) -> PartialFields {
    let mut fields = PartialFields::default();
    for field in RequiredField::PRIORITY {
        if let Some(value) = record.field(field) {
            fields.set(field, value);
        }
    }
    fields.symptoms = record.symptoms().to_vec();
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_next_step() {
        assert_eq!(
            TurnPhase::from(NextStep::ReasoningAnalysis),
            TurnPhase::ReasoningAnalysis
        );
        assert_eq!(TurnPhase::InputValidationFailed.as_str(), "input_validation_failed");
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&TurnPhase::OutputValidationFailed).unwrap();
        assert_eq!(json, "\"output_validation_failed\"");
    }

    #[test]
    fn test_collected_fields() {
        let mut record = PatientRecord::new("s");
        record.set_field_if_empty(RequiredField::Insurance, "Aetna");
        record.add_symptom("fever");
        let fields = collected_fields(&record);
        assert_eq!(fields.insurance.as_deref(), Some("Aetna"));
        assert!(fields.zip_code.is_none());
        assert_eq!(fields.symptoms, vec!["fever".to_string()]);
    }
}
