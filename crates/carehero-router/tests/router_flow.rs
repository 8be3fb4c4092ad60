//! Conversation flow tests for the role router

use carehero_domain::{PatientRecord, RequiredField, Speaker};
use carehero_extractor::{ExtractionStrategy, ExtractorConfig, FieldExtractor};
use carehero_llm::{MockProvider, SAFE_FILLER};
use carehero_router::{
    ConversationState, ConversationalRoleRouter, NextStep, OutputScreen, Rejection, Role,
    RouterConfig,
};
use std::sync::Arc;

const INTAKE_REPLY: &str = "Thank you for sharing that. Could you tell me a bit more?";
const REASONING_REPLY: &str =
    "Headaches have many possible causes. Please consult a healthcare professional.";

fn scripted_llm() -> MockProvider {
    let mut llm = MockProvider::new("not json at all");
    llm.add_rule(
        "Extract and structure all patient information",
        r#"{"personal_info": {"zip_code": "90210"}, "medical_info": {"primary_condition": "headache"}}"#,
    );
    llm.add_rule("medical intake specialist", INTAKE_REPLY);
    llm.add_rule("specializing in symptom analysis", REASONING_REPLY);
    llm
}

fn router(llm: MockProvider) -> ConversationalRoleRouter {
    let llm = Arc::new(llm);
    let extractor = FieldExtractor::new(llm.clone(), ExtractorConfig::default());
    ConversationalRoleRouter::new(llm, extractor, RouterConfig::default())
}

#[tokio::test]
async fn test_four_turn_intake_transitions_on_last_turn() {
    let llm = scripted_llm();
    let router = router(llm.clone());
    let mut record = PatientRecord::new("flow");

    let first = router.handle_turn(&mut record, "I have a terrible headache").await;
    assert_eq!(first.next_step, NextStep::ContinueCollecting);
    assert_eq!(first.role, Role::Intake);
    assert_eq!(first.response, INTAKE_REPLY);
    assert_eq!(first.extraction, Some(ExtractionStrategy::RegexFallback));
    assert_eq!(record.medical_condition(), Some("I have a terrible headache"));

    let second = router.handle_turn(&mut record, "90210").await;
    assert_eq!(second.written_fields, vec![RequiredField::ZipCode]);
    assert!(llm.prompts().iter().any(|p| p.contains("their phone number")));

    let third = router.handle_turn(&mut record, "555-123-4567").await;
    assert_eq!(third.next_step, NextStep::ContinueCollecting);
    assert_eq!(record.phone_number(), Some("555-123-4567"));

    let fourth = router.handle_turn(&mut record, "Blue Cross").await;
    assert!(record.is_complete());
    assert!(fourth.transitioned);
    assert_eq!(fourth.state, ConversationState::Analyzing);
    assert_eq!(fourth.next_step, NextStep::ReasoningAnalysis);
    assert_eq!(fourth.role, Role::Reasoning);
    assert_eq!(fourth.response, format!("{}\n\n{}", INTAKE_REPLY, REASONING_REPLY));
    assert_eq!(record.reasoning_analysis(), Some(REASONING_REPLY));

    let snapshot = fourth.snapshot.expect("transition produces a snapshot");
    assert!(snapshot.data.is_structured());

    // 4 user, 4 intake, 1 reasoning
    assert_eq!(record.conversation_history().len(), 9);
}

#[tokio::test]
async fn test_analyzing_turns_use_reasoning_only() {
    let llm = scripted_llm();
    let router = router(llm.clone());
    let mut record = PatientRecord::new("analyzing");
    for field in RequiredField::PRIORITY {
        record.set_field_if_empty(field, "given");
    }

    let turn = router.handle_turn(&mut record, "Now I also feel dizzy").await;
    assert_eq!(turn.next_step, NextStep::ContinueSymptomAnalysis);
    assert_eq!(turn.role, Role::Reasoning);
    assert!(!turn.transitioned);
    assert!(turn.extraction.is_none());
    assert!(turn.snapshot.is_some());
    assert_eq!(turn.response, REASONING_REPLY);

    router.handle_turn(&mut record, "It started yesterday").await;
    let analysis = record.reasoning_analysis().unwrap();
    assert_eq!(analysis.matches(REASONING_REPLY).count(), 2);

    // Extraction of fields never ran: no per-turn prompt was issued
    assert!(!llm
        .prompts()
        .iter()
        .any(|p| p.contains("Extract patient information from this specific user input")));
}

#[tokio::test]
async fn test_role_failure_yields_filler() {
    let mut llm = MockProvider::new("not json");
    llm.add_error_rule("medical intake specialist");
    let router = router(llm);
    let mut record = PatientRecord::new("failing");

    let turn = router.handle_turn(&mut record, "hello").await;
    assert_eq!(turn.response, SAFE_FILLER);
    assert_eq!(turn.next_step, NextStep::ContinueCollecting);

    let last = record.conversation_history().last().unwrap();
    assert_eq!(last.speaker, Speaker::IntakeRole);
    assert_eq!(last.message, SAFE_FILLER);
}

#[tokio::test]
async fn test_llm_extraction_fills_several_fields_in_one_turn() {
    let mut llm = MockProvider::new("not json");
    llm.add_rule(
        "Extract patient information from this specific user input",
        r#"{"medical_condition": "sore throat", "zip_code": "10001", "phone_number": null, "insurance": null}"#,
    );
    llm.add_rule("medical intake specialist", INTAKE_REPLY);
    let router = router(llm);
    let mut record = PatientRecord::new("multi");

    let turn = router
        .handle_turn(&mut record, "sore throat, I'm in 10001")
        .await;
    assert_eq!(turn.extraction, Some(ExtractionStrategy::Llm));
    assert_eq!(
        turn.written_fields,
        vec![RequiredField::MedicalCondition, RequiredField::ZipCode]
    );
    assert_eq!(record.next_missing_field(), Some(RequiredField::PhoneNumber));
}

const REPLACEMENT: &str = "Please consult a healthcare professional.";

/// Rejects any output mentioning ibuprofen
struct NoDosing;

impl OutputScreen for NoDosing {
    fn screen(&self, text: &str, _session_id: &str) -> Option<Rejection> {
        text.contains("ibuprofen").then(|| Rejection {
            replacement: REPLACEMENT.to_string(),
            reason: "dosing advice".to_string(),
        })
    }
}

#[tokio::test]
async fn test_rejected_intake_reply_is_not_recorded() {
    let mut llm = MockProvider::new("not json at all");
    llm.add_rule("medical intake specialist", "Take ibuprofen twice a day.");
    let router = router(llm).with_output_screen(Arc::new(NoDosing));
    let mut record = PatientRecord::new("screened");

    let turn = router.handle_turn(&mut record, "I have a headache").await;
    assert_eq!(turn.response, REPLACEMENT);
    assert_eq!(turn.rejection.as_deref(), Some("dosing advice"));

    let history = record.conversation_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].message, REPLACEMENT);
    assert!(history.iter().all(|e| !e.message.contains("ibuprofen")));
}

#[tokio::test]
async fn test_rejected_analysis_stays_out_of_later_prompts() {
    let mut llm = MockProvider::new("not json at all");
    llm.add_rule("specializing in symptom analysis", "Take ibuprofen for that.");
    let router = router(llm.clone()).with_output_screen(Arc::new(NoDosing));
    let mut record = PatientRecord::new("screened-analysis");
    for field in RequiredField::PRIORITY {
        record.set_field_if_empty(field, "given");
    }

    let first = router.handle_turn(&mut record, "My head hurts").await;
    assert_eq!(first.response, REPLACEMENT);
    assert!(first.rejection.is_some());
    assert_eq!(record.reasoning_analysis(), None);

    router.handle_turn(&mut record, "It is worse at night").await;
    assert!(llm.prompts().iter().all(|p| !p.contains("ibuprofen")));
    assert!(record
        .conversation_history()
        .iter()
        .all(|e| !e.message.contains("ibuprofen")));
}

#[tokio::test]
async fn test_accepted_output_has_no_rejection() {
    let router = router(scripted_llm()).with_output_screen(Arc::new(NoDosing));
    let mut record = PatientRecord::new("clean");

    let turn = router.handle_turn(&mut record, "I have a headache").await;
    assert_eq!(turn.response, INTAKE_REPLY);
    assert!(turn.rejection.is_none());
}
