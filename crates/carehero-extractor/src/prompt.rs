//! Prompts for the extraction role

use carehero_domain::{PatientRecord, Speaker};
use serde::Serialize;

/// System prompt for the extraction role
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a data extraction specialist with deep knowledge of medical terminology. You read patient conversations and return only JSON in the exact schema requested. Never invent values; use null when something was not said.";

const FIELD_INSTRUCTIONS: &str = r#"Extract patient information from this specific user input.

Focus on:
1. Medical condition/complaint (symptoms, pain, illness, health issues)
2. ZIP code (5-digit postal code)
3. Phone number (any format: XXX-XXX-XXXX, (XXX) XXX-XXXX, etc.)
4. Insurance information (provider names, policy details)
5. Any additional symptoms

Return ONLY the new information found in this input as JSON:
{"medical_condition": string|null, "zip_code": string|null, "phone_number": string|null, "insurance": string|null, "additional_symptoms": [string], "confidence": "high"|"medium"|"low"}

If no relevant information is found, return {"found": false}"#;

const SNAPSHOT_INSTRUCTIONS: &str = r#"Extract and structure all patient information from the conversation below.

Return ONLY JSON in this format:
{
  "personal_info": {"name": null, "age": null, "phone": null, "zip_code": null, "address": null, "insurance": null, "emergency_contact": null},
  "medical_info": {"primary_condition": null, "symptoms": [], "severity": null, "duration": null, "previous_treatments": [], "current_medications": [], "allergies": []},
  "additional_context": {"preferred_language": null, "accessibility_needs": null, "notes": null},
  "extraction_confidence": {"personal_info_confidence": "high|medium|low", "medical_info_confidence": "high|medium|low", "overall_completeness": "percentage"}
}
All values are strings, string arrays, or null."#;

#[derive(Serialize)]
struct RecordContext<'a> {
    medical_condition: Option<&'a str>,
    zip_code: Option<&'a str>,
    phone_number: Option<&'a str>,
    insurance: Option<&'a str>,
    symptoms: &'a [String],
    missing_fields: Vec<&'static str>,
}

/// Compact JSON view of the collected fields, for prompts
pub fn record_context(record: &PatientRecord) -> String {
    let context = RecordContext {
        medical_condition: record.medical_condition(),
        zip_code: record.zip_code(),
        phone_number: record.phone_number(),
        insurance: record.insurance(),
        symptoms: record.symptoms(),
        missing_fields: record.missing_fields().iter().map(|f| f.as_str()).collect(),
    };
    serde_json::to_string(&context).unwrap_or_default()
}

/// Prompt for per-turn field extraction
pub fn field_prompt(user_text: &str, record: &PatientRecord) -> String {
    format!(
        "{}\n\nCurrent patient data: {}\n\nUser input:\n---\n{}\n---",
        FIELD_INSTRUCTIONS,
        record_context(record),
        user_text
    )
}

fn speaker_label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => "Patient",
        Speaker::IntakeRole => "Intake",
        Speaker::ReasoningRole => "Reasoning",
        Speaker::System => "System",
    }
}

/// Prompt for the full-history structured snapshot
pub fn snapshot_prompt(record: &PatientRecord) -> String {
    let mut prompt = String::from(SNAPSHOT_INSTRUCTIONS);
    prompt.push_str("\n\nCurrent extracted data: ");
    prompt.push_str(&record_context(record));
    prompt.push_str("\n\nConversation history:\n");
    for entry in record.conversation_history() {
        prompt.push_str(speaker_label(entry.speaker));
        prompt.push_str(": ");
        prompt.push_str(&entry.message);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use carehero_domain::RequiredField;

    #[test]
    fn test_record_context_lists_missing() {
        let mut record = PatientRecord::new("s");
        record.set_field_if_empty(RequiredField::ZipCode, "90210");
        let context = record_context(&record);
        assert!(context.contains("\"zip_code\":\"90210\""));
        assert!(context.contains("\"missing_fields\":[\"medical_condition\",\"phone_number\",\"insurance\"]"));
    }

    #[test]
    fn test_snapshot_prompt_includes_history() {
        let mut record = PatientRecord::new("s");
        record.record_message(Speaker::User, "I have a cough");
        record.record_message(Speaker::IntakeRole, "Sorry to hear that.");
        let prompt = snapshot_prompt(&record);
        assert!(prompt.contains("Patient: I have a cough"));
        assert!(prompt.contains("Intake: Sorry to hear that."));
    }

    #[test]
    fn test_field_prompt_embeds_input() {
        let record = PatientRecord::new("s");
        let prompt = field_prompt("my zip is 90210", &record);
        assert!(prompt.contains("my zip is 90210"));
        assert!(prompt.contains("{\"found\": false}"));
    }
}
