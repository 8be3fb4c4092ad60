//! Structured conversation snapshot types

use crate::parser::Decoded;
use serde::{Deserialize, Serialize};

/// Personal details mentioned in the conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    /// Name
    pub name: Option<String>,
    /// Age
    pub age: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// ZIP code
    pub zip_code: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Insurance
    pub insurance: Option<String>,
    /// Emergency contact
    pub emergency_contact: Option<String>,
}

/// Medical details mentioned in the conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicalInfo {
    /// Primary complaint
    pub primary_condition: Option<String>,
    /// Symptoms
    pub symptoms: Vec<String>,
    /// Severity indicators
    pub severity: Option<String>,
    /// Duration of symptoms
    pub duration: Option<String>,
    /// Previous treatments
    pub previous_treatments: Vec<String>,
    /// Current medications
    pub current_medications: Vec<String>,
    /// Allergies
    pub allergies: Vec<String>,
}

/// Other context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalContext {
    /// Preferred language
    pub preferred_language: Option<String>,
    /// Accessibility needs
    pub accessibility_needs: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Model-reported confidence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfidence {
    /// high / medium / low
    pub personal_info_confidence: Option<String>,
    /// high / medium / low
    pub medical_info_confidence: Option<String>,
    /// Percentage string
    pub overall_completeness: Option<String>,
}

/// The schema the extraction role must return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredSnapshot {
    /// Personal details
    pub personal_info: PersonalInfo,
    /// Medical details
    pub medical_info: MedicalInfo,
    /// Other context
    #[serde(default)]
    pub additional_context: AdditionalContext,
    /// Confidence
    #[serde(default)]
    pub extraction_confidence: ExtractionConfidence,
}

/// When and from what a snapshot was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Seconds since Unix epoch
    pub timestamp: u64,
    /// Session the conversation belongs to
    pub session_id: String,
    /// History entries analyzed
    pub conversation_turns: usize,
}

/// One entry in the per-session extracted-data history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSnapshot {
    /// Decoded payload, or the raw text when decoding failed
    pub data: Decoded<StructuredSnapshot>,
    /// Provenance
    pub extraction_metadata: ExtractionMetadata,
}
