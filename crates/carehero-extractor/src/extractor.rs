//! Core FieldExtractor implementation

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::fallback;
use crate::parser::{decode_strict, Decoded};
use crate::prompt::{field_prompt, snapshot_prompt, EXTRACTION_SYSTEM_PROMPT};
use crate::sanitize;
use crate::snapshot::{ExtractionMetadata, ExtractionSnapshot, StructuredSnapshot};
use carehero_domain::{
    now_secs, GenerationRequest, PartialFields, PatientRecord, RequiredField, TextGenerator,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const EXTRACTION_TEMPERATURE: f32 = 0.1;
const FIELD_MAX_TOKENS: u32 = 500;
const SNAPSHOT_MAX_TOKENS: u32 = 1500;

/// Shape the LLM must return for per-turn extraction
#[derive(Debug, Deserialize)]
struct LlmFields {
    found: Option<bool>,
    medical_condition: Option<String>,
    zip_code: Option<String>,
    phone_number: Option<String>,
    insurance: Option<String>,
    #[serde(default)]
    additional_symptoms: Vec<String>,
    #[allow(dead_code)]
    confidence: Option<String>,
}

impl LlmFields {
    fn value(&self, field: RequiredField) -> Option<&str> {
        match field {
            RequiredField::MedicalCondition => self.medical_condition.as_deref(),
            RequiredField::ZipCode => self.zip_code.as_deref(),
            RequiredField::PhoneNumber => self.phone_number.as_deref(),
            RequiredField::Insurance => self.insurance.as_deref(),
        }
    }
}

/// Which strategy produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Decoded LLM output
    Llm,
    /// Regex fallback after an LLM failure
    RegexFallback,
}

/// Fields plus the strategy that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExtraction {
    /// Extracted fields (only slots empty on the record)
    pub fields: PartialFields,
    /// Producing strategy
    pub strategy: ExtractionStrategy,
}

/// The FieldExtractor parses user text into patient fields
pub struct FieldExtractor {
    llm: Arc<dyn TextGenerator>,
    config: ExtractorConfig,
}

impl FieldExtractor {
    /// Create a new FieldExtractor
    pub fn new(llm: Arc<dyn TextGenerator>, config: ExtractorConfig) -> Self {
        Self { llm, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract fields from one user message
    ///
    /// Never fails: LLM errors, timeouts and malformed output select the
    /// regex fallback.
    pub async fn extract(&self, raw_text: &str, record: &PatientRecord) -> PartialFields {
        self.extract_detailed(raw_text, record).await.fields
    }

    /// Extract fields and report which strategy was used
    pub async fn extract_detailed(&self, raw_text: &str, record: &PatientRecord) -> FieldExtraction {
        let text: String = raw_text.chars().take(self.config.max_input_chars).collect();

        let (mut fields, strategy) = match self.extract_with_llm(&text, record).await {
            Ok(fields) => (fields, ExtractionStrategy::Llm),
            Err(e) => {
                warn!(session_id = record.session_id(), error = %e, "LLM extraction failed, using regex fallback");
                (fallback::extract_fields(&text, record), ExtractionStrategy::RegexFallback)
            }
        };

        self.synthesize_condition(&mut fields, record);

        info!(
            session_id = record.session_id(),
            ?strategy,
            condition = fields.medical_condition.is_some(),
            zip = fields.zip_code.is_some(),
            phone = fields.phone_number.is_some(),
            insurance = fields.insurance.is_some(),
            symptoms = fields.symptoms.len(),
            "Field extraction complete"
        );

        FieldExtraction { fields, strategy }
    }

    async fn call_llm(&self, prompt: String, max_tokens: u32) -> Result<String, ExtractorError> {
        let request = GenerationRequest::new(prompt)
            .with_system(EXTRACTION_SYSTEM_PROMPT)
            .with_temperature(EXTRACTION_TEMPERATURE)
            .with_max_tokens(max_tokens);

        debug!(prompt_chars = request.prompt.len(), "Calling extraction LLM");

        let response = timeout(self.config.llm_timeout(), self.llm.generate(&request))
            .await
            .map_err(|_| ExtractorError::Timeout)??;

        debug!(response_chars = response.len(), "Extraction LLM responded");
        Ok(response)
    }

    async fn extract_with_llm(
        &self,
        text: &str,
        record: &PatientRecord,
    ) -> Result<PartialFields, ExtractorError> {
        let response = self
            .call_llm(field_prompt(text, record), FIELD_MAX_TOKENS)
            .await?;

        let decoded = match decode_strict::<LlmFields>(&response) {
            Decoded::Structured(decoded) => decoded,
            Decoded::Unstructured { reason, .. } => {
                return Err(ExtractorError::InvalidFormat(reason));
            }
        };

        let mut fields = PartialFields::default();
        if decoded.found == Some(false) {
            return Ok(fields);
        }

        for field in RequiredField::PRIORITY {
            if record.field(field).is_some() {
                continue;
            }
            let Some(proposed) = decoded.value(field) else {
                continue;
            };
            match sanitize::field(field, proposed) {
                Some(value) => fields.set(field, value),
                None => debug!(field = field.as_str(), "Rejected extracted value"),
            }
        }

        for symptom in &decoded.additional_symptoms {
            let Some(symptom) = sanitize::free_text(symptom) else {
                continue;
            };
            if !fields.symptoms.iter().any(|s| s.eq_ignore_ascii_case(&symptom)) {
                fields.symptoms.push(symptom);
            }
        }

        Ok(fields)
    }

    /// Early in a conversation, derive a missing condition from symptoms
    fn synthesize_condition(&self, fields: &mut PartialFields, record: &PatientRecord) {
        if record.medical_condition().is_some() || fields.medical_condition.is_some() {
            return;
        }
        if record.conversation_history().len() > self.config.early_turn_window {
            return;
        }

        let mut symptoms: Vec<&str> = record.symptoms().iter().map(String::as_str).collect();
        for symptom in &fields.symptoms {
            if !symptoms.iter().any(|s| s.eq_ignore_ascii_case(symptom)) {
                symptoms.push(symptom);
            }
        }
        if symptoms.is_empty() {
            return;
        }

        let condition = format!("Patient reports: {}", symptoms.join(", "));
        debug!(%condition, "Condition synthesized from symptoms");
        fields.medical_condition = Some(condition);
    }

    /// Produce a structured snapshot of the whole conversation
    ///
    /// Never fails: an LLM error or undecodable output yields
    /// `Decoded::Unstructured`.
    pub async fn extract_snapshot(&self, record: &PatientRecord) -> ExtractionSnapshot {
        let data = match self
            .call_llm(snapshot_prompt(record), SNAPSHOT_MAX_TOKENS)
            .await
        {
            Ok(response) => decode_strict::<StructuredSnapshot>(&response),
            Err(e) => Decoded::Unstructured {
                raw: String::new(),
                reason: e.to_string(),
            },
        };

        if let Decoded::Unstructured { reason, .. } = &data {
            warn!(session_id = record.session_id(), %reason, "Snapshot kept unstructured");
        }

        ExtractionSnapshot {
            data,
            extraction_metadata: ExtractionMetadata {
                timestamp: now_secs(),
                session_id: record.session_id().to_string(),
                conversation_turns: record.conversation_history().len(),
            },
        }
    }
}
