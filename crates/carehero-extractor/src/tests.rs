//! Integration tests for the FieldExtractor

#[cfg(test)]
mod tests {
    use crate::{Decoded, ExtractionStrategy, ExtractorConfig, FieldExtractor};
    use async_trait::async_trait;
    use carehero_domain::{
        CapabilityError, GenerationRequest, PatientRecord, RequiredField, Speaker, TextGenerator,
    };
    use carehero_llm::MockProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn extractor(llm: MockProvider) -> FieldExtractor {
        FieldExtractor::new(Arc::new(llm), ExtractorConfig::default())
    }

    fn record_with_user_turn(text: &str) -> PatientRecord {
        let mut record = PatientRecord::new("test-session");
        record.record_message(Speaker::User, text);
        record
    }

    #[tokio::test]
    async fn test_llm_fields_applied() {
        let llm = MockProvider::new(
            r#"```json
{"medical_condition": "migraine", "zip_code": "90210", "phone_number": "555-123-4567",
 "insurance": "Aetna", "additional_symptoms": ["nausea", "Nausea", ""], "confidence": "high"}
```"#,
        );
        let record = record_with_user_turn("migraine, 90210, 555-123-4567, Aetna");
        let result = extractor(llm).extract_detailed("migraine, 90210, 555-123-4567, Aetna", &record).await;

        assert_eq!(result.strategy, ExtractionStrategy::Llm);
        assert_eq!(result.fields.medical_condition.as_deref(), Some("migraine"));
        assert_eq!(result.fields.zip_code.as_deref(), Some("90210"));
        assert_eq!(result.fields.phone_number.as_deref(), Some("555-123-4567"));
        assert_eq!(result.fields.insurance.as_deref(), Some("Aetna"));
        assert_eq!(result.fields.symptoms, vec!["nausea".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_llm_values_rejected() {
        let llm = MockProvider::new(
            r#"{"zip_code": "902", "phone_number": "12345", "insurance": "null"}"#,
        );
        let record = record_with_user_turn("stuff");
        let result = extractor(llm).extract_detailed("stuff", &record).await;

        assert_eq!(result.strategy, ExtractionStrategy::Llm);
        assert!(result.fields.is_empty());
    }

    #[tokio::test]
    async fn test_found_false_is_empty() {
        let llm = MockProvider::new(r#"{"found": false}"#);
        let record = record_with_user_turn("hello");
        let result = extractor(llm).extract_detailed("hello", &record).await;
        assert_eq!(result.strategy, ExtractionStrategy::Llm);
        assert!(result.fields.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back_to_regex() {
        let llm = MockProvider::new("Sure! The zip code is 90210.");
        let record = record_with_user_turn("I live in 90210");
        let result = extractor(llm).extract_detailed("I live in 90210", &record).await;

        assert_eq!(result.strategy, ExtractionStrategy::RegexFallback);
        assert_eq!(result.fields.zip_code.as_deref(), Some("90210"));
    }

    #[tokio::test]
    async fn test_llm_error_falls_back_to_regex() {
        let mut llm = MockProvider::default();
        llm.add_error_rule("Extract patient information");
        let record = record_with_user_turn("call me at (555) 123-4567");
        let result = extractor(llm)
            .extract_detailed("call me at (555) 123-4567", &record)
            .await;

        assert_eq!(result.strategy, ExtractionStrategy::RegexFallback);
        assert_eq!(result.fields.phone_number.as_deref(), Some("(555) 123-4567"));
    }

    #[tokio::test]
    async fn test_never_overwrites_set_field() {
        // LLM path
        let llm = MockProvider::new(r#"{"zip_code": "10001"}"#);
        let mut record = record_with_user_turn("actually 10001");
        record.set_field_if_empty(RequiredField::ZipCode, "90210");
        let fields = extractor(llm).extract("actually 10001", &record).await;
        assert!(fields.zip_code.is_none());
        record.apply(&fields);
        assert_eq!(record.zip_code(), Some("90210"));

        // Regex path
        let llm = MockProvider::new("not json");
        let fields = extractor(llm).extract("actually 10001", &record).await;
        assert!(fields.zip_code.is_none());
    }

    #[tokio::test]
    async fn test_early_turn_condition_from_symptoms() {
        let llm = MockProvider::new(r#"{"additional_symptoms": ["fever", "cough"]}"#);
        let record = record_with_user_turn("I feel warm and keep coughing");
        let fields = extractor(llm).extract("I feel warm and keep coughing", &record).await;
        assert_eq!(
            fields.medical_condition.as_deref(),
            Some("Patient reports: fever, cough")
        );
    }

    #[tokio::test]
    async fn test_no_condition_synthesis_late_in_conversation() {
        let llm = MockProvider::new(r#"{"additional_symptoms": ["fever"]}"#);
        let mut record = PatientRecord::new("late");
        for i in 0..4 {
            record.record_message(Speaker::User, format!("message {}", i));
        }
        let fields = extractor(llm).extract("I have a fever", &record).await;
        assert!(fields.medical_condition.is_none());
        assert_eq!(fields.symptoms, vec!["fever".to_string()]);
    }

    #[tokio::test]
    async fn test_snapshot_structured() {
        let llm = MockProvider::new(
            r#"{"personal_info": {"phone": "555-123-4567", "zip_code": "90210"},
                "medical_info": {"primary_condition": "headache", "symptoms": ["headache"]},
                "extraction_confidence": {"overall_completeness": "80%"}}"#,
        );
        let mut record = record_with_user_turn("I have a headache");
        record.record_message(Speaker::IntakeRole, "What is your ZIP?");
        let snapshot = extractor(llm).extract_snapshot(&record).await;

        let data = snapshot.data.structured().expect("should decode");
        assert_eq!(data.medical_info.primary_condition.as_deref(), Some("headache"));
        assert_eq!(data.personal_info.zip_code.as_deref(), Some("90210"));
        assert_eq!(snapshot.extraction_metadata.conversation_turns, 2);
        assert_eq!(snapshot.extraction_metadata.session_id, "test-session");
    }

    #[tokio::test]
    async fn test_snapshot_unstructured_on_prose() {
        let llm = MockProvider::new("The patient has a headache.");
        let record = record_with_user_turn("I have a headache");
        let snapshot = extractor(llm).extract_snapshot(&record).await;

        match snapshot.data {
            Decoded::Unstructured { raw, .. } => assert_eq!(raw, "The patient has a headache."),
            Decoded::Structured(_) => panic!("prose must stay unstructured"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_serializes_with_format_tag() {
        let llm = MockProvider::new("nope");
        let record = record_with_user_turn("hi");
        let snapshot = extractor(llm).extract_snapshot(&record).await;
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["data"]["format"], "unstructured");
        assert_eq!(json["extraction_metadata"]["conversation_turns"], 1);
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, CapabilityError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(r#"{"zip_code": "10001"}"#.to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let config = ExtractorConfig {
            llm_timeout_secs: 1,
            ..Default::default()
        };
        let extractor = FieldExtractor::new(Arc::new(SlowGenerator), config);
        let record = record_with_user_turn("zip 94110");
        let result = extractor.extract_detailed("zip 94110", &record).await;

        assert_eq!(result.strategy, ExtractionStrategy::RegexFallback);
        assert_eq!(result.fields.zip_code.as_deref(), Some("94110"));
    }
}
