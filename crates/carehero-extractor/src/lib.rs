//! CareHero Field Extractor
//!
//! Turns free-text user turns into structured patient fields.
//!
//! # Architecture
//!
//! ```text
//! user text → LLM (strict JSON decode) ─┬─ ok ──────→ sanitize → PartialFields
//!                                       └─ failure ─→ regex fallback
//! ```
//!
//! Only fields that are still empty on the record are ever returned, so
//! applying the result can never overwrite collected data.
//!
//! The same crate produces the structured conversation snapshot used by
//! downstream consumers once intake is complete.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use carehero_domain::PatientRecord;
//! use carehero_extractor::{ExtractorConfig, FieldExtractor};
//! use carehero_llm::MockProvider;
//!
//! # async fn example() {
//! let extractor = FieldExtractor::new(
//!     Arc::new(MockProvider::new(r#"{"found": false}"#)),
//!     ExtractorConfig::default(),
//! );
//! let record = PatientRecord::new("s-1");
//! let fields = extractor.extract("My zip is 90210", &record).await;
//! println!("{:?}", fields);
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
pub mod fallback;
pub mod parser;
pub mod prompt;
mod sanitize;
mod snapshot;

#[cfg(test)]
mod tests;

pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::{ExtractionStrategy, FieldExtraction, FieldExtractor};
pub use parser::Decoded;
pub use sanitize::field as validate_field;
pub use snapshot::{
    AdditionalContext, ExtractionConfidence, ExtractionMetadata, ExtractionSnapshot, MedicalInfo,
    PersonalInfo, StructuredSnapshot,
};
