//! CareHero Domain Layer
//!
//! This crate contains the core data model for the CareHero intake pipeline
//! and the trait interfaces every infrastructure crate implements. It keeps
//! its dependency list to serialization, identifiers, and async trait support.
//!
//! ## Key Concepts
//!
//! - **PatientRecord**: The session entity. Four required fields, each written once
//! - **Institution**: A candidate care facility surfaced by search (.org/.gov only)
//! - **AppointmentSlot**: One candidate appointment time, tagged with its provenance
//! - **GuardrailEvent**: Audit record emitted on every policy validation
//!
//! ## Architecture
//!
//! - Pure data and invariants only
//! - External capabilities (text generation, search, browser, storage) are traits
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod appointment;
pub mod guardrail;
pub mod institution;
pub mod record;
pub mod traits;

use std::time::{SystemTime, UNIX_EPOCH};

// Re-exports for convenience
pub use appointment::{
    AppointmentSlot, AppointmentSummary, BookingMethod, InstitutionAppointmentResult,
    ResultStatus, SlotConfidence, SlotSource,
};
pub use guardrail::{excerpt, GuardrailEvent, Severity};
pub use institution::{
    is_trusted_url, url_host, Institution, InstitutionType, InsuranceAcceptance, UntrustedUrl,
};
pub use record::{ConversationEntry, PartialFields, PatientRecord, RequiredField, Speaker};
pub use traits::{
    Answer, Browser, BrowserContext, BrowserLauncher, CapabilityError, CapabilityErrorKind,
    GenerationRequest, QuestionAnswerer, SearchHit, SearchProvider, SessionStore, TextGenerator,
};

/// Current timestamp in seconds since Unix epoch
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Generate a new UUIDv7-based session identifier
///
/// # Examples
///
/// ```
/// let a = carehero_domain::new_session_id();
/// let b = carehero_domain::new_session_id();
/// assert_ne!(a, b);
/// assert_eq!(a.len(), 36);
/// ```
pub fn new_session_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
