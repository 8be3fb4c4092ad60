//! CareHero Guardrails
//!
//! Pattern-based safety policy for inbound user text and outbound role text.
//!
//! The policy provides:
//! - Input screening (self-harm, illegal content, dangerous dosage, advice requests)
//! - Output screening (definitive medical claims, directives without a disclaimer)
//! - An audit event for every validation call, pass or fail
//!
//! Validation itself is stateless; the only side effect is the audit sink.
//!
//! # Examples
//!
//! ```
//! use carehero_guardrail::{GuardrailConfig, GuardrailPolicy};
//!
//! let policy = GuardrailPolicy::new(GuardrailConfig::default()).unwrap();
//!
//! let verdict = policy.validate_input("I want to kill myself", None);
//! assert!(!verdict.allowed);
//!
//! let verdict = policy.validate_input("I have a headache", None);
//! assert!(verdict.allowed);
//! ```

#![warn(missing_docs)]

mod audit;
mod config;
mod error;
mod policy;
mod rules;

pub use audit::{AuditSink, CompositeAuditSink, GuardrailStats, InMemoryAuditSink, TracingAuditSink};
pub use config::GuardrailConfig;
pub use error::GuardrailError;
pub use policy::{GuardrailPolicy, GuardrailVerdict, SAFE_OUTPUT_FALLBACK};
pub use rules::RuleCategory;
