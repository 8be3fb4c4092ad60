//! CareHero Conversational Role Router
//!
//! Drives a session through its two conversation states:
//!
//! ```text
//! COLLECTING ──(record complete)──→ ANALYZING
//!   extract + intake role             reasoning role + snapshot
//! ```
//!
//! The transition turn runs the intake role and then one initial reasoning
//! pass, returning both responses combined. ANALYZING has no exit.
//!
//! # Examples
//!
//! ```
//! use carehero_domain::PatientRecord;
//! use carehero_extractor::{ExtractorConfig, FieldExtractor};
//! use carehero_llm::MockProvider;
//! use carehero_router::{ConversationalRoleRouter, NextStep, RouterConfig};
//! use std::sync::Arc;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let llm = Arc::new(MockProvider::new("What is your ZIP code?"));
//! let extractor = FieldExtractor::new(llm.clone(), ExtractorConfig::default());
//! let router = ConversationalRoleRouter::new(llm, extractor, RouterConfig::default());
//!
//! let mut record = PatientRecord::new("demo");
//! let turn = rt.block_on(router.handle_turn(&mut record, "I have a headache"));
//! assert_eq!(turn.next_step, NextStep::ContinueCollecting);
//! ```

#![warn(missing_docs)]

mod config;
mod role;
mod router;

pub use config::RouterConfig;
pub use role::{ConversationState, NextStep, Role};
pub use router::{ConversationalRoleRouter, OutputScreen, Rejection, RouterTurn};
