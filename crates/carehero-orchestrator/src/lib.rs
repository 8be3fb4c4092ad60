//! CareHero Session Orchestrator
//!
//! Entry point for the intake pipeline. Every user message passes through:
//!
//! ```text
//! input guardrail → role router → output guardrail → store + archive
//!                                                     │
//!                       record complete ──────────────┴→ background discovery
//! ```
//!
//! Guardrail blocks are ordinary responses with a failure phase. Discovery
//! runs on its own task and never delays or fails a chat turn.
//!
//! # Examples
//!
//! ```
//! use carehero_llm::MockProvider;
//! use carehero_orchestrator::{OrchestratorConfig, SessionOrchestrator, TurnPhase};
//! use std::sync::Arc;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let config = OrchestratorConfig::chat_only();
//! let llm = Arc::new(MockProvider::new("What is your ZIP code?"));
//! let mut orchestrator = SessionOrchestrator::new(config.memory_store(), llm, config).unwrap();
//!
//! let turn = rt.block_on(orchestrator.dispatch(None, "I have a headache")).unwrap();
//! assert_eq!(turn.phase, TurnPhase::ContinueCollecting);
//! ```

#![warn(missing_docs)]

mod background;
mod config;
mod error;
mod orchestrator;
mod turn;

pub use background::{DiscoveryReport, DiscoveryServices};
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, INTERNAL_ERROR_MESSAGE};
pub use orchestrator::SessionOrchestrator;
pub use turn::{DiscoveryState, Responder, SessionStatus, TurnPhase, TurnResponse};

pub use carehero_router::ConversationState;
