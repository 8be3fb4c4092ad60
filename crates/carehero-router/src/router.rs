//! Turn handling for the role router

use crate::config::RouterConfig;
use crate::role::{intake_prompt, reasoning_prompt, ConversationState, NextStep, Role};
use carehero_domain::{
    GenerationRequest, PatientRecord, RequiredField, Speaker, TextGenerator,
};
use carehero_extractor::{ExtractionSnapshot, ExtractionStrategy, FieldExtractor};
use carehero_llm::{or_filler, SAFE_FILLER};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Outcome of one routed turn
#[derive(Debug, Clone)]
pub struct RouterTurn {
    /// Role whose output ends the response
    pub role: Role,
    /// Text for the user
    pub response: String,
    /// What the next turn will do
    pub next_step: NextStep,
    /// State after this turn
    pub state: ConversationState,
    /// True on the COLLECTING → ANALYZING turn
    pub transitioned: bool,
    /// Required fields written by this turn
    pub written_fields: Vec<RequiredField>,
    /// Extraction strategy used, when extraction ran
    pub extraction: Option<ExtractionStrategy>,
    /// Structured snapshot, produced on every ANALYZING turn
    pub snapshot: Option<ExtractionSnapshot>,
    /// Reason given for the first role output the screen rejected
    pub rejection: Option<String>,
}

/// A rejected role output and the text recorded in its place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Recorded and shown instead of the role output
    pub replacement: String,
    /// User-facing advisory
    pub reason: String,
}

/// Checks role output before it is recorded
///
/// Rejected text never reaches the conversation history, the reasoning
/// analysis or later prompts.
pub trait OutputScreen: Send + Sync {
    /// `Some` when `text` must not be recorded
    fn screen(&self, text: &str, session_id: &str) -> Option<Rejection>;
}

/// Selects and invokes the conversational role for each turn
pub struct ConversationalRoleRouter {
    llm: Arc<dyn TextGenerator>,
    extractor: FieldExtractor,
    config: RouterConfig,
    screen: Option<Arc<dyn OutputScreen>>,
}

impl ConversationalRoleRouter {
    /// Create a new router
    pub fn new(llm: Arc<dyn TextGenerator>, extractor: FieldExtractor, config: RouterConfig) -> Self {
        Self {
            llm,
            extractor,
            config,
            screen: None,
        }
    }

    /// Screen every role output with `screen` before recording it
    pub fn with_output_screen(mut self, screen: Arc<dyn OutputScreen>) -> Self {
        self.screen = Some(screen);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The field extractor used in COLLECTING
    pub fn extractor(&self) -> &FieldExtractor {
        &self.extractor
    }

    /// Process one user message against `record`
    ///
    /// The user message is logged first. Role failures never escape: a
    /// failed role call contributes the safe filler text instead.
    pub async fn handle_turn(&self, record: &mut PatientRecord, user_text: &str) -> RouterTurn {
        record.record_message(Speaker::User, user_text);

        match ConversationState::of(record) {
            ConversationState::Collecting => self.collect(record, user_text).await,
            ConversationState::Analyzing => self.analyze(record, user_text).await,
        }
    }

    async fn collect(&self, record: &mut PatientRecord, user_text: &str) -> RouterTurn {
        let extraction = self.extractor.extract_detailed(user_text, record).await;
        let written_fields = record.apply(&extraction.fields);
        if !written_fields.is_empty() {
            info!(
                session_id = record.session_id(),
                fields = ?written_fields.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
                "Patient fields collected"
            );
        }

        let mut rejection = None;
        let intake = self.invoke(Role::Intake, intake_prompt(user_text, record)).await;
        let (intake, _) = self.screened(record, Role::Intake, intake, &mut rejection);
        record.record_message(Role::Intake.speaker(), intake.clone());

        if !record.is_complete() {
            return RouterTurn {
                role: Role::Intake,
                response: intake,
                next_step: NextStep::ContinueCollecting,
                state: ConversationState::Collecting,
                transitioned: false,
                written_fields,
                extraction: Some(extraction.strategy),
                snapshot: None,
                rejection,
            };
        }

        info!(session_id = record.session_id(), "Intake complete, switching to reasoning");
        let initial = self.config.initial_reasoning_prompt.clone();
        let reasoning = self.reason(record, &initial, true, &mut rejection).await;
        let snapshot = self.extractor.extract_snapshot(record).await;

        RouterTurn {
            role: Role::Reasoning,
            response: format!("{}\n\n{}", intake, reasoning),
            next_step: NextStep::ReasoningAnalysis,
            state: ConversationState::Analyzing,
            transitioned: true,
            written_fields,
            extraction: Some(extraction.strategy),
            snapshot: Some(snapshot),
            rejection,
        }
    }

    async fn analyze(&self, record: &mut PatientRecord, user_text: &str) -> RouterTurn {
        let mut rejection = None;
        let reasoning = self.reason(record, user_text, false, &mut rejection).await;
        let snapshot = self.extractor.extract_snapshot(record).await;

        RouterTurn {
            role: Role::Reasoning,
            response: reasoning,
            next_step: NextStep::ContinueSymptomAnalysis,
            state: ConversationState::Analyzing,
            transitioned: false,
            written_fields: Vec::new(),
            extraction: None,
            snapshot: Some(snapshot),
            rejection,
        }
    }

    async fn reason(
        &self,
        record: &mut PatientRecord,
        user_text: &str,
        initial: bool,
        rejection: &mut Option<String>,
    ) -> String {
        let prompt = reasoning_prompt(user_text, record, initial);
        let analysis = self.invoke(Role::Reasoning, prompt).await;
        let (analysis, accepted) = self.screened(record, Role::Reasoning, analysis, rejection);
        if accepted {
            record.append_reasoning_analysis(&analysis);
        }
        record.record_message(Role::Reasoning.speaker(), analysis.clone());
        analysis
    }

    /// Swap rejected output for its replacement, keeping the first reason
    ///
    /// The flag is false when the text was replaced.
    fn screened(
        &self,
        record: &PatientRecord,
        role: Role,
        text: String,
        rejection: &mut Option<String>,
    ) -> (String, bool) {
        let Some(screen) = &self.screen else {
            return (text, true);
        };
        match screen.screen(&text, record.session_id()) {
            Some(rejected) => {
                debug!(session_id = record.session_id(), %role, "Role output rejected before recording");
                rejection.get_or_insert(rejected.reason);
                (rejected.replacement, false)
            }
            None => (text, true),
        }
    }

    async fn invoke(&self, role: Role, prompt: String) -> String {
        let (temperature, max_tokens) = match role {
            Role::Intake => (self.config.intake_temperature, self.config.intake_max_tokens),
            Role::Reasoning | Role::Extraction => (
                self.config.reasoning_temperature,
                self.config.reasoning_max_tokens,
            ),
        };
        let request = GenerationRequest::new(prompt)
            .with_system(role.system_prompt())
            .with_temperature(temperature)
            .with_max_tokens(max_tokens);

        debug!(%role, model = self.llm.model_name(), "Invoking role");

        match timeout(self.config.role_timeout(), self.llm.generate(&request)).await {
            Ok(Ok(text)) => or_filler(text),
            Ok(Err(e)) => {
                warn!(%role, error = %e, "Role call failed, using filler");
                SAFE_FILLER.to_string()
            }
            Err(_) => {
                warn!(%role, "Role call timed out, using filler");
                SAFE_FILLER.to_string()
            }
        }
    }
}
