//! Core SessionOrchestrator implementation

use crate::background::{run_discovery, DiscoveryReport, DiscoveryRequest, DiscoveryServices};
use crate::turn::{
    collected_fields, DiscoveryState, Responder, SessionStatus, TurnPhase, TurnResponse,
};
use crate::{OrchestratorConfig, OrchestratorError};
use carehero_domain::{
    new_session_id, PartialFields, PatientRecord, RequiredField, SessionStore, TextGenerator,
};
use carehero_extractor::{validate_field, ExtractionSnapshot, FieldExtractor};
use carehero_guardrail::{AuditSink, GuardrailPolicy, SAFE_OUTPUT_FALLBACK};
use carehero_router::{ConversationState, ConversationalRoleRouter, OutputScreen, Rejection};
use carehero_store::JsonArchive;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

fn store_err<E: fmt::Display>(e: E) -> OrchestratorError {
    OrchestratorError::Store(e.to_string())
}

/// Output validation applied by the router before a role reply is recorded
struct GuardrailScreen(Arc<GuardrailPolicy>);

impl OutputScreen for GuardrailScreen {
    fn screen(&self, text: &str, session_id: &str) -> Option<Rejection> {
        let verdict = self.0.validate_output(text, Some(session_id));
        if verdict.allowed {
            return None;
        }
        warn!(%session_id, category = ?verdict.category, "Role output replaced by guardrail");
        Some(Rejection {
            replacement: SAFE_OUTPUT_FALLBACK.to_string(),
            reason: verdict.rejection_message.unwrap_or_default(),
        })
    }
}

/// Top-level coordinator for chat sessions
///
/// Each turn is screened by the guardrail policy, routed to a conversational
/// role, and persisted. Role replies are screened again before the router
/// records them, so blocked text never enters the session history. When a record becomes
/// complete, institution and appointment discovery runs in the background.
///
/// Turns for one session must be dispatched serially; `dispatch` takes
/// `&mut self`, so a shared orchestrator needs an outer lock.
///
/// # Examples
///
/// ```no_run
/// use carehero_llm::OllamaProvider;
/// use carehero_orchestrator::{OrchestratorConfig, SessionOrchestrator};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = OrchestratorConfig::chat_only();
/// let llm = Arc::new(OllamaProvider::default_endpoint("llama3.1"));
/// let mut orchestrator = SessionOrchestrator::new(config.memory_store(), llm, config)?;
///
/// let turn = orchestrator.dispatch(None, "I have a sore throat").await?;
/// println!("{}", turn.response);
/// # Ok(())
/// # }
/// ```
pub struct SessionOrchestrator<S: SessionStore> {
    store: S,
    llm: Arc<dyn TextGenerator>,
    router: ConversationalRoleRouter,
    guardrail: Arc<GuardrailPolicy>,
    archive: Option<JsonArchive>,
    services: Option<DiscoveryServices>,
    config: OrchestratorConfig,
    discoveries: HashMap<String, JoinHandle<Option<DiscoveryReport>>>,
    reports: HashMap<String, DiscoveryReport>,
    shutdown: watch::Sender<bool>,
}

impl<S> SessionOrchestrator<S>
where
    S: SessionStore,
    S::Error: fmt::Display,
{
    /// Create an orchestrator over `store`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the archive
    /// directory cannot be created.
    pub fn new(
        store: S,
        llm: Arc<dyn TextGenerator>,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        config.validate().map_err(OrchestratorError::Config)?;

        let guardrail = Arc::new(GuardrailPolicy::new(config.effective_guardrail())?);
        let extractor = FieldExtractor::new(Arc::clone(&llm), config.extractor.clone());
        let router =
            ConversationalRoleRouter::new(Arc::clone(&llm), extractor, config.router.clone())
                .with_output_screen(Arc::new(GuardrailScreen(Arc::clone(&guardrail))));
        let archive = if config.archive_enabled {
            Some(JsonArchive::new(&config.data_dir)?)
        } else {
            None
        };
        let (shutdown, _) = watch::channel(false);

        info!(
            guardrails = config.guardrails_enabled,
            discovery = config.discovery_enabled,
            archive = config.archive_enabled,
            model = llm.model_name(),
            "Session orchestrator ready"
        );

        Ok(Self {
            store,
            llm,
            router,
            guardrail,
            archive,
            services: None,
            config,
            discoveries: HashMap::new(),
            reports: HashMap::new(),
            shutdown,
        })
    }

    /// Enable background discovery with these capabilities
    pub fn with_discovery(mut self, services: DiscoveryServices) -> Self {
        self.services = Some(services);
        self
    }

    /// Send guardrail audit events to `sink` instead of `tracing`
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Result<Self, OrchestratorError> {
        self.guardrail = Arc::new(GuardrailPolicy::with_sink(
            self.config.effective_guardrail(),
            sink,
        )?);
        self.router = self
            .router
            .with_output_screen(Arc::new(GuardrailScreen(Arc::clone(&self.guardrail))));
        Ok(self)
    }

    /// Active configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// The session store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The archive, when enabled
    pub fn archive(&self) -> Option<&JsonArchive> {
        self.archive.as_ref()
    }

    fn load(&self, session_id: &str) -> Result<Option<PatientRecord>, OrchestratorError> {
        self.store.get(session_id).map_err(store_err)
    }

    fn load_existing(&self, session_id: &str) -> Result<PatientRecord, OrchestratorError> {
        self.load(session_id)?
            .ok_or_else(|| OrchestratorError::UnknownSession(session_id.to_string()))
    }

    /// Handle one user message
    ///
    /// A new session is created when `session_id` is `None` or unknown.
    /// Guardrail blocks are not errors: they come back as a response with an
    /// `InputValidationFailed` or `OutputValidationFailed` phase. Errors are
    /// limited to storage failures and blank input; show them to users with
    /// [`OrchestratorError::user_message`].
    pub async fn dispatch(
        &mut self,
        session_id: Option<&str>,
        text: &str,
    ) -> Result<TurnResponse, OrchestratorError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(OrchestratorError::EmptyMessage);
        }
        let session_id = session_id
            .map(str::to_string)
            .unwrap_or_else(new_session_id);

        let verdict = self.guardrail.validate_input(text, Some(&session_id));
        if !verdict.allowed {
            info!(%session_id, category = ?verdict.category, "Input blocked by guardrail");
            let (collected, missing_fields) = match self.load(&session_id)? {
                Some(record) => (collected_fields(&record), record.missing_fields()),
                None => (PartialFields::default(), RequiredField::PRIORITY.to_vec()),
            };
            return Ok(TurnResponse {
                session_id,
                response: verdict.rejection_message.unwrap_or_default(),
                responder: Responder::Guardrail,
                phase: TurnPhase::InputValidationFailed,
                warning: None,
                collected,
                missing_fields,
                discovery_started: false,
            });
        }

        let mut record = match self.load(&session_id)? {
            Some(record) => record,
            None => {
                info!(%session_id, "Session created");
                PatientRecord::new(session_id.clone())
            }
        };

        let turn = self.router.handle_turn(&mut record, text).await;

        let mut response = turn.response;
        let mut responder = Responder::from(turn.role);
        let mut phase = TurnPhase::from(turn.next_step);
        let mut warning = None;

        if let Some(reason) = turn.rejection {
            response = SAFE_OUTPUT_FALLBACK.to_string();
            responder = Responder::Guardrail;
            phase = TurnPhase::OutputValidationFailed;
            warning = Some(reason);
        }

        self.persist(&record, turn.snapshot.as_ref())?;
        self.prune_discoveries();

        let discovery_started = turn.transitioned && self.start_discovery(&record);

        debug!(%session_id, %phase, "Turn complete");
        Ok(TurnResponse {
            session_id,
            response,
            responder,
            phase,
            warning,
            collected: collected_fields(&record),
            missing_fields: record.missing_fields(),
            discovery_started,
        })
    }

    /// Save the record, then archive the snapshots
    ///
    /// Only the store write can fail the turn.
    fn persist(
        &mut self,
        record: &PatientRecord,
        snapshot: Option<&ExtractionSnapshot>,
    ) -> Result<(), OrchestratorError> {
        self.store.put(record.clone()).map_err(store_err)?;

        let Some(archive) = &self.archive else {
            return Ok(());
        };
        if let Err(e) = archive.append_patient_snapshot(record) {
            warn!(session_id = record.session_id(), error = %e, "Failed to archive record snapshot");
        }
        if let Some(snapshot) = snapshot {
            if let Err(e) = archive.append_extraction(record.session_id(), snapshot) {
                warn!(session_id = record.session_id(), error = %e, "Failed to archive extraction");
            }
        }
        Ok(())
    }

    /// Spawn the discovery continuation; returns true when one was started
    fn start_discovery(&mut self, record: &PatientRecord) -> bool {
        if !self.config.discovery_enabled {
            return false;
        }
        let Some(services) = self.services.clone() else {
            debug!("Discovery enabled but no services configured");
            return false;
        };
        let Some(request) = DiscoveryRequest::from_record(record) else {
            return false;
        };

        let session_id = request.session_id.clone();
        if let Some(previous) = self.discoveries.remove(&session_id) {
            previous.abort();
        }
        self.reports.remove(&session_id);
        self.prune_discoveries();

        let handle = tokio::spawn(run_discovery(
            services,
            Arc::clone(&self.llm),
            self.config.discovery.clone(),
            self.archive.clone(),
            request,
            self.shutdown.subscribe(),
        ));
        self.discoveries.insert(session_id, handle);
        true
    }

    /// Drop tasks and reports of sessions the store no longer holds
    ///
    /// Keeps both maps bounded by the store's TTL and capacity limits.
    fn prune_discoveries(&mut self) {
        if self.discoveries.is_empty() && self.reports.is_empty() {
            return;
        }
        let live: HashSet<String> = match self.store.session_ids() {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "Could not list sessions, skipping discovery cleanup");
                return;
            }
        };

        self.discoveries.retain(|session_id, handle| {
            let keep = live.contains(session_id);
            if !keep {
                debug!(%session_id, finished = handle.is_finished(), "Dropping discovery of expired session");
                handle.abort();
            }
            keep
        });
        self.reports.retain(|session_id, _| live.contains(session_id));
    }

    /// Sessions with a discovery task or a cached report in memory
    pub fn tracked_discoveries(&self) -> usize {
        self.discoveries
            .keys()
            .chain(self.reports.keys())
            .collect::<HashSet<_>>()
            .len()
    }

    fn discovery_state(&self, session_id: &str) -> DiscoveryState {
        if let Some(handle) = self.discoveries.get(session_id) {
            return if handle.is_finished() {
                DiscoveryState::Finished
            } else {
                DiscoveryState::Running
            };
        }
        let archived = self
            .archive
            .as_ref()
            .is_some_and(|a| a.discovery_path(session_id).exists());
        if self.reports.contains_key(session_id) || archived {
            DiscoveryState::Finished
        } else {
            DiscoveryState::NotStarted
        }
    }

    /// Completeness and progress of a session
    pub fn status(&self, session_id: &str) -> Result<SessionStatus, OrchestratorError> {
        let record = self.load_existing(session_id)?;
        Ok(SessionStatus {
            session_id: session_id.to_string(),
            state: ConversationState::of(&record),
            collected: collected_fields(&record),
            missing_fields: record.missing_fields(),
            next_field: record.next_missing_field(),
            symptoms: record.symptoms().to_vec(),
            conversation_turns: record.conversation_history().len(),
            discovery: self.discovery_state(session_id),
        })
    }

    /// Replace a field value on explicit user request
    ///
    /// The value is validated like an extracted one. If the correction
    /// completes the record, or changes a search input of a complete
    /// record, discovery is (re)started.
    pub fn correct_field(
        &mut self,
        session_id: &str,
        field: RequiredField,
        value: &str,
    ) -> Result<SessionStatus, OrchestratorError> {
        let value = validate_field(field, value)
            .ok_or(OrchestratorError::InvalidCorrection { field })?;
        let mut record = self.load_existing(session_id)?;

        let was_complete = record.is_complete();
        let previous = record.correct_field(field, &value);
        info!(
            %session_id,
            field = field.as_str(),
            replaced = previous.is_some(),
            "Field corrected"
        );
        self.persist(&record, None)?;

        let search_input_changed = field != RequiredField::PhoneNumber;
        if record.is_complete() && (!was_complete || search_input_changed) {
            self.start_discovery(&record);
        }

        self.status(session_id)
    }

    /// Delete a session and cancel its discovery; returns true if it existed
    pub fn end_session(&mut self, session_id: &str) -> Result<bool, OrchestratorError> {
        if let Some(handle) = self.discoveries.remove(session_id) {
            handle.abort();
        }
        self.reports.remove(session_id);
        let existed = self.store.delete(session_id).map_err(store_err)?;
        info!(%session_id, existed, "Session ended");
        Ok(existed)
    }

    /// Ids of all live sessions
    pub fn list_sessions(&self) -> Result<Vec<String>, OrchestratorError> {
        self.store.session_ids().map_err(store_err)
    }

    /// Wait for a session's discovery to finish and return its report
    ///
    /// Returns `None` when discovery never ran, failed, or was cancelled.
    /// Once finished, the report stays available from memory or the archive.
    pub async fn await_discovery(
        &mut self,
        session_id: &str,
    ) -> Result<Option<DiscoveryReport>, OrchestratorError> {
        if let Some(handle) = self.discoveries.remove(session_id) {
            return match handle.await {
                Ok(Some(report)) => {
                    self.reports.insert(session_id.to_string(), report.clone());
                    Ok(Some(report))
                }
                Ok(None) => Ok(None),
                Err(e) if e.is_cancelled() => Ok(None),
                Err(e) => Err(OrchestratorError::Discovery(e.to_string())),
            };
        }

        if let Some(report) = self.reports.get(session_id) {
            return Ok(Some(report.clone()));
        }
        Ok(self
            .archive
            .as_ref()
            .and_then(|a| a.load_discovery(session_id)))
    }

    /// Ask running discovery tasks to stop
    ///
    /// Each saves what it has completed before finishing.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        info!(running = self.discoveries.len(), "Shutdown requested for background discovery");
    }
}
