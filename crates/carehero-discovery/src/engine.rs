//! Parallel appointment discovery
//!
//! Institutions are processed in input-order batches of `max_concurrent`.
//! Each institution gets its own browser context and runs the stage chain
//! in isolation; any failure becomes that institution's `error` result.
//! The browser is launched once per run and always closed. Contexts are
//! closed by the task that opened them, including on shutdown.

use crate::cleaning::clean_slots;
use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use crate::metrics::DiscoveryMetrics;
use crate::page::{self, PageContent};
use crate::strategies::{llm_analysis, regex_fallback, structural_scan, synthetic_slots};
use carehero_domain::{
    AppointmentSlot, Browser, BrowserContext, BrowserLauncher, CapabilityError, Institution,
    InstitutionAppointmentResult, ResultStatus, TextGenerator,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::{error::Elapsed, sleep, timeout};
use tracing::{debug, error, info, warn};

/// How long interrupted tasks get to close their contexts before being aborted
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Receives all results accumulated so far, after every batch and on interruption
pub trait ResultSink: Send + Sync {
    /// Persist `results`, replacing whatever was saved before
    fn save(&self, results: &[InstitutionAppointmentResult]) -> Result<(), DiscoveryError>;
}

impl<F> ResultSink for F
where
    F: Fn(&[InstitutionAppointmentResult]) -> Result<(), DiscoveryError> + Send + Sync,
{
    fn save(&self, results: &[InstitutionAppointmentResult]) -> Result<(), DiscoveryError> {
        self(results)
    }
}

/// Results and counters of a completed run
#[derive(Debug, Clone)]
pub struct DiscoveryRun {
    /// One result per input institution
    pub results: Vec<InstitutionAppointmentResult>,
    /// Run metrics
    pub metrics: DiscoveryMetrics,
}

/// File name for an institution's screenshot, derived from its URL
fn screenshot_file_name(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let stem: String = rest
        .trim_end_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.png", stem)
}

/// Owns one institution's browser context and closes it exactly once
///
/// If the task is dropped (abort, panic) before `close` runs, the close is
/// spawned onto the runtime instead.
struct ContextGuard(Option<Box<dyn BrowserContext>>);

impl ContextGuard {
    fn context(&mut self) -> Result<&mut (dyn BrowserContext + 'static), CapabilityError> {
        self.0
            .as_deref_mut()
            .ok_or_else(|| CapabilityError::other("browser context already closed"))
    }

    async fn close(mut self, institution: &str) {
        if let Some(mut ctx) = self.0.take() {
            if let Err(e) = ctx.close().await {
                debug!(%institution, error = %e, "Context close failed");
            }
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(mut ctx) = self.0.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = ctx.close().await;
                });
            }
        }
    }
}

/// Per-institution stage chain
#[derive(Clone)]
struct Pipeline {
    llm: Arc<dyn TextGenerator>,
    config: DiscoveryConfig,
    screenshot_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Process one institution; `None` when `shutdown` fired first
    async fn process(
        &self,
        browser: &dyn Browser,
        institution: Institution,
        mut shutdown: watch::Receiver<bool>,
    ) -> Option<InstitutionAppointmentResult> {
        let mut guard = match browser.new_context().await {
            Ok(ctx) => ContextGuard(Some(ctx)),
            Err(e) => {
                warn!(institution = %institution.name, error = %e, "Could not open browser context");
                return Some(InstitutionAppointmentResult::error(institution, e.to_string()));
            }
        };

        let finished = match guard.context() {
            Ok(ctx) => {
                let staged = timeout(
                    self.config.institution_timeout(),
                    self.extract(ctx, &institution),
                );
                tokio::select! {
                    outcome = staged => Some(outcome),
                    _ = wait_for_shutdown(&mut shutdown) => None,
                }
            }
            Err(e) => Some(Ok(Err(e))),
        };

        let Some(outcome) = finished else {
            guard.close(&institution.name).await;
            info!(institution = %institution.name, "Institution interrupted");
            return None;
        };

        let mut result = self.finish(institution, outcome);
        if self.wants_screenshot(&result) {
            if let Ok(ctx) = guard.context() {
                if let Some(path) = self.save_screenshot(ctx, &result.institution.url).await {
                    result = result.with_screenshot(path);
                }
            }
        }
        guard.close(&result.institution.name).await;
        Some(result)
    }

    fn finish(
        &self,
        institution: Institution,
        outcome: Result<Result<Vec<AppointmentSlot>, CapabilityError>, Elapsed>,
    ) -> InstitutionAppointmentResult {
        match outcome {
            Ok(Ok(slots)) => {
                info!(institution = %institution.name, slots = slots.len(), "Institution processed");
                InstitutionAppointmentResult::from_slots(institution, slots)
            }
            Ok(Err(e)) => {
                warn!(institution = %institution.name, error = %e, "Institution failed");
                InstitutionAppointmentResult::error(institution, e.to_string())
            }
            Err(_) => {
                warn!(institution = %institution.name, "Institution timed out");
                let message = format!(
                    "processing exceeded {}s",
                    self.config.institution_timeout_secs
                );
                InstitutionAppointmentResult::error(institution, message)
            }
        }
    }

    fn wants_screenshot(&self, result: &InstitutionAppointmentResult) -> bool {
        self.screenshot_dir.is_some()
            && (result.status == ResultStatus::Error || result.has_only_placeholders())
    }

    /// Capture the current page; failures are logged and yield `None`
    async fn save_screenshot(&self, ctx: &mut dyn BrowserContext, url: &str) -> Option<String> {
        let dir = self.screenshot_dir.as_deref()?;
        let png = match timeout(self.config.navigation_timeout(), ctx.screenshot()).await {
            Ok(Ok(png)) => png,
            Ok(Err(e)) => {
                debug!(%url, error = %e, "Screenshot failed");
                return None;
            }
            Err(_) => {
                debug!(%url, "Screenshot timed out");
                return None;
            }
        };

        let path = dir.join(screenshot_file_name(url));
        match write_file(dir, &path, &png).await {
            Ok(()) => {
                debug!(path = %path.display(), "Screenshot saved");
                Some(path.display().to_string())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not write screenshot");
                None
            }
        }
    }

    /// Run the stages in order, stopping at the first that yields valid slots
    async fn extract(
        &self,
        ctx: &mut dyn BrowserContext,
        institution: &Institution,
    ) -> Result<Vec<AppointmentSlot>, CapabilityError> {
        let nav_timeout = self.config.navigation_timeout();
        let cap = self.config.cleaned_slot_cap;

        page::navigate(ctx, &institution.url, nav_timeout).await?;
        if self.config.follow_booking_links {
            page::follow_booking_link(ctx, nav_timeout).await;
        }
        let page = PageContent::capture(ctx).await?;

        let slots = clean_slots(structural_scan(&page), cap);
        if !slots.is_empty() {
            return Ok(slots);
        }

        let analyzed = llm_analysis(
            self.llm.as_ref(),
            &page,
            self.config.llm_text_limit,
            self.config.llm_timeout(),
        )
        .await;
        let slots = clean_slots(analyzed, cap);
        if !slots.is_empty() {
            return Ok(slots);
        }

        let slots = clean_slots(regex_fallback(&page.text, self.config.regex_fallback_cap), cap);
        if !slots.is_empty() {
            return Ok(slots);
        }

        debug!(institution = %institution.name, "No slots found, using placeholders");
        Ok(clean_slots(
            synthetic_slots(&institution.url, self.config.synthetic_slot_count),
            cap,
        ))
    }
}

async fn write_file(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(path, bytes).await
}

/// Closes the browser on drop if the run did not close it
struct BrowserGuard(Option<Arc<dyn Browser>>);

impl BrowserGuard {
    async fn close(mut self) {
        if let Some(browser) = self.0.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Browser close failed");
            }
        }
    }
}

impl Drop for BrowserGuard {
    fn drop(&mut self) {
        if let Some(browser) = self.0.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = browser.close().await;
                });
            }
        }
    }
}

enum BatchOutcome {
    Completed(Vec<InstitutionAppointmentResult>),
    Interrupted(Vec<InstitutionAppointmentResult>),
}

/// Resolves once the shutdown flag is true; never resolves if the sender is gone
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Institutions of the running batch, keyed by task id
type Pending = HashMap<Id, Institution>;

/// Fold one joined task into the batch results
fn collect(
    joined: Result<(Id, Option<InstitutionAppointmentResult>), JoinError>,
    pending: &mut Pending,
    results: &mut Vec<InstitutionAppointmentResult>,
    metrics: &mut DiscoveryMetrics,
) {
    let result = match joined {
        Ok((id, Some(result))) => {
            pending.remove(&id);
            result
        }
        Ok((id, None)) => {
            pending.remove(&id);
            return;
        }
        Err(e) => {
            let Some(institution) = pending.remove(&e.id()) else {
                return;
            };
            if e.is_cancelled() {
                warn!(institution = %institution.name, "Institution task aborted");
                return;
            }
            // A panicking pipeline only fails its own institution
            error!(institution = %institution.name, error = %e, "Institution task failed");
            InstitutionAppointmentResult::error(institution, format!("task failed: {}", e))
        }
    };
    metrics.record_result(&result);
    results.push(result);
}

/// The AppointmentDiscoveryEngine
pub struct AppointmentDiscoveryEngine {
    launcher: Arc<dyn BrowserLauncher>,
    pipeline: Arc<Pipeline>,
    sink: Option<Arc<dyn ResultSink>>,
}

impl AppointmentDiscoveryEngine {
    /// Create a new engine
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        llm: Arc<dyn TextGenerator>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            launcher,
            pipeline: Arc::new(Pipeline {
                llm,
                config,
                screenshot_dir: None,
            }),
            sink: None,
        }
    }

    /// Save a screenshot under `dir` for every failed or placeholder-only institution
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        Arc::make_mut(&mut self.pipeline).screenshot_dir = Some(dir.into());
        self
    }

    /// Save accumulated results through `sink` after every batch
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &DiscoveryConfig {
        &self.pipeline.config
    }

    /// Discover appointments for every institution
    ///
    /// Always returns exactly one result per institution.
    pub async fn discover(&self, institutions: Vec<Institution>) -> Vec<InstitutionAppointmentResult> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        match self.discover_until(institutions, shutdown_rx).await {
            Ok(run) => run.results,
            Err(DiscoveryError::Interrupted { completed }) => completed,
            Err(e) => {
                error!(error = %e, "Discovery failed");
                Vec::new()
            }
        }
    }

    /// Discover appointments until done or until `shutdown` turns true
    ///
    /// On interruption the results completed so far are saved through the
    /// sink and returned inside `DiscoveryError::Interrupted`.
    pub async fn discover_until(
        &self,
        institutions: Vec<Institution>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<DiscoveryRun, DiscoveryError> {
        let started = Instant::now();
        let mut metrics = DiscoveryMetrics::new();

        info!(
            institutions = institutions.len(),
            max_concurrent = self.config().max_concurrent,
            "Starting appointment discovery"
        );

        if institutions.is_empty() {
            return Ok(DiscoveryRun {
                results: Vec::new(),
                metrics,
            });
        }

        let browser = match self.launcher.launch().await {
            Ok(browser) => browser,
            Err(e) => {
                error!(error = %e, "Browser launch failed");
                let results: Vec<_> = institutions
                    .into_iter()
                    .map(|i| InstitutionAppointmentResult::error(i, format!("browser unavailable: {}", e)))
                    .collect();
                for result in &results {
                    metrics.record_result(result);
                }
                self.save_partial(&results);
                metrics.elapsed_ms = started.elapsed().as_millis() as u64;
                return Ok(DiscoveryRun { results, metrics });
            }
        };
        let guard = BrowserGuard(Some(Arc::clone(&browser)));

        let outcome = self
            .run_batches(&browser, institutions, &mut shutdown, &mut metrics)
            .await;

        guard.close().await;
        metrics.elapsed_ms = started.elapsed().as_millis() as u64;
        info!("Discovery finished\n{}", metrics.summary());

        match outcome {
            BatchOutcome::Completed(results) => Ok(DiscoveryRun { results, metrics }),
            BatchOutcome::Interrupted(completed) => {
                warn!(completed = completed.len(), "Discovery interrupted");
                Err(DiscoveryError::Interrupted { completed })
            }
        }
    }

    async fn run_batches(
        &self,
        browser: &Arc<dyn Browser>,
        institutions: Vec<Institution>,
        shutdown: &mut watch::Receiver<bool>,
        metrics: &mut DiscoveryMetrics,
    ) -> BatchOutcome {
        let batch_size = self.config().max_concurrent.max(1);
        let total_batches = institutions.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(institutions.len());

        for (index, batch) in institutions.chunks(batch_size).enumerate() {
            if *shutdown.borrow() {
                self.save_partial(&results);
                return BatchOutcome::Interrupted(results);
            }

            info!(batch = index + 1, total_batches, size = batch.len(), "Processing batch");

            let mut tasks = JoinSet::new();
            let mut pending = Pending::new();
            for institution in batch.iter().cloned() {
                let pipeline = Arc::clone(&self.pipeline);
                let browser = Arc::clone(browser);
                let task_shutdown = shutdown.clone();
                let task_institution = institution.clone();
                let handle = tasks.spawn(async move {
                    pipeline
                        .process(browser.as_ref(), task_institution, task_shutdown)
                        .await
                });
                pending.insert(handle.id(), institution);
            }

            loop {
                tokio::select! {
                    joined = tasks.join_next_with_id() => match joined {
                        Some(joined) => collect(joined, &mut pending, &mut results, metrics),
                        None => break,
                    },
                    _ = wait_for_shutdown(shutdown) => {
                        Self::drain(&mut tasks, &mut pending, &mut results, metrics).await;
                        self.save_partial(&results);
                        return BatchOutcome::Interrupted(results);
                    }
                }
            }

            metrics.record_batch();
            self.save_partial(&results);

            if index + 1 < total_batches {
                let delay = self.config().batch_delay();
                if !delay.is_zero() {
                    debug!(delay_ms = self.config().batch_delay_ms, "Waiting before next batch");
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = wait_for_shutdown(shutdown) => {}
                    }
                }
            }
        }

        BatchOutcome::Completed(results)
    }

    /// Let interrupted tasks close their contexts, aborting stragglers
    async fn drain(
        tasks: &mut JoinSet<Option<InstitutionAppointmentResult>>,
        pending: &mut Pending,
        results: &mut Vec<InstitutionAppointmentResult>,
        metrics: &mut DiscoveryMetrics,
    ) {
        let drained = timeout(SHUTDOWN_GRACE, async {
            while let Some(joined) = tasks.join_next_with_id().await {
                collect(joined, pending, results, metrics);
            }
        })
        .await;

        if drained.is_err() {
            warn!(remaining = tasks.len(), "Tasks ignored shutdown, aborting");
            tasks.abort_all();
            while let Some(joined) = tasks.join_next_with_id().await {
                collect(joined, pending, results, metrics);
            }
        }
    }

    fn save_partial(&self, results: &[InstitutionAppointmentResult]) {
        let Some(sink) = &self.sink else {
            return;
        };
        match sink.save(results) {
            Ok(()) => debug!(results = results.len(), "Saved discovery results"),
            Err(e) => warn!(error = %e, "Failed to save discovery results"),
        }
    }
}
