//! Background discovery continuation
//!
//! Started once per session when its record becomes complete. Failures are
//! logged and end the continuation; they never reach the chat turn.

use carehero_discovery::{
    summarize, AppointmentDiscoveryEngine, DiscoveryConfig, DiscoveryError, InstitutionFinder,
};
use carehero_domain::{
    now_secs, AppointmentSummary, BrowserLauncher, Institution, InstitutionAppointmentResult,
    PatientRecord, QuestionAnswerer, SearchProvider, TextGenerator,
};
use carehero_store::JsonArchive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// External capabilities discovery needs
#[derive(Clone)]
pub struct DiscoveryServices {
    /// Institution search
    pub search: Arc<dyn SearchProvider>,
    /// Insurance questions
    pub qa: Arc<dyn QuestionAnswerer>,
    /// Browser automation
    pub launcher: Arc<dyn BrowserLauncher>,
}

/// Discovery output for one session, as archived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Session the report belongs to
    pub session_id: String,
    /// When the report was written (seconds since Unix epoch)
    pub generated_at: u64,
    /// False for partial saves and interrupted runs
    pub complete: bool,
    /// Institutions found by search
    pub institutions: Vec<Institution>,
    /// One result per processed institution
    pub results: Vec<InstitutionAppointmentResult>,
    /// Display summaries of `results`
    pub summaries: Vec<AppointmentSummary>,
}

impl DiscoveryReport {
    fn new(
        session_id: &str,
        institutions: Vec<Institution>,
        results: Vec<InstitutionAppointmentResult>,
        complete: bool,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            generated_at: now_secs(),
            complete,
            institutions,
            summaries: summarize(&results),
            results,
        }
    }
}

/// Inputs for one run, copied out of the record
#[derive(Debug, Clone)]
pub(crate) struct DiscoveryRequest {
    pub session_id: String,
    pub condition: Option<String>,
    pub zip_code: String,
    pub insurance: Option<String>,
}

impl DiscoveryRequest {
    /// None when the record has no ZIP code to search near
    pub fn from_record(record: &PatientRecord) -> Option<Self> {
        Some(Self {
            session_id: record.session_id().to_string(),
            condition: record.medical_condition().map(str::to_string),
            zip_code: record.zip_code()?.to_string(),
            insurance: record.insurance().map(str::to_string),
        })
    }
}

fn save(archive: Option<&JsonArchive>, report: &DiscoveryReport) {
    let Some(archive) = archive else {
        return;
    };
    if let Err(e) = archive.write_discovery(&report.session_id, report) {
        warn!(session_id = %report.session_id, error = %e, "Failed to write discovery output");
    }
}

/// Find institutions and discover their appointments
///
/// Returns `None` when search failed. Partial results are written to the
/// archive after every batch.
pub(crate) async fn run_discovery(
    services: DiscoveryServices,
    llm: Arc<dyn TextGenerator>,
    config: DiscoveryConfig,
    archive: Option<JsonArchive>,
    request: DiscoveryRequest,
    shutdown: watch::Receiver<bool>,
) -> Option<DiscoveryReport> {
    let session_id = request.session_id.clone();
    info!(%session_id, zip = %request.zip_code, "Background discovery started");

    let finder = InstitutionFinder::new(services.search, services.qa, config.clone());
    let institutions = match finder
        .find(
            request.condition.as_deref(),
            &request.zip_code,
            request.insurance.as_deref(),
        )
        .await
    {
        Ok(institutions) => institutions,
        Err(e) => {
            error!(%session_id, error = %e, "Institution search failed");
            return None;
        }
    };

    let mut engine = AppointmentDiscoveryEngine::new(services.launcher, llm, config);
    if let Some(archive) = archive.clone() {
        engine = engine.with_screenshot_dir(archive.screenshot_dir(&session_id));
        let sink_session = session_id.clone();
        let sink_institutions = institutions.clone();
        engine = engine.with_sink(Arc::new(move |results: &[InstitutionAppointmentResult]| {
            let partial = DiscoveryReport::new(
                &sink_session,
                sink_institutions.clone(),
                results.to_vec(),
                false,
            );
            archive
                .write_discovery(&sink_session, &partial)
                .map_err(DiscoveryError::save)
        }));
    }

    let report = match engine.discover_until(institutions.clone(), shutdown).await {
        Ok(run) => DiscoveryReport::new(&session_id, institutions, run.results, true),
        Err(DiscoveryError::Interrupted { completed }) => {
            warn!(%session_id, completed = completed.len(), "Background discovery interrupted");
            DiscoveryReport::new(&session_id, institutions, completed, false)
        }
        Err(e) => {
            error!(%session_id, error = %e, "Background discovery failed");
            return None;
        }
    };

    save(archive.as_ref(), &report);
    info!(
        %session_id,
        institutions = report.institutions.len(),
        complete = report.complete,
        "Background discovery finished"
    );
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carehero_domain::RequiredField;

    #[test]
    fn test_request_requires_zip() {
        let mut record = PatientRecord::new("s");
        record.set_field_if_empty(RequiredField::MedicalCondition, "cough");
        assert!(DiscoveryRequest::from_record(&record).is_none());

        record.set_field_if_empty(RequiredField::ZipCode, "94110");
        let request = DiscoveryRequest::from_record(&record).unwrap();
        assert_eq!(request.zip_code, "94110");
        assert_eq!(request.condition.as_deref(), Some("cough"));
        assert!(request.insurance.is_none());
    }

    #[test]
    fn test_report_summarizes_results() {
        let report = DiscoveryReport::new("s", Vec::new(), Vec::new(), true);
        assert!(report.summaries.is_empty());
        assert!(report.complete);
    }
}
