//! Discover command implementation.
//!
//! Runs appointment discovery over a JSON array of institutions, outside of
//! any chat session. Ctrl-C stops the run after saving what has completed.

use crate::backends;
use crate::cli::DiscoverArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use carehero_discovery::{summarize, AppointmentDiscoveryEngine, DiscoveryError};
use carehero_domain::{
    is_trusted_url, now_secs, AppointmentSummary, Institution, InstitutionAppointmentResult,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// File written by `--output`
#[derive(Debug, Serialize, Deserialize)]
pub struct DiscoveryOutput {
    /// Seconds since Unix epoch
    pub generated_at: u64,
    /// False for partial saves and interrupted runs
    pub complete: bool,
    /// One result per processed institution
    pub results: Vec<InstitutionAppointmentResult>,
    /// Display summaries of `results`
    pub summaries: Vec<AppointmentSummary>,
}

impl DiscoveryOutput {
    fn new(results: Vec<InstitutionAppointmentResult>, complete: bool) -> Self {
        Self {
            generated_at: now_secs(),
            complete,
            summaries: summarize(&results),
            results,
        }
    }
}

/// Read institutions, skipping entries whose URL is not .org or .gov.
pub fn load_institutions(path: &Path) -> Result<Vec<Institution>> {
    let contents = fs::read_to_string(path)?;
    let institutions: Vec<Institution> = serde_json::from_str(&contents)?;

    let (trusted, skipped): (Vec<_>, Vec<_>) = institutions
        .into_iter()
        .partition(|i| is_trusted_url(&i.url));
    for institution in &skipped {
        warn!(url = %institution.url, "Skipping untrusted institution");
    }
    Ok(trusted)
}

/// Write the output as a single newline-free JSON document
fn write_output(path: &Path, output: &DiscoveryOutput) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(output)?)
}

/// Screenshots go in a `screenshots` directory beside the output file
fn screenshot_dir(output: &Path) -> PathBuf {
    output
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("screenshots")
}

/// Execute the discover command.
pub async fn execute_discover(
    args: DiscoverArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    let institutions = load_institutions(&args.input)?;
    if institutions.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "No trusted institutions in {}",
            args.input.display()
        )));
    }

    let mut discovery = config.pipeline.discovery.clone();
    if let Some(max) = args.max_concurrent {
        discovery.max_concurrent = max;
    }
    discovery.validate().map_err(CliError::Config)?;

    println!(
        "{}",
        formatter.info(&format!(
            "Checking {} institutions, {} at a time",
            institutions.len(),
            discovery.max_concurrent
        ))
    );

    let mut engine = AppointmentDiscoveryEngine::new(
        backends::browser_launcher(config),
        backends::text_generator(config),
        discovery,
    );
    if let Some(path) = args.output.clone() {
        engine = engine.with_screenshot_dir(screenshot_dir(&path));
        engine = engine.with_sink(Arc::new(move |results: &[InstitutionAppointmentResult]| {
            write_output(&path, &DiscoveryOutput::new(results.to_vec(), false))
                .map_err(DiscoveryError::save)
        }));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after saving completed results");
            shutdown_tx.send_replace(true);
        }
    });

    let outcome = engine.discover_until(institutions, shutdown_rx).await;
    signal.abort();

    let output = match outcome {
        Ok(run) => {
            info!("{}", run.metrics.summary());
            DiscoveryOutput::new(run.results, true)
        }
        Err(DiscoveryError::Interrupted { completed }) => {
            println!(
                "{}",
                formatter.warning(&format!(
                    "Interrupted: {} institutions finished",
                    completed.len()
                ))
            );
            DiscoveryOutput::new(completed, false)
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(path) = &args.output {
        write_output(path, &output)?;
        println!(
            "{}",
            formatter.success(&format!("Results written to {}", path.display()))
        );
    }
    println!("{}", formatter.format_summaries(&output.summaries)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carehero_domain::{InstitutionType, InsuranceAcceptance};

    #[test]
    fn test_load_institutions_filters_untrusted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("institutions.json");
        fs::write(
            &path,
            r#"[
                {"name": "Mission Clinic", "url": "https://mission-clinic.org",
                 "institution_type": "clinic", "accepts_insurance": "unknown"},
                {"name": "Pill Shop", "url": "https://pills.example.com",
                 "institution_type": "clinic", "accepts_insurance": "true"}
            ]"#,
        )
        .unwrap();

        let institutions = load_institutions(&path).unwrap();
        assert_eq!(institutions.len(), 1);
        assert_eq!(institutions[0].name, "Mission Clinic");
    }

    #[test]
    fn test_load_institutions_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("institutions.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_institutions(&path),
            Err(CliError::Serialization(_))
        ));
    }

    #[test]
    fn test_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.json");
        write_output(&path, &DiscoveryOutput::new(Vec::new(), false)).unwrap();

        let written: DiscoveryOutput =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(!written.complete);
        assert!(written.summaries.is_empty());
    }

    #[test]
    fn test_output_file_is_single_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let institution = Institution::new(
            "Mission Clinic",
            "https://mission-clinic.org",
            InstitutionType::Clinic,
            InsuranceAcceptance::Unknown,
        )
        .unwrap();
        let results = vec![InstitutionAppointmentResult::error(
            institution,
            "navigation failed\nnet::ERR_NAME_NOT_RESOLVED",
        )];
        write_output(&path, &DiscoveryOutput::new(results, true)).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains('\n'));
        let written: DiscoveryOutput = serde_json::from_str(&raw).unwrap();
        assert_eq!(written.results.len(), 1);
        assert_eq!(written.summaries.len(), 1);
    }

    #[test]
    fn test_screenshot_dir_beside_output() {
        assert_eq!(
            screenshot_dir(Path::new("/tmp/run/results.json")),
            PathBuf::from("/tmp/run/screenshots")
        );
    }
}
