//! Candidate institution search
//!
//! One search query per patient, filtered to trusted hosts, capped, then a
//! per-candidate insurance question. Insurance lookups never fail the batch.

use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use carehero_domain::{
    is_trusted_url, Institution, InstitutionType, InsuranceAcceptance, QuestionAnswerer,
    SearchProvider,
};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static VETERANS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(va|veterans?)\b").unwrap());
static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bnot|n't|\bnever)\s+(?:accept|take|cover)\w*|^\s*no\b").unwrap()
});
static POSITIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(yes|accept\w*)\b").unwrap());

const GENERIC_CONDITION: &str = "general care";

/// Search query for a condition near a ZIP code
pub fn search_query(condition: Option<&str>, zip_code: &str) -> String {
    let condition = condition
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(GENERIC_CONDITION);
    format!(
        "{} medical facilities near {} site:.org OR site:.gov",
        condition, zip_code
    )
}

/// Classify an institution by keywords in its title, then its URL
pub fn classify_institution(title: &str, url: &str) -> InstitutionType {
    let title_lower = title.to_lowercase();
    if title_lower.contains("emergency") {
        InstitutionType::EmergencyRoom
    } else if title_lower.contains("urgent") {
        InstitutionType::UrgentCare
    } else if title_lower.contains("hospital") {
        InstitutionType::Hospital
    } else if title_lower.contains("clinic") {
        InstitutionType::Clinic
    } else if title_lower.contains("medical center") {
        InstitutionType::MedicalCenter
    } else if VETERANS.is_match(title) || carehero_domain::url_host(url).is_some_and(|h| h.contains(".gov")) {
        InstitutionType::GovernmentFacility
    } else {
        InstitutionType::HealthcareFacility
    }
}

/// Map a free-text answer to the insurance tri-state
///
/// Only an explicit refusal ("does not accept", a leading "No") counts as
/// negative; it is checked first so "does not accept" is not read as
/// acceptance. A stray "no" elsewhere in an affirmative answer is ignored.
pub fn classify_answer(answer: &str) -> InsuranceAcceptance {
    if NEGATIVE.is_match(answer) {
        InsuranceAcceptance::NotAccepted
    } else if POSITIVE.is_match(answer) {
        InsuranceAcceptance::Accepted
    } else {
        InsuranceAcceptance::Unknown
    }
}

/// The InstitutionFinder
pub struct InstitutionFinder {
    search: Arc<dyn SearchProvider>,
    qa: Arc<dyn QuestionAnswerer>,
    config: DiscoveryConfig,
}

impl InstitutionFinder {
    /// Create a new finder
    pub fn new(
        search: Arc<dyn SearchProvider>,
        qa: Arc<dyn QuestionAnswerer>,
        config: DiscoveryConfig,
    ) -> Self {
        Self { search, qa, config }
    }

    /// Find up to `max_institutions` trusted institutions near `zip_code`
    ///
    /// Only the search call can fail the whole lookup.
    pub async fn find(
        &self,
        condition: Option<&str>,
        zip_code: &str,
        insurance: Option<&str>,
    ) -> Result<Vec<Institution>, DiscoveryError> {
        let query = search_query(condition, zip_code);
        info!(%query, "Searching for institutions");

        let hits = self
            .search
            .search(&query, self.config.search_num_results)
            .await?;
        debug!(hits = hits.len(), "Search returned");

        let mut seen = HashSet::new();
        let mut institutions = Vec::new();
        for hit in hits {
            if institutions.len() >= self.config.max_institutions {
                break;
            }
            if !is_trusted_url(&hit.url) {
                debug!(url = %hit.url, "Skipping untrusted host");
                continue;
            }
            if !seen.insert(hit.url.clone()) {
                continue;
            }

            let name = if hit.title.trim().is_empty() {
                hit.url.clone()
            } else {
                hit.title.trim().to_string()
            };
            let institution_type = classify_institution(&name, &hit.url);
            let accepts = self.check_insurance(&name, insurance).await;

            match Institution::new(name, hit.url, institution_type, accepts) {
                Ok(institution) => institutions.push(institution),
                Err(e) => warn!(error = %e, "Dropping candidate"),
            }
        }

        info!(found = institutions.len(), "Institution search complete");
        Ok(institutions)
    }

    async fn check_insurance(&self, name: &str, insurance: Option<&str>) -> InsuranceAcceptance {
        let Some(insurance) = insurance.map(str::trim).filter(|i| !i.is_empty()) else {
            return InsuranceAcceptance::Unknown;
        };

        let question = format!("Does {} accept {} insurance?", name, insurance);
        match self.qa.answer(&question).await {
            Ok(answer) => {
                let accepts = classify_answer(&answer.answer_text);
                debug!(institution = %name, %accepts, "Insurance answer classified");
                accepts
            }
            Err(e) => {
                warn!(institution = %name, error = %e, "Insurance lookup failed");
                InsuranceAcceptance::Unknown
            }
        }
    }
}
