//! Care institutions surfaced by search

use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived classification of an institution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionType {
    /// Emergency room / emergency department
    EmergencyRoom,
    /// Urgent care center
    UrgentCare,
    /// Hospital
    Hospital,
    /// Clinic
    Clinic,
    /// Medical center
    MedicalCenter,
    /// Government or veterans facility
    GovernmentFacility,
    /// Anything else
    HealthcareFacility,
}

impl InstitutionType {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            InstitutionType::EmergencyRoom => "Emergency Room",
            InstitutionType::UrgentCare => "Urgent Care",
            InstitutionType::Hospital => "Hospital",
            InstitutionType::Clinic => "Clinic",
            InstitutionType::MedicalCenter => "Medical Center",
            InstitutionType::GovernmentFacility => "Government Facility",
            InstitutionType::HealthcareFacility => "Healthcare Facility",
        }
    }
}

impl fmt::Display for InstitutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether an institution accepts the patient's insurance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InsuranceAcceptance {
    /// Answer indicated acceptance
    #[serde(rename = "true")]
    Accepted,
    /// Answer indicated non-acceptance
    #[serde(rename = "false")]
    NotAccepted,
    /// No answer, ambiguous answer, or the lookup failed
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl InsuranceAcceptance {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            InsuranceAcceptance::Accepted => "true",
            InsuranceAcceptance::NotAccepted => "false",
            InsuranceAcceptance::Unknown => "unknown",
        }
    }
}

impl fmt::Display for InsuranceAcceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate care facility
///
/// Immutable once created. The URL must point at a trusted host
/// (see [`is_trusted_url`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    /// Display name (search result title)
    pub name: String,

    /// Website URL
    pub url: String,

    /// Derived classification
    pub institution_type: InstitutionType,

    /// Insurance acceptance
    pub accepts_insurance: InsuranceAcceptance,
}

impl Institution {
    /// Create an institution, rejecting untrusted URLs
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        institution_type: InstitutionType,
        accepts_insurance: InsuranceAcceptance,
    ) -> Result<Self, UntrustedUrl> {
        let url = url.into();
        if !is_trusted_url(&url) {
            return Err(UntrustedUrl(url));
        }
        Ok(Self {
            name: name.into(),
            url,
            institution_type,
            accepts_insurance,
        })
    }
}

/// Institution URL outside the `.org` / `.gov` allow-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntrustedUrl(pub String);

impl fmt::Display for UntrustedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "untrusted institution url: {}", self.0)
    }
}

impl std::error::Error for UntrustedUrl {}

/// Extract the lowercase host portion of a URL
pub fn url_host(url: &str) -> Option<String> {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = host_port.split(':').next()?.trim_end_matches('.');
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// True when the URL's host ends in `.org` or contains `.gov`
///
/// # Examples
///
/// ```
/// use carehero_domain::is_trusted_url;
///
/// assert!(is_trusted_url("https://www.sutterhealth.org/locations"));
/// assert!(is_trusted_url("https://www.va.gov/find-locations"));
/// assert!(!is_trusted_url("https://www.example.com/clinic.org"));
/// ```
pub fn is_trusted_url(url: &str) -> bool {
    match url_host(url) {
        Some(host) => host.ends_with(".org") || host.contains(".gov"),
        None => false,
    }
}
