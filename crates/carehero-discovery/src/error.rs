//! Error types for discovery

use carehero_domain::{CapabilityError, CapabilityErrorKind, InstitutionAppointmentResult};
use thiserror::Error;

/// Errors surfaced by the finder and the discovery engine
///
/// Per-institution failures never appear here; they become
/// `ResultStatus::Error` results.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Institution search failed as a whole
    #[error("Search failed: {0}")]
    Search(#[from] CapabilityError),

    /// A result sink could not persist results
    #[error("Failed to save results: {0}")]
    Save(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Run stopped by a shutdown signal; completed results were saved
    #[error("Discovery interrupted after {} institution(s)", completed.len())]
    Interrupted {
        /// Results finished before the interruption
        completed: Vec<InstitutionAppointmentResult>,
    },
}

impl DiscoveryError {
    /// Wrap a persistence failure from a result sink
    pub fn save(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        DiscoveryError::Save(err.into())
    }
}

/// Errors from the WebDriver client
#[derive(Error, Debug)]
pub enum BrowserError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error object returned by the WebDriver endpoint
    #[error("WebDriver error '{error}': {message}")]
    WebDriver {
        /// W3C error code
        error: String,
        /// Error detail
        message: String,
    },

    /// Response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Operation on a context that was already closed
    #[error("Browser context is closed")]
    Closed,
}

impl From<BrowserError> for CapabilityError {
    fn from(err: BrowserError) -> Self {
        let kind = match &err {
            BrowserError::Http(e) if e.is_timeout() => CapabilityErrorKind::Timeout,
            BrowserError::Http(_) | BrowserError::Closed => CapabilityErrorKind::Unavailable,
            BrowserError::WebDriver { error, .. } if error == "timeout" => {
                CapabilityErrorKind::Timeout
            }
            BrowserError::WebDriver { .. } => CapabilityErrorKind::Other,
            BrowserError::InvalidResponse(_) => CapabilityErrorKind::InvalidResponse,
        };
        CapabilityError::new(kind, err.to_string())
    }
}

/// Errors from the Exa search client
#[derive(Error, Debug)]
pub enum SearchError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// API key environment variable is not set
    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),
}

impl From<SearchError> for CapabilityError {
    fn from(err: SearchError) -> Self {
        let kind = match &err {
            SearchError::Http(e) if e.is_timeout() => CapabilityErrorKind::Timeout,
            SearchError::Http(e) if e.is_decode() => CapabilityErrorKind::InvalidResponse,
            SearchError::Http(_) | SearchError::MissingApiKey(_) => {
                CapabilityErrorKind::Unavailable
            }
            SearchError::Api { status: 429, .. } => CapabilityErrorKind::RateLimited,
            SearchError::Api { .. } => CapabilityErrorKind::Other,
        };
        CapabilityError::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webdriver_timeout_maps_to_timeout() {
        let err = BrowserError::WebDriver {
            error: "timeout".to_string(),
            message: "page load".to_string(),
        };
        let cap: CapabilityError = err.into();
        assert_eq!(cap.kind, CapabilityErrorKind::Timeout);
    }

    #[test]
    fn test_rate_limit_maps() {
        let err = SearchError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        let cap: CapabilityError = err.into();
        assert_eq!(cap.kind, CapabilityErrorKind::RateLimited);
    }

    #[test]
    fn test_save_error_keeps_source() {
        let err = DiscoveryError::save(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "Failed to save results: disk full");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_interrupted_message_counts_results() {
        let err = DiscoveryError::Interrupted { completed: vec![] };
        assert_eq!(err.to_string(), "Discovery interrupted after 0 institution(s)");
    }
}
