//! CareHero Institution and Appointment Discovery
//!
//! Two stages run once a patient record is complete:
//!
//! 1. [`InstitutionFinder`] searches for trusted (`.org` / `.gov`) care
//!    institutions near the patient and checks insurance acceptance.
//! 2. [`AppointmentDiscoveryEngine`] visits each institution's website in
//!    bounded parallel batches and extracts appointment slots through an
//!    ordered fallback chain:
//!
//! ```text
//! navigate ─→ structural scan ─→ LLM analysis ─→ regex fallback ─→ synthetic
//!             (first stage with valid slots wins, all output is cleaned)
//! ```
//!
//! Failures stay local: one institution's error becomes that institution's
//! `error` result and never touches its siblings.
//!
//! Backends: [`ExaClient`] for search and question answering,
//! [`WebDriverLauncher`] for browser automation.

#![warn(missing_docs)]

pub mod cleaning;
mod config;
mod engine;
mod error;
mod exa;
mod finder;
mod metrics;
pub mod page;
pub mod strategies;
mod summary;
mod webdriver;

pub use config::DiscoveryConfig;
pub use engine::{AppointmentDiscoveryEngine, DiscoveryRun, ResultSink};
pub use error::{BrowserError, DiscoveryError, SearchError};
pub use exa::ExaClient;
pub use finder::{classify_answer, classify_institution, search_query, InstitutionFinder};
pub use metrics::DiscoveryMetrics;
pub use summary::{summarize, summarize_result, visit_website_note};
pub use webdriver::{
    WebDriverBrowser, WebDriverContext, WebDriverLauncher, DEFAULT_BROWSER as DEFAULT_WEBDRIVER_BROWSER,
    DEFAULT_ENDPOINT as DEFAULT_WEBDRIVER_ENDPOINT,
};
