//! Appointment slots and per-institution discovery results

use crate::{now_secs, Institution};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which extraction stage produced a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSource {
    /// Found in interactive page elements or the page text sweep
    StructuralScan,
    /// Returned by the text-generation capability
    LlmExtraction,
    /// Found by the keyword-line regex scan
    RegexFallback,
    /// Placeholder; not a real finding
    Synthetic,
}

impl SlotSource {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotSource::StructuralScan => "structural_scan",
            SlotSource::LlmExtraction => "llm_extraction",
            SlotSource::RegexFallback => "regex_fallback",
            SlotSource::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for SlotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence attached to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotConfidence {
    /// Strong evidence
    High,
    /// Some evidence
    Medium,
    /// Weak or no evidence
    Low,
}

impl SlotConfidence {
    /// Parse leniently; anything unrecognized is `Low`
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => SlotConfidence::High,
            "medium" | "med" => SlotConfidence::Medium,
            _ => SlotConfidence::Low,
        }
    }
}

/// One candidate appointment time with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSlot {
    /// Normalized display string, e.g. "9:00 AM"
    pub time: String,

    /// Producing stage
    pub source: SlotSource,

    /// Confidence
    pub confidence: SlotConfidence,

    /// Free-text context around the finding
    pub context: String,

    /// Whether the slot appears bookable online
    pub booking_available: bool,

    /// Optional note (synthetic slots point the user at the website)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AppointmentSlot {
    /// Create a slot with no note
    pub fn new(
        time: impl Into<String>,
        source: SlotSource,
        confidence: SlotConfidence,
        context: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            source,
            confidence,
            context: context.into(),
            booking_available: source != SlotSource::Synthetic,
            note: None,
        }
    }

    /// True for placeholder slots
    pub fn is_synthetic(&self) -> bool {
        self.source == SlotSource::Synthetic
    }
}

/// Outcome of processing one institution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// At least one slot was produced
    Success,
    /// The pipeline completed with an empty list
    NoSlotsFound,
    /// Navigation, timeout, or task failure
    Error,
}

/// Per-institution discovery result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionAppointmentResult {
    /// The institution that was processed
    pub institution: Institution,

    /// Cleaned slots
    pub slots: Vec<AppointmentSlot>,

    /// Outcome
    pub status: ResultStatus,

    /// Caught error message when `status` is `Error`
    pub error_message: Option<String>,

    /// When processing finished (seconds since Unix epoch)
    pub checked_at: u64,

    /// Debug screenshot of the page, kept for failed or placeholder-only results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

impl InstitutionAppointmentResult {
    /// Build a result from cleaned slots
    pub fn from_slots(institution: Institution, slots: Vec<AppointmentSlot>) -> Self {
        let status = if slots.is_empty() {
            ResultStatus::NoSlotsFound
        } else {
            ResultStatus::Success
        };
        Self {
            institution,
            slots,
            status,
            error_message: None,
            checked_at: now_secs(),
            screenshot_path: None,
        }
    }

    /// Build an error result
    pub fn error(institution: Institution, message: impl Into<String>) -> Self {
        Self {
            institution,
            slots: Vec::new(),
            status: ResultStatus::Error,
            error_message: Some(message.into()),
            checked_at: now_secs(),
            screenshot_path: None,
        }
    }

    /// Attach a debug screenshot path
    pub fn with_screenshot(mut self, path: impl Into<String>) -> Self {
        self.screenshot_path = Some(path.into());
        self
    }

    /// True when every slot is a placeholder (or there are none)
    pub fn has_only_placeholders(&self) -> bool {
        self.slots.iter().all(AppointmentSlot::is_synthetic)
    }
}

/// How the user should book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingMethod {
    /// At least one real slot was found
    Online,
    /// Only placeholders or nothing; send the user to the site
    VisitWebsite,
}

/// Normalized per-institution summary for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    /// Institution name
    pub institution_name: String,

    /// Institution website
    pub url: String,

    /// Cleaned slot times
    pub available_slots: Vec<String>,

    /// Booking classification
    pub booking_method: BookingMethod,

    /// First slot, as a convenience (not a chronological guarantee)
    pub next_available: Option<String>,

    /// Number of slots before the display cap
    pub total_slots_found: usize,

    /// Note pointing at the source URL for `VisitWebsite`
    pub booking_note: Option<String>,

    /// Error message for failed institutions
    pub processing_error: Option<String>,
}
