//! The ordered slot-extraction stages
//!
//! 1. structural scan of interactive elements, then a clock-time sweep of the page
//! 2. LLM content analysis
//! 3. regex fallback over appointment-context lines
//! 4. synthetic placeholders
//!
//! Stages are pure over a captured [`PageContent`] except the LLM stage.

use crate::cleaning::{find_any_times, find_clock_times, normalize_time};
use crate::page::PageContent;
use carehero_domain::{
    AppointmentSlot, GenerationRequest, SlotConfidence, SlotSource, TextGenerator,
};
use carehero_extractor::parser::decode_strict;
use carehero_extractor::Decoded;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Words marking a line as appointment-related
pub const APPOINTMENT_KEYWORDS: &[&str] = &[
    "appointment",
    "book",
    "schedule",
    "available",
    "slot",
    "visit",
    "consultation",
    "meeting",
    "time",
    "hours",
];

/// Business-hour placeholders, in order
pub const PLACEHOLDER_TIMES: &[&str] = &[
    "9:00 AM", "9:30 AM", "10:00 AM", "10:30 AM", "11:00 AM", "11:30 AM", "1:00 PM", "1:30 PM",
    "2:00 PM", "2:30 PM", "3:00 PM", "3:30 PM", "4:00 PM",
];

const CONTEXT_CHARS: usize = 100;

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Stage 1: times on buttons and links, then anywhere in the page text
pub fn structural_scan(page: &PageContent) -> Vec<AppointmentSlot> {
    let mut slots: Vec<AppointmentSlot> = page
        .interactive
        .iter()
        .flat_map(|element| {
            find_clock_times(&element.text).into_iter().map(move |time| {
                AppointmentSlot::new(
                    time,
                    SlotSource::StructuralScan,
                    SlotConfidence::High,
                    format!("{}: {}", element.tag, truncate_chars(&element.text, CONTEXT_CHARS)),
                )
            })
        })
        .collect();

    if slots.is_empty() {
        slots = find_clock_times(&page.text)
            .into_iter()
            .map(|time| {
                AppointmentSlot::new(
                    time,
                    SlotSource::StructuralScan,
                    SlotConfidence::Medium,
                    "page text",
                )
            })
            .collect();
    }

    slots
}

const SLOT_ANALYSIS_SYSTEM_PROMPT: &str = "You extract appointment availability from healthcare website text. Respond with JSON only.";

const SLOT_ANALYSIS_INSTRUCTIONS: &str = r#"Analyze the following healthcare website content and extract available appointment times.

Look for specific appointment times ("9:00 AM", "2:30 PM", "14:00"), bookable time slots, and schedule or office-hours information. If no specific appointment times are shown but office hours are, return those hours as potential appointment windows.

Return a JSON array; each element is:
{"time": "9:00 AM", "confidence": "high|medium|low", "context": "where the time was found"}

If there is no time-related information, return [].

Website content:
"#;

#[derive(Debug, Deserialize)]
struct LlmSlot {
    #[serde(default)]
    time: String,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

/// Collapse whitespace and bound the text sent to the model
pub fn prepare_page_text(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > limit {
        format!("{}...", truncate_chars(&collapsed, limit))
    } else {
        collapsed
    }
}

/// Stage 2: ask the model for slots
///
/// Non-JSON output, a JSON value of the wrong shape, an error or a timeout
/// all yield an empty list.
pub async fn llm_analysis(
    llm: &dyn TextGenerator,
    page: &PageContent,
    text_limit: usize,
    limit: Duration,
) -> Vec<AppointmentSlot> {
    let text = prepare_page_text(&page.text, text_limit);
    if text.is_empty() {
        return Vec::new();
    }

    let request = GenerationRequest::new(format!("{}{}", SLOT_ANALYSIS_INSTRUCTIONS, text))
        .with_system(SLOT_ANALYSIS_SYSTEM_PROMPT)
        .with_temperature(0.2)
        .with_max_tokens(800);

    let response = match timeout(limit, llm.generate(&request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            warn!(url = %page.url, error = %e, "Slot analysis call failed");
            return Vec::new();
        }
        Err(_) => {
            warn!(url = %page.url, "Slot analysis call timed out");
            return Vec::new();
        }
    };

    match decode_strict::<Vec<LlmSlot>>(&response) {
        Decoded::Structured(items) => items
            .into_iter()
            .filter(|item| !item.time.trim().is_empty())
            .map(|item| {
                let confidence = item
                    .confidence
                    .as_deref()
                    .map(SlotConfidence::parse_lenient)
                    .unwrap_or(SlotConfidence::Medium);
                AppointmentSlot::new(
                    item.time.trim(),
                    SlotSource::LlmExtraction,
                    confidence,
                    item.context.unwrap_or_default(),
                )
            })
            .collect(),
        Decoded::Unstructured { reason, .. } => {
            debug!(url = %page.url, %reason, "Slot analysis output was not a slot array");
            Vec::new()
        }
    }
}

/// Stage 3: strict time patterns on appointment-context lines
///
/// De-duplicated by normalized time and capped at `cap`.
pub fn regex_fallback(text: &str, cap: usize) -> Vec<AppointmentSlot> {
    let mut seen = HashSet::new();
    let mut slots = Vec::new();

    for line in text.lines() {
        let lowered = line.to_lowercase();
        if !APPOINTMENT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            continue;
        }
        for candidate in find_any_times(line) {
            let Some(time) = normalize_time(candidate) else {
                continue;
            };
            if !seen.insert(time.clone()) {
                continue;
            }
            slots.push(AppointmentSlot::new(
                time,
                SlotSource::RegexFallback,
                SlotConfidence::Low,
                truncate_chars(line.trim(), CONTEXT_CHARS),
            ));
            if slots.len() >= cap {
                return slots;
            }
        }
    }

    slots
}

/// Stage 4: placeholder slots pointing the user at the website
///
/// Tagged `SlotSource::Synthetic`, low confidence and not bookable.
pub fn synthetic_slots(url: &str, count: usize) -> Vec<AppointmentSlot> {
    PLACEHOLDER_TIMES
        .iter()
        .take(count)
        .map(|time| {
            let mut slot = AppointmentSlot::new(
                *time,
                SlotSource::Synthetic,
                SlotConfidence::Low,
                "No appointment information found on the page",
            );
            slot.note = Some(format!("Visit {} directly to check availability and book", url));
            slot
        })
        .collect()
}
