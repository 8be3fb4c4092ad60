//! Time-string validation and slot cleaning
//!
//! Every stage of the extraction chain produces loosely-formatted candidate
//! times. Cleaning rejects anything that looks like an address or other
//! page noise, then normalizes what remains to one of:
//!
//! - `H:MM AM` / `H:MM PM`
//! - `HH:MM` (24-hour)

use carehero_domain::AppointmentSlot;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// Patterns that disqualify a candidate outright
static NON_TIME: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Embedded line breaks
        Regex::new(r"[\r\n]").unwrap(),
        // Street addresses: "1001 Potrero Ave"
        Regex::new(r"\d{3,}\s+\w+\s+\w+").unwrap(),
        // ZIP-like or other bare 3-5 digit numbers
        Regex::new(r"\b\d{3,5}\b").unwrap(),
        // Long alphabetic runs ("Monday", "Directions")
        Regex::new(r"[A-Za-z]{4,}").unwrap(),
        // Street-name suffixes
        Regex::new(r"(?i)\b(ave|st|blvd|rd|dr|ln|ste|hwy|pkwy)\b").unwrap(),
    ]
});

static HOUR_MINUTE_12: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d{1,2}):(\d{2})\s*([AP]M)$").unwrap());

static HOUR_MINUTE_24: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());

static HOUR_12: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d{1,2})\s*([AP]M)$").unwrap());

/// 12-hour clock times inside running text
static CLOCK_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:\d{1,2}:\d{2}\s*[AP]M|\d{1,2}\s*[AP]M)\b").unwrap()
});

/// 12-hour or 24-hour times inside running text
static ANY_TIME_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}(?:\s*[AP]M\b)?|\b\d{1,2}\s*[AP]M\b").unwrap()
});

/// True when `candidate` overlaps a known non-time pattern
pub fn is_non_time(candidate: &str) -> bool {
    NON_TIME.iter().any(|re| re.is_match(candidate))
}

/// Normalize a candidate to a canonical time string
///
/// # Examples
///
/// ```
/// use carehero_discovery::cleaning::normalize_time;
///
/// assert_eq!(normalize_time("2 PM").as_deref(), Some("2:00 PM"));
/// assert_eq!(normalize_time("09:30am").as_deref(), Some("9:30 AM"));
/// assert_eq!(normalize_time("14:30").as_deref(), Some("14:30"));
/// assert_eq!(normalize_time("25:00"), None);
/// ```
pub fn normalize_time(candidate: &str) -> Option<String> {
    let collapsed = candidate.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(caps) = HOUR_MINUTE_12.captures(&collapsed) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        if !(1..=12).contains(&hour) || minute >= 60 {
            return None;
        }
        return Some(format!("{}:{:02} {}", hour, minute, caps[3].to_uppercase()));
    }

    if let Some(caps) = HOUR_MINUTE_24.captures(&collapsed) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        if hour >= 24 || minute >= 60 {
            return None;
        }
        return Some(format!("{:02}:{:02}", hour, minute));
    }

    if let Some(caps) = HOUR_12.captures(&collapsed) {
        let hour: u32 = caps[1].parse().ok()?;
        if !(1..=12).contains(&hour) {
            return None;
        }
        return Some(format!("{}:00 {}", hour, caps[2].to_uppercase()));
    }

    None
}

/// Validate a raw candidate: reject noise, then normalize
pub fn clean_time(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.len() < 2 || is_non_time(trimmed) {
        return None;
    }
    normalize_time(trimmed)
}

/// 12-hour clock times appearing in `text`, in order
pub fn find_clock_times(text: &str) -> Vec<&str> {
    CLOCK_IN_TEXT.find_iter(text).map(|m| m.as_str()).collect()
}

/// 12-hour and 24-hour times appearing in `text`, in order
pub fn find_any_times(text: &str) -> Vec<&str> {
    ANY_TIME_IN_TEXT.find_iter(text).map(|m| m.as_str()).collect()
}

/// Clean a stage's output
///
/// Invalid times are dropped, the rest normalized and de-duplicated by
/// normalized time. The list is sorted lexicographically (a best-effort
/// order, not chronological) and capped at `cap`.
pub fn clean_slots(slots: Vec<AppointmentSlot>, cap: usize) -> Vec<AppointmentSlot> {
    let mut seen = HashSet::new();
    let mut cleaned: Vec<AppointmentSlot> = slots
        .into_iter()
        .filter_map(|mut slot| match clean_time(&slot.time) {
            Some(time) => {
                slot.time = time;
                Some(slot)
            }
            None => {
                debug!(candidate = %slot.time, source = %slot.source, "Rejected time candidate");
                None
            }
        })
        .filter(|slot| seen.insert(slot.time.clone()))
        .collect();

    cleaned.sort_by(|a, b| a.time.cmp(&b.time));
    cleaned.truncate(cap);
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use carehero_domain::{SlotConfidence, SlotSource};

    fn slot(time: &str) -> AppointmentSlot {
        AppointmentSlot::new(time, SlotSource::RegexFallback, SlotConfidence::Low, "")
    }

    #[test]
    fn test_rejects_page_noise() {
        assert_eq!(clean_time("1001 Potrero Ave"), None);
        assert_eq!(clean_time("94110"), None);
        assert_eq!(clean_time("CA 94110"), None);
        assert_eq!(clean_time("Monday"), None);
        assert_eq!(clean_time("9:00\nAM"), None);
        assert_eq!(clean_time("Get Directions"), None);
        assert_eq!(clean_time("5"), None);
    }

    #[test]
    fn test_accepts_canonical_formats() {
        assert_eq!(clean_time("9:00 AM").as_deref(), Some("9:00 AM"));
        assert_eq!(clean_time("14:30").as_deref(), Some("14:30"));
        assert_eq!(clean_time("2 PM").as_deref(), Some("2:00 PM"));
        assert_eq!(clean_time(" 2:30 pm ").as_deref(), Some("2:30 PM"));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!(normalize_time("13:00 PM"), None);
        assert_eq!(normalize_time("0 AM"), None);
        assert_eq!(normalize_time("12:75"), None);
    }

    #[test]
    fn test_clean_slots_dedupes_sorts_and_caps() {
        let raw = vec![
            slot("2 PM"),
            slot("94110"),
            slot("10:00 AM"),
            slot("2:00 PM"),
            slot("1001 Potrero Ave"),
            slot("9:00 AM"),
        ];
        let cleaned = clean_slots(raw, 8);
        let times: Vec<&str> = cleaned.iter().map(|s| s.time.as_str()).collect();
        assert_eq!(times, vec!["10:00 AM", "2:00 PM", "9:00 AM"]);
    }

    #[test]
    fn test_clean_slots_cap() {
        let raw = (1..=12).map(|h| slot(&format!("{} PM", h))).collect();
        assert_eq!(clean_slots(raw, 8).len(), 8);
    }

    #[test]
    fn test_find_times_in_text() {
        let text = "Open 9 AM - 5:30 PM, lab closes 17:45, call 555-1234";
        assert_eq!(find_clock_times(text), vec!["9 AM", "5:30 PM"]);
        assert_eq!(find_any_times(text), vec!["9 AM", "5:30 PM", "17:45"]);
    }
}
