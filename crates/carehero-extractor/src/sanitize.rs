//! Checks applied to LLM-proposed values before they are accepted

use carehero_domain::RequiredField;

/// Strings models use to mean "nothing"
const NULLISH: &[&str] = &["null", "none", "n/a", "na", "unknown", "not provided", ""];

fn non_null(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if NULLISH.contains(&trimmed.to_lowercase().as_str()) {
        None
    } else {
        Some(trimmed)
    }
}

/// Accept `NNNNN` or `NNNNN-NNNN`; returns the 5-digit form
pub(crate) fn zip_code(value: &str) -> Option<String> {
    let value = non_null(value)?;
    let (head, tail) = match value.split_once('-') {
        Some((head, tail)) => (head, Some(tail)),
        None => (value, None),
    };
    let head_ok = head.len() == 5 && head.chars().all(|c| c.is_ascii_digit());
    let tail_ok = tail.is_none_or(|t| t.len() == 4 && t.chars().all(|c| c.is_ascii_digit()));
    (head_ok && tail_ok).then(|| head.to_string())
}

/// Accept values containing exactly 10 digits (11 with a leading 1)
pub(crate) fn phone_number(value: &str) -> Option<String> {
    let value = non_null(value)?;
    let digits: Vec<char> = value.chars().filter(|c| c.is_ascii_digit()).collect();
    let valid = digits.len() == 10 || (digits.len() == 11 && digits[0] == '1');
    valid.then(|| value.to_string())
}

/// Accept any non-empty, non-placeholder text
pub(crate) fn free_text(value: &str) -> Option<String> {
    non_null(value).map(str::to_string)
}

/// Check a proposed value for `field`; returns the normalized value
pub fn field(field: RequiredField, value: &str) -> Option<String> {
    match field {
        RequiredField::ZipCode => zip_code(value),
        RequiredField::PhoneNumber => phone_number(value),
        RequiredField::MedicalCondition | RequiredField::Insurance => free_text(value),
    }
}
