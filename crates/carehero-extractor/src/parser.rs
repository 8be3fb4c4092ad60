//! Strict decoding of LLM output
//!
//! Output is either valid JSON of the expected shape or it is kept verbatim
//! as `Unstructured`. There is no attempt to salvage JSON embedded in prose.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Result of decoding an LLM response against a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum Decoded<T> {
    /// Decoded successfully
    Structured(T),
    /// Response kept as text
    Unstructured {
        /// Raw response
        raw: String,
        /// Why decoding failed
        reason: String,
    },
}

impl<T> Decoded<T> {
    /// The decoded value, if any
    pub fn structured(&self) -> Option<&T> {
        match self {
            Decoded::Structured(value) => Some(value),
            Decoded::Unstructured { .. } => None,
        }
    }

    /// True when decoding succeeded
    pub fn is_structured(&self) -> bool {
        matches!(self, Decoded::Structured(_))
    }
}

/// Remove a surrounding markdown code fence, if present
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    // Skip the opening fence line (```json or ```)
    let body = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return "",
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Decode `response` as `T`
///
/// # Examples
///
/// ```
/// use carehero_extractor::parser::decode_strict;
/// use carehero_extractor::Decoded;
///
/// let ok: Decoded<Vec<u32>> = decode_strict("```json\n[1, 2]\n```");
/// assert_eq!(ok, Decoded::Structured(vec![1, 2]));
///
/// let bad: Decoded<Vec<u32>> = decode_strict("Sure! Here you go: [1, 2]");
/// assert!(!bad.is_structured());
/// ```
pub fn decode_strict<T: DeserializeOwned>(response: &str) -> Decoded<T> {
    let body = strip_code_fence(response);
    match serde_json::from_str::<T>(body) {
        Ok(value) => Decoded::Structured(value),
        Err(e) => Decoded::Unstructured {
            raw: response.to_string(),
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Sample {
        a: u32,
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```"), "");
    }

    #[test]
    fn test_decode_structured() {
        let decoded: Decoded<Sample> = decode_strict(r#"{"a": 7}"#);
        assert_eq!(decoded.structured(), Some(&Sample { a: 7 }));
    }

    #[test]
    fn test_prose_is_not_salvaged() {
        let decoded: Decoded<Sample> = decode_strict(r#"Here it is: {"a": 7}"#);
        match decoded {
            Decoded::Unstructured { raw, reason } => {
                assert!(raw.starts_with("Here it is"));
                assert!(!reason.is_empty());
            }
            Decoded::Structured(_) => panic!("prose must not decode"),
        }
    }

    #[test]
    fn test_wrong_shape_is_unstructured() {
        let decoded: Decoded<Sample> = decode_strict(r#"{"a": "seven"}"#);
        assert!(!decoded.is_structured());
    }
}
