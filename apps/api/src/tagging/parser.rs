//! Response parsing — turns raw model text into unvalidated label candidates.
//!
//! Models do not reliably follow the "JSON only" instruction, so the parser
//! first looks for a ```json fenced block anywhere in the text and falls back
//! to parsing the whole trimmed reply. It never fails: a decode error becomes
//! an all-empty candidate carrying a diagnostic. The decoded JSON is kept
//! as-is next to the candidate so callers can see exactly what the model said.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

/// Label candidates as the model produced them, before taxonomy checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCandidate {
    pub country: Option<String>,
    pub degree: Option<String>,
    pub major: Option<String>,
    pub sub_major: Option<String>,
    pub error: Option<String>,
}

impl RawCandidate {
    pub fn decode_failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Reads the four label keys (and any `error` key) from a JSON object.
    /// Missing keys, nulls and non-string values all become `None`.
    fn from_object(object: &Map<String, Value>) -> Self {
        let field = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            country: field("country"),
            degree: field("degree"),
            major: field("major"),
            sub_major: field("sub_major"),
            error: object.get("error").and_then(|e| match e {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }),
        }
    }
}

fn fenced_json() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("fence pattern is valid"))
}

/// Returns the JSON payload of the reply: the first ```json block, or the trimmed text.
pub fn json_payload(text: &str) -> &str {
    match fenced_json().captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// A parsed reply: the candidate read from it, and the decoded JSON verbatim
/// (`None` when the payload was not valid JSON).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReply {
    pub candidate: RawCandidate,
    pub value: Option<Value>,
}

pub fn parse_response(text: &str) -> ParsedReply {
    let payload = json_payload(text);

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => ParsedReply {
            candidate: match &value {
                Value::Object(object) => RawCandidate::from_object(object),
                _ => RawCandidate::default(),
            },
            value: Some(value),
        },
        Err(e) => {
            warn!("Model reply is not valid JSON ({e}); raw reply: {text}");
            ParsedReply {
                candidate: RawCandidate::decode_failure(format!("JSON parse failed: {e}")),
                value: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(text: &str) -> RawCandidate {
        parse_response(text).candidate
    }

    #[test]
    fn test_fenced_block_after_chatter() {
        let raw = "Sure! ```json\n{\"country\": \"美国\", \"degree\": \"硕士\"}\n```";
        let candidate = parsed(raw);
        assert_eq!(candidate.country.as_deref(), Some("美国"));
        assert_eq!(candidate.degree.as_deref(), Some("硕士"));
        assert_eq!(candidate.major, None);
        assert_eq!(candidate.sub_major, None);
        assert_eq!(candidate.error, None);
    }

    #[test]
    fn test_bare_json_with_whitespace() {
        let raw = "\n  {\"major\": \"商科\", \"sub_major\": \"金融学\"}  \n";
        let candidate = parsed(raw);
        assert_eq!(candidate.major.as_deref(), Some("商科"));
        assert_eq!(candidate.sub_major.as_deref(), Some("金融学"));
    }

    #[test]
    fn test_first_fenced_block_wins() {
        let raw = "```json\n{\"country\": \"英国\"}\n```\nor\n```json\n{\"country\": \"美国\"}\n```";
        assert_eq!(parsed(raw).country.as_deref(), Some("英国"));
    }

    #[test]
    fn test_plain_fence_without_json_marker_is_not_unwrapped() {
        let raw = "```\n{\"country\": \"英国\"}\n```";
        let candidate = parsed(raw);
        assert!(candidate.error.is_some());
        assert_eq!(candidate.country, None);
    }

    #[test]
    fn test_non_json_reply_sets_error() {
        let candidate = parsed("I am not sure.");
        assert_eq!(candidate.country, None);
        assert_eq!(candidate.degree, None);
        assert_eq!(candidate.major, None);
        assert_eq!(candidate.sub_major, None);
        let error = candidate.error.expect("decode failure must carry a diagnostic");
        assert!(error.starts_with("JSON parse failed"));
    }

    #[test]
    fn test_broken_json_inside_fence_sets_error() {
        let candidate = parsed("```json\n{\"country\": \"美国\",\n```");
        assert!(candidate.error.is_some());
        assert_eq!(candidate.country, None);
    }

    #[test]
    fn test_non_object_json_is_empty_without_error() {
        assert_eq!(parsed("[\"美国\", \"硕士\"]"), RawCandidate::default());
        assert_eq!(parsed("\"美国\""), RawCandidate::default());
    }

    #[test]
    fn test_null_and_non_string_values_become_none() {
        let candidate =
            parsed(r#"{"country": null, "degree": 2, "major": ["商科"], "sub_major": "会计"}"#);
        assert_eq!(candidate.country, None);
        assert_eq!(candidate.degree, None);
        assert_eq!(candidate.major, None);
        assert_eq!(candidate.sub_major.as_deref(), Some("会计"));
    }

    #[test]
    fn test_model_supplied_error_key_is_kept() {
        let candidate = parsed(r#"{"country": "美国", "error": "ambiguous degree"}"#);
        assert_eq!(candidate.error.as_deref(), Some("ambiguous degree"));
    }

    #[test]
    fn test_decoded_value_is_kept_verbatim() {
        let reply = parse_response("```json\n{\"degree\": 2, \"confidence\": 0.4}\n```");
        assert_eq!(reply.value, Some(json!({"degree": 2, "confidence": 0.4})));
        assert_eq!(reply.candidate, RawCandidate::default());

        let reply = parse_response("[\"美国\", \"硕士\"]");
        assert_eq!(reply.value, Some(json!(["美国", "硕士"])));
    }

    #[test]
    fn test_decode_failure_has_no_value() {
        let reply = parse_response("I am not sure.");
        assert_eq!(reply.value, None);
        assert!(reply.candidate.error.is_some());
    }

    #[test]
    fn test_json_payload_strips_fence() {
        assert_eq!(json_payload("x ```json\n{}\n``` y"), "{}");
        assert_eq!(json_payload("  {}  "), "{}");
    }
}
