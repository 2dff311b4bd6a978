//! Typed view of the API's 4xx error bodies and the duplicate-key detector.
//!
//! The API answers validation failures with a JSON object of per-field arrays:
//! `{"its_number": ["ITS Number already registered."], "email": ["Enter a valid email address."]}`.
//! Entries are usually plain strings, sometimes `{"message": ..., "code": ...}` objects,
//! and occasionally a bare string instead of an array (`{"error": "..."}`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Codes that mark a uniqueness violation when the API sends them.
pub const DUPLICATE_CODES: &[&str] = &["unique", "already_exists", "duplicate"];

/// Free-text fallback for APIs that only send a message.
///
/// This is a compatibility shim over untyped strings, not a contract the API
/// promises to keep. Replace it with a dedicated error code once the API emits one.
pub const DUPLICATE_MARKERS: &[&str] = &["already exists", "already registered"];

/// Keys that may carry the message of an object-shaped entry, in lookup order.
const MESSAGE_KEYS: &[&str] = &["message", "string", "detail"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(alias = "string", alias = "detail")]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl FieldError {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(message) => Self::text(message),
            serde_json::Value::Object(mut map) => {
                let message_key = MESSAGE_KEYS
                    .iter()
                    .copied()
                    .find(|key| map.get(*key).is_some_and(serde_json::Value::is_string));
                match message_key.and_then(|key| map.remove(key)) {
                    Some(serde_json::Value::String(message)) => Self {
                        message,
                        code: map
                            .get("code")
                            .and_then(serde_json::Value::as_str)
                            .map(str::to_string),
                    },
                    // Unrecognised shape: keep the whole object as the message.
                    _ => Self::text(serde_json::Value::Object(map).to_string()),
                }
            }
            other => Self::text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    pub fields: BTreeMap<String, Vec<FieldError>>,
    /// Body text when it was not a JSON object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ApiErrorBody {
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(map)) => {
                let fields = map
                    .into_iter()
                    .map(|(name, value)| {
                        let errors = match value {
                            serde_json::Value::Array(items) => {
                                items.into_iter().map(FieldError::from_value).collect()
                            }
                            single => vec![FieldError::from_value(single)],
                        };
                        (name, errors)
                    })
                    .collect();
                Self { fields, raw: None }
            }
            _ => {
                let trimmed = body.trim();
                Self {
                    fields: BTreeMap::new(),
                    raw: (!trimmed.is_empty()).then(|| trimmed.to_string()),
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.raw.is_none()
    }

    pub fn errors_for(&self, field: &str) -> &[FieldError] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One line per field, e.g. `email: Enter a valid email address.`
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self
            .fields
            .iter()
            .map(|(name, errors)| {
                let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                format!("{}: {}", name, messages.join("; "))
            })
            .collect();
        if let Some(raw) = &self.raw {
            lines.push(raw.clone());
        }
        lines.join("\n")
    }
}

/// Returns the duplicate message for `key_field`, if the body reports one.
pub fn duplicate_message(body: &ApiErrorBody, key_field: &str) -> Option<String> {
    let errors = body.errors_for(key_field);

    let by_code = errors.iter().find(|e| {
        e.code
            .as_deref()
            .is_some_and(|code| DUPLICATE_CODES.contains(&code))
    });
    if let Some(error) = by_code {
        return Some(error.message.clone());
    }

    errors
        .iter()
        .find(|e| {
            let lowered = e.message.to_lowercase();
            DUPLICATE_MARKERS.iter().any(|marker| lowered.contains(marker))
        })
        .map(|e| e.message.clone())
}

pub fn is_duplicate_key(body: &ApiErrorBody, key_field: &str) -> bool {
    duplicate_message(body, key_field).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_arrays() {
        let body = ApiErrorBody::parse(r#"{"email": ["invalid"], "phone_number": ["required", "too short"]}"#);
        assert_eq!(body.errors_for("email"), &[FieldError::text("invalid")]);
        assert_eq!(body.errors_for("phone_number").len(), 2);
        assert!(body.errors_for("its_number").is_empty());
        assert!(body.raw.is_none());
    }

    #[test]
    fn test_parse_bare_string_and_coded_entries() {
        let body = ApiErrorBody::parse(
            r#"{"error": "At least one audition file is required.",
                "its_number": [{"string": "registration with this its number exists.", "code": "unique"}]}"#,
        );
        assert_eq!(
            body.errors_for("error")[0].message,
            "At least one audition file is required."
        );
        assert_eq!(body.errors_for("its_number")[0].code.as_deref(), Some("unique"));
    }

    #[test]
    fn test_object_entries_without_message_keep_their_text() {
        let body = ApiErrorBody::parse(
            r#"{"media_files": [{"detail": "File too large.", "code": 413}, {"limit": 6}]}"#,
        );
        let errors = body.errors_for("media_files");
        assert_eq!(errors[0].message, "File too large.");
        assert_eq!(errors[0].code, None);
        assert_eq!(errors[1].message, r#"{"limit":6}"#);
    }

    #[test]
    fn test_parse_non_json_keeps_raw_text() {
        let body = ApiErrorBody::parse("<h1>Bad Request</h1>");
        assert!(body.fields.is_empty());
        assert_eq!(body.raw.as_deref(), Some("<h1>Bad Request</h1>"));

        assert!(ApiErrorBody::parse("").is_empty());
    }

    #[test]
    fn test_duplicate_detected_by_marker() {
        let body = ApiErrorBody::parse(r#"{"its_number": ["this its number already exists"]}"#);
        assert!(is_duplicate_key(&body, "its_number"));

        let body = ApiErrorBody::parse(r#"{"its_number": ["ITS Number already registered."]}"#);
        assert_eq!(
            duplicate_message(&body, "its_number").as_deref(),
            Some("ITS Number already registered.")
        );
    }

    #[test]
    fn test_duplicate_detected_by_code() {
        let body = ApiErrorBody::parse(
            r#"{"its_number": [{"message": "registration with this its number exists.", "code": "unique"}]}"#,
        );
        assert!(is_duplicate_key(&body, "its_number"));
    }

    #[test]
    fn test_duplicate_requires_key_field() {
        let body = ApiErrorBody::parse(r#"{"email": ["this email already exists"]}"#);
        assert!(!is_duplicate_key(&body, "its_number"));

        let body = ApiErrorBody::parse(r#"{"its_number": ["Ensure this field has no more than 20 characters."]}"#);
        assert!(!is_duplicate_key(&body, "its_number"));
    }

    #[test]
    fn test_summary() {
        let body = ApiErrorBody::parse(r#"{"email": ["invalid"], "full_name": ["required"]}"#);
        assert_eq!(body.summary(), "email: invalid\nfull_name: required");
    }
}
