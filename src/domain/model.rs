use crate::domain::api_error::ApiErrorBody;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// A binary file sent as one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One submission payload, keyed by a natural key that the server treats as unique.
///
/// Built once per attempt and never mutated after it is handed to the client.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    key_field: String,
    key: String,
    fields: Vec<(String, String)>,
    attachment_field: String,
    attachments: Vec<Attachment>,
    multipart: bool,
}

impl SubmissionRequest {
    pub fn new(key_field: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            key: key.into(),
            fields: Vec::new(),
            attachment_field: "media_files".to_string(),
            attachments: Vec::new(),
            multipart: false,
        }
    }

    /// A request that carries only files, with no natural key field.
    pub fn attachments_only(attachment_field: impl Into<String>) -> Self {
        Self::new("", "").with_attachment_field(attachment_field)
    }

    /// Sends the text fields as multipart even when there are no attachments.
    pub fn as_multipart(mut self) -> Self {
        self.multipart = true;
        self
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart || !self.attachments.is_empty()
    }

    /// Adds a text field. Repeating a name sends the field several times.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn with_attachment_field(mut self, name: impl Into<String>) -> Self {
        self.attachment_field = name.into();
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn attachment_field(&self) -> &str {
        &self.attachment_field
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// All text fields in send order, natural key first. A request without a key field
    /// sends only its extra fields.
    pub fn form_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        std::iter::once((self.key_field.as_str(), self.key.as_str()))
            .filter(|(name, _)| !name.is_empty())
            .chain(
                self.fields
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            )
    }

    pub fn total_attachment_bytes(&self) -> u64 {
        self.attachments.iter().map(Attachment::len).sum()
    }

    /// JSON rendering for attachment-free submissions. Repeated fields become arrays.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (name, value) in self.form_fields() {
            let value = serde_json::Value::String(value.to_string());
            match object.get_mut(name) {
                Some(serde_json::Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = serde_json::Value::Array(vec![first, value]);
                }
                None => {
                    object.insert(name.to_string(), value);
                }
            }
        }
        serde_json::Value::Object(object)
    }
}

/// How a `Success` was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum Confirmation {
    /// The write itself returned a 2xx status.
    Direct { status: u16 },
    /// A verification poll found the record after an ambiguous write.
    Verified { attempt: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Success {
        confirmation: Confirmation,
    },
    AlreadyExists {
        message: String,
    },
    ValidationError {
        status: u16,
        errors: ApiErrorBody,
    },
    ServerError {
        status: u16,
    },
    NetworkFailure {
        reason: String,
    },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success { .. })
    }

    /// True for outcomes where the write may or may not have landed.
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            SubmissionOutcome::ServerError { .. } | SubmissionOutcome::NetworkFailure { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Success { .. } => "success",
            SubmissionOutcome::AlreadyExists { .. } => "already_exists",
            SubmissionOutcome::ValidationError { .. } => "validation_error",
            SubmissionOutcome::ServerError { .. } => "server_error",
            SubmissionOutcome::NetworkFailure { .. } => "network_failure",
        }
    }
}

/// Retry shape of the verification loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum PollResult {
    Found,
    NotFound,
    /// Unexpected status, transport error or timeout.
    Inconclusive(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PollRecord {
    pub attempt: u32,
    pub result: PollResult,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteAttempt {
    pub status: Option<u16>,
    pub error: Option<String>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

/// Everything one `submit` call did, returned to the caller that owns it.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    pub key: String,
    pub outcome: SubmissionOutcome,
    pub write: WriteAttempt,
    pub polls: Vec<PollRecord>,
    pub cancelled: bool,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionReport {
    pub fn poll_count(&self) -> usize {
        self.polls.len()
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields_put_key_first() {
        let request = SubmissionRequest::new("its_number", "30412345")
            .with_field("full_name", "Ali Asgar")
            .with_field("preference", "AZAAN");

        let fields: Vec<_> = request.form_fields().collect();
        assert_eq!(fields[0], ("its_number", "30412345"));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_attachments_only_request_sends_no_key() {
        let request = SubmissionRequest::attachments_only("audition_files")
            .with_attachment(Attachment::new("a.mp3", "audio/mpeg", vec![0; 4]));

        assert_eq!(request.form_fields().count(), 0);
        assert_eq!(request.key(), "");
        assert_eq!(request.attachment_field(), "audition_files");
        assert!(request.is_multipart());

        let text_only = SubmissionRequest::new("full_name", "Ali Asgar");
        assert!(!text_only.is_multipart());
        assert!(text_only.as_multipart().is_multipart());
    }

    #[test]
    fn test_to_json_folds_repeated_fields() {
        let request = SubmissionRequest::new("its_number", "30412345")
            .with_field("preference", "AZAAN")
            .with_field("preference", "TAKHBIRA")
            .with_field("email", "a@b.org");

        let json = request.to_json();
        assert_eq!(json["its_number"], "30412345");
        assert_eq!(json["preference"], serde_json::json!(["AZAAN", "TAKHBIRA"]));
        assert_eq!(json["email"], "a@b.org");
    }

    #[test]
    fn test_total_attachment_bytes() {
        let request = SubmissionRequest::new("its_number", "1")
            .with_attachment(Attachment::new("a.mp3", "audio/mpeg", vec![0; 10]))
            .with_attachment(Attachment::new("b.mp4", "video/mp4", vec![0; 32]));
        assert_eq!(request.total_attachment_bytes(), 42);
    }

    #[test]
    fn test_ambiguous_outcomes() {
        assert!(SubmissionOutcome::ServerError { status: 503 }.is_ambiguous());
        assert!(SubmissionOutcome::NetworkFailure {
            reason: "refused".to_string()
        }
        .is_ambiguous());
        assert!(!SubmissionOutcome::Success {
            confirmation: Confirmation::Direct { status: 201 }
        }
        .is_ambiguous());
    }
}
