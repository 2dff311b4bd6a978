//! Admin-requested corrections.
//!
//! An admin flags one field of a registration and the registrant receives a
//! link with a token. The token resolves to the field name and the admin's
//! note; the registrant answers with a new value for that one field, or with
//! new audition files when the field is `audition_files`.

use crate::domain::model::{Attachment, SubmissionRequest};
use crate::domain::registration::validate_media_files;
use crate::utils::error::{Result, SubmitError};
use crate::utils::validation::{validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};

pub const AUDITION_FILES_FIELD: &str = "audition_files";
pub const DEFAULT_ADMIN_MESSAGE: &str = "Please correct the information below.";

/// What the token lookup returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionDetails {
    pub field_name: String,
    #[serde(default)]
    pub admin_message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl CorrectionDetails {
    pub fn wants_files(&self) -> bool {
        self.field_name == AUDITION_FILES_FIELD
    }

    pub fn is_resolved(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("RESOLVED"))
    }

    pub fn admin_message(&self) -> &str {
        self.admin_message
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(DEFAULT_ADMIN_MESSAGE)
    }

    /// `phone_number` becomes `Phone Number`.
    pub fn field_label(&self) -> String {
        self.field_name
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub enum CorrectionValue {
    Text(String),
    Files(Vec<Attachment>),
}

/// The registrant's answer to one correction link.
#[derive(Debug, Clone)]
pub struct CorrectionForm {
    pub token: String,
    pub field_name: String,
    pub value: CorrectionValue,
}

impl CorrectionForm {
    pub fn new(token: impl Into<String>, details: &CorrectionDetails, value: CorrectionValue) -> Self {
        Self {
            token: token.into(),
            field_name: details.field_name.clone(),
            value,
        }
    }

    /// Splits into the token and a multipart request carrying only the corrected field.
    pub fn into_parts(self) -> (String, SubmissionRequest) {
        let request = match self.value {
            CorrectionValue::Text(value) => {
                SubmissionRequest::new(self.field_name, value.trim()).as_multipart()
            }
            CorrectionValue::Files(files) => files.into_iter().fold(
                SubmissionRequest::attachments_only(self.field_name),
                SubmissionRequest::with_attachment,
            ),
        };
        (self.token, request)
    }
}

impl Validate for CorrectionForm {
    fn validate(&self) -> Result<()> {
        validate_correction_token(&self.token)?;
        validate_non_empty_string("field_name", &self.field_name)?;

        let wants_files = self.field_name == AUDITION_FILES_FIELD;
        match (&self.value, wants_files) {
            (CorrectionValue::Files(files), true) => validate_media_files(&self.field_name, files),
            (CorrectionValue::Text(value), false) => {
                validate_non_empty_string(&self.field_name, value)
            }
            (CorrectionValue::Text(_), true) => Err(SubmitError::FormValidationError {
                field: self.field_name.clone(),
                reason: "Please select at least one file".to_string(),
            }),
            (CorrectionValue::Files(_), false) => Err(SubmitError::FormValidationError {
                field: self.field_name.clone(),
                reason: "This correction expects a text value, not files".to_string(),
            }),
        }
    }
}

/// Tokens are UUIDs; anything else would be spliced into the URL path.
pub fn validate_correction_token(token: &str) -> Result<()> {
    validate_non_empty_string("token", token)?;
    if !token.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return Err(SubmitError::FormValidationError {
            field: "token".to_string(),
            reason: format!("'{}' is not a valid correction token", token),
        });
    }
    Ok(())
}

/// `<base>/<action>/<token>/`, e.g. `/api/corrections/resolve/<token>/`.
pub fn correction_url(base: &str, action: &str, token: &str) -> String {
    format!("{}/{}/{}/", base.trim_end_matches('/'), action, token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "5f0c6a9e-3b1d-4c2e-9a7f-1d2e3f4a5b6c";

    fn details(field_name: &str) -> CorrectionDetails {
        CorrectionDetails {
            field_name: field_name.to_string(),
            admin_message: Some("Please fix your name spelling.".to_string()),
            status: Some("PENDING".to_string()),
        }
    }

    #[test]
    fn test_details_helpers() {
        let parsed: CorrectionDetails =
            serde_json::from_str(r#"{"field_name": "phone_number", "admin_message": ""}"#).unwrap();
        assert_eq!(parsed.field_label(), "Phone Number");
        assert_eq!(parsed.admin_message(), DEFAULT_ADMIN_MESSAGE);
        assert!(!parsed.wants_files());
        assert!(!parsed.is_resolved());

        let files = details(AUDITION_FILES_FIELD);
        assert!(files.wants_files());
        assert_eq!(files.field_label(), "Audition Files");
    }

    #[test]
    fn test_text_correction_becomes_single_field_multipart() {
        let form = CorrectionForm::new(
            TOKEN,
            &details("full_name"),
            CorrectionValue::Text("  Ali Asgar Husain ".to_string()),
        );
        assert!(form.validate().is_ok());

        let (token, request) = form.into_parts();
        assert_eq!(token, TOKEN);
        assert_eq!(request.key_field(), "full_name");
        assert_eq!(request.key(), "Ali Asgar Husain");
        assert!(request.is_multipart());
        assert_eq!(request.form_fields().count(), 1);
    }

    #[test]
    fn test_file_correction_sends_only_files() {
        let form = CorrectionForm::new(
            TOKEN,
            &details(AUDITION_FILES_FIELD),
            CorrectionValue::Files(vec![Attachment::new("take2.mp3", "audio/mpeg", vec![1, 2])]),
        );
        assert!(form.validate().is_ok());

        let (_, request) = form.into_parts();
        assert_eq!(request.attachment_field(), AUDITION_FILES_FIELD);
        assert_eq!(request.attachments().len(), 1);
        assert_eq!(request.form_fields().count(), 0);
    }

    #[test]
    fn test_value_must_match_field_kind() {
        let blank = CorrectionForm::new(TOKEN, &details("email"), CorrectionValue::Text("  ".into()));
        assert!(blank.validate().is_err());

        let text_for_files = CorrectionForm::new(
            TOKEN,
            &details(AUDITION_FILES_FIELD),
            CorrectionValue::Text("take2.mp3".into()),
        );
        assert!(text_for_files.validate().is_err());

        let files_for_text = CorrectionForm::new(
            TOKEN,
            &details("email"),
            CorrectionValue::Files(vec![Attachment::new("a.mp3", "audio/mpeg", vec![1])]),
        );
        assert!(files_for_text.validate().is_err());

        let no_files = CorrectionForm::new(
            TOKEN,
            &details(AUDITION_FILES_FIELD),
            CorrectionValue::Files(Vec::new()),
        );
        assert!(no_files.validate().is_err());
    }

    #[test]
    fn test_token_shape() {
        assert!(validate_correction_token(TOKEN).is_ok());
        assert!(validate_correction_token("").is_err());
        assert!(validate_correction_token("../registrations").is_err());
        assert_eq!(
            correction_url("http://api.test/api/corrections/", "resolve", TOKEN),
            format!("http://api.test/api/corrections/resolve/{}/", TOKEN)
        );
    }
}
