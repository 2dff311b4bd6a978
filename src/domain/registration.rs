use crate::domain::model::{Attachment, SubmissionRequest};
use crate::utils::error::{Result, SubmitError};
use crate::utils::validation::{validate_media_type, validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const KEY_FIELD: &str = "its_number";
pub const ATTACHMENT_FIELD: &str = "media_files";
pub const MAX_ATTACHMENTS: usize = 6;
pub const MAX_ATTACHMENT_BYTES: u64 = 15 * 1024 * 1024;
pub const MEDIA_TOP_LEVEL_TYPES: &[&str] = &["audio", "video"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Preference {
    Azaan,
    Takhbira,
    Both,
}

impl Preference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::Azaan => "AZAAN",
            Preference::Takhbira => "TAKHBIRA",
            Preference::Both => "BOTH",
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preference {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AZAAN" => Ok(Preference::Azaan),
            "TAKHBIRA" => Ok(Preference::Takhbira),
            "BOTH" => Ok(Preference::Both),
            other => Err(SubmitError::FormValidationError {
                field: "preference".to_string(),
                reason: format!("unknown option '{}', expected AZAAN, TAKHBIRA or BOTH", other),
            }),
        }
    }
}

/// The public registration form as the API's create endpoint expects it.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub full_name: String,
    pub its_number: String,
    pub email: String,
    pub phone_number: String,
    pub preferences: Vec<Preference>,
    pub media_files: Vec<Attachment>,
}

impl RegistrationForm {
    pub fn into_request(self) -> SubmissionRequest {
        let mut request = SubmissionRequest::new(KEY_FIELD, self.its_number.trim())
            .with_attachment_field(ATTACHMENT_FIELD)
            .with_field("full_name", self.full_name.trim())
            .with_field("email", self.email.trim())
            .with_field("phone_number", self.phone_number.trim());

        for preference in &self.preferences {
            request = request.with_field("preference", preference.as_str());
        }
        for file in self.media_files {
            request = request.with_attachment(file);
        }
        request
    }
}

/// Count, size and media-type checks for a set of audition files sent under `field`.
pub fn validate_media_files(field: &str, files: &[Attachment]) -> Result<()> {
    if files.is_empty() {
        return Err(SubmitError::FormValidationError {
            field: field.to_string(),
            reason: "At least one audition file is required".to_string(),
        });
    }

    if files.len() > MAX_ATTACHMENTS {
        return Err(SubmitError::FormValidationError {
            field: field.to_string(),
            reason: format!(
                "You can only upload a maximum of {} audition files",
                MAX_ATTACHMENTS
            ),
        });
    }

    let oversized: Vec<&str> = files
        .iter()
        .filter(|f| f.len() > MAX_ATTACHMENT_BYTES)
        .map(|f| f.file_name.as_str())
        .collect();
    if !oversized.is_empty() {
        return Err(SubmitError::FormValidationError {
            field: field.to_string(),
            reason: format!(
                "The following files exceed the 15MB limit: {}",
                oversized.join(", ")
            ),
        });
    }

    for file in files {
        validate_media_type(
            field,
            &file.file_name,
            &file.content_type,
            MEDIA_TOP_LEVEL_TYPES,
        )?;
    }

    Ok(())
}

impl Validate for RegistrationForm {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("full_name", &self.full_name)?;
        validate_non_empty_string(KEY_FIELD, &self.its_number)?;
        validate_non_empty_string("email", &self.email)?;
        validate_non_empty_string("phone_number", &self.phone_number)?;

        if self.preferences.is_empty() {
            return Err(SubmitError::FormValidationError {
                field: "preference".to_string(),
                reason: "Please select at least one option for \"Register For\"".to_string(),
            });
        }

        validate_media_files(ATTACHMENT_FIELD, &self.media_files)
    }
}
