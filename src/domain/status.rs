use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of a successful lookup on the registration search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationStatus {
    pub full_name: String,
    pub its_number: String,
    #[serde(default)]
    pub register_for: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub duties: Vec<DutySummary>,
    #[serde(default)]
    pub audition_files: Vec<AuditionFileSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutySummary {
    pub id: i64,
    /// `dd/mm/YYYY` as sent by the API.
    pub date: String,
    pub namaaz: String,
    #[serde(rename = "type", default)]
    pub duty_type: String,
    #[serde(default)]
    pub request_status: Option<String>,
    #[serde(default)]
    pub request_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditionFileSummary {
    pub id: i64,
    pub url: String,
    #[serde(rename = "type", default)]
    pub file_type: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    Rejected,
    Confirmed,
    PendingReview,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusLabel::Rejected => "Rejected",
            StatusLabel::Confirmed => "Confirmed",
            StatusLabel::PendingReview => "Pending Review",
        })
    }
}

impl RegistrationStatus {
    pub fn label(&self) -> StatusLabel {
        if self.status.eq_ignore_ascii_case("REJECTED") {
            StatusLabel::Rejected
        } else if !self.duties.is_empty() {
            StatusLabel::Confirmed
        } else {
            StatusLabel::PendingReview
        }
    }

    pub fn has_pending_request(&self) -> bool {
        self.duties
            .iter()
            .any(|d| d.request_status.as_deref() == Some("pending"))
    }
}
