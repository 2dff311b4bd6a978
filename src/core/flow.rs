use crate::core::progress::ProgressSink;
use crate::core::recovery::SubmissionClient;
use crate::core::{ConfigProvider, HttpTransport, SubmissionOutcome, SubmissionReport, SubmissionRequest};
use crate::utils::error::{Result, SubmitError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub enum FlowPhase {
    #[default]
    Idle,
    InFlight,
    Finished(Box<SubmissionReport>),
}

/// Pending-flag state owned by whoever drives the form.
///
/// A second submission is refused while one is in flight, so one user action
/// maps to at most one write.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFlow {
    phase: FlowPhase,
}

impl SubmissionFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &FlowPhase {
        &self.phase
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, FlowPhase::InFlight)
    }

    /// Submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        match &self.phase {
            FlowPhase::Idle => true,
            FlowPhase::InFlight => false,
            FlowPhase::Finished(report) => !matches!(
                report.outcome,
                SubmissionOutcome::Success { .. } | SubmissionOutcome::AlreadyExists { .. }
            ),
        }
    }

    pub fn begin(&mut self) -> Result<()> {
        if self.is_pending() {
            tracing::warn!("Ignoring submit while another submission is in flight");
            return Err(SubmitError::AlreadyInFlight);
        }
        self.phase = FlowPhase::InFlight;
        Ok(())
    }

    pub fn finish(&mut self, report: SubmissionReport) -> &SubmissionReport {
        self.phase = FlowPhase::Finished(Box::new(report));
        match &self.phase {
            FlowPhase::Finished(report) => report,
            _ => unreachable!("phase was just set to Finished"),
        }
    }

    pub fn last_report(&self) -> Option<&SubmissionReport> {
        match &self.phase {
            FlowPhase::Finished(report) => Some(report),
            _ => None,
        }
    }

    /// Back to a blank form. Has no effect while a submission is in flight.
    pub fn reset(&mut self) {
        if !self.is_pending() {
            self.phase = FlowPhase::Idle;
        }
    }

    pub async fn run<T: HttpTransport, C: ConfigProvider>(
        &mut self,
        client: &SubmissionClient<T, C>,
        request: &SubmissionRequest,
        progress: Option<&ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<&SubmissionReport> {
        self.begin()?;
        match client.submit_with_progress(request, progress, cancel).await {
            Ok(report) => Ok(self.finish(report)),
            Err(e) => {
                // Nothing was sent, so the form stays editable.
                self.phase = FlowPhase::Idle;
                Err(e)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    ShowConfirmation,
    ShowFieldErrors,
    RetryLater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeVariant {
    Success,
    Info,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserNotice {
    pub variant: NoticeVariant,
    pub title: String,
    pub message: String,
}

impl SubmissionOutcome {
    pub fn next_step(&self) -> NextStep {
        match self {
            SubmissionOutcome::Success { .. } | SubmissionOutcome::AlreadyExists { .. } => {
                NextStep::ShowConfirmation
            }
            SubmissionOutcome::ValidationError { .. } => NextStep::ShowFieldErrors,
            SubmissionOutcome::ServerError { .. } | SubmissionOutcome::NetworkFailure { .. } => {
                NextStep::RetryLater
            }
        }
    }

    pub fn notice(&self) -> UserNotice {
        match self {
            SubmissionOutcome::Success { .. } => UserNotice {
                variant: NoticeVariant::Success,
                title: "Registration Submitted".to_string(),
                message: "Your registration has been received.".to_string(),
            },
            SubmissionOutcome::AlreadyExists { .. } => UserNotice {
                variant: NoticeVariant::Info,
                title: "Already Registered".to_string(),
                message: "You have already registered with this ITS number.".to_string(),
            },
            SubmissionOutcome::ValidationError { status, errors } => {
                let mut message = format!("Submission failed (Error {}).", status);
                if !errors.is_empty() {
                    message.push('\n');
                    message.push_str(&errors.summary());
                }
                UserNotice {
                    variant: NoticeVariant::Danger,
                    title: "Upload Failed".to_string(),
                    message,
                }
            }
            SubmissionOutcome::ServerError { status } => UserNotice {
                variant: NoticeVariant::Danger,
                title: "Upload Failed".to_string(),
                message: format!(
                    "Submission failed (Error {}). Please try again later.",
                    status
                ),
            },
            SubmissionOutcome::NetworkFailure { .. } => UserNotice {
                variant: NoticeVariant::Danger,
                title: "Upload Failed".to_string(),
                message: "Network error. Please check your connection.".to_string(),
            },
        }
    }
}
