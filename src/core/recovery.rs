use crate::core::poll::VerificationPoller;
use crate::core::progress::ProgressSink;
use crate::core::{
    ConfigProvider, Confirmation, HttpResponse, HttpTransport, SubmissionOutcome,
    SubmissionReport, SubmissionRequest, WriteAttempt,
};
use crate::domain::api_error::{duplicate_message, ApiErrorBody};
use crate::utils::error::{Result, SubmitError};
use chrono::Utc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a write could not be classified from its response alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmbiguousCause {
    /// The server answered with a status that may hide a landed write (5xx and friends).
    Status(u16),
    /// No usable response: connection error, DNS failure or timeout.
    Transport(String),
}

impl AmbiguousCause {
    pub fn into_outcome(self) -> SubmissionOutcome {
        match self {
            AmbiguousCause::Status(status) => SubmissionOutcome::ServerError { status },
            AmbiguousCause::Transport(reason) => SubmissionOutcome::NetworkFailure { reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteClassification {
    Resolved(SubmissionOutcome),
    Ambiguous(AmbiguousCause),
}

/// Maps the write response to an outcome, or marks it for verification.
pub fn classify_response(response: &HttpResponse, key_field: &str) -> WriteClassification {
    match response.status {
        200..=299 => WriteClassification::Resolved(SubmissionOutcome::Success {
            confirmation: Confirmation::Direct {
                status: response.status,
            },
        }),
        400..=499 => {
            let errors = ApiErrorBody::parse(&response.body);
            let outcome = match duplicate_message(&errors, key_field) {
                Some(message) => SubmissionOutcome::AlreadyExists { message },
                None => SubmissionOutcome::ValidationError {
                    status: response.status,
                    errors,
                },
            };
            WriteClassification::Resolved(outcome)
        }
        status => WriteClassification::Ambiguous(AmbiguousCause::Status(status)),
    }
}

/// Classifies a write that was sent. Requests rejected before sending
/// (`SubmitError::is_unsent`) never reach this point.
pub fn classify_write(result: &Result<HttpResponse>, key_field: &str) -> WriteClassification {
    match result {
        Ok(response) => classify_response(response, key_field),
        Err(e) => WriteClassification::Ambiguous(AmbiguousCause::Transport(e.to_string())),
    }
}

/// Submits one payload and resolves it to exactly one outcome.
///
/// The write is sent once and never retried. When its result is ambiguous the
/// client only verifies through the read-only lookup endpoint. The only error
/// `submit` returns is a request the transport refused to build, in which case
/// nothing was sent and nothing is polled.
pub struct SubmissionClient<T: HttpTransport, C: ConfigProvider> {
    transport: T,
    config: C,
}

impl<T: HttpTransport, C: ConfigProvider> SubmissionClient<T, C> {
    pub fn new(transport: T, config: C) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    pub async fn submit(
        &self,
        request: &SubmissionRequest,
        cancel: &CancellationToken,
    ) -> Result<SubmissionReport> {
        self.submit_with_progress(request, None, cancel).await
    }

    #[tracing::instrument(skip_all, fields(its_number = %request.key()))]
    pub async fn submit_with_progress(
        &self,
        request: &SubmissionRequest,
        progress: Option<&ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<SubmissionReport> {
        let endpoint = self.config.submit_endpoint();
        let timeout = self.config.submission_timeout();
        let submitted_at = Utc::now();

        tracing::info!(
            endpoint = %endpoint,
            attachments = request.attachments().len(),
            bytes = request.total_attachment_bytes(),
            "Submitting registration"
        );

        let started = Instant::now();
        let send = self
            .transport
            .send_submission(&endpoint, request, timeout, progress);
        let result = match tokio::time::timeout(timeout, send).await {
            Ok(Err(e)) if e.is_unsent() => {
                tracing::error!(error = %e, "Submission was not sent");
                return Err(e);
            }
            Ok(result) => result,
            Err(_) => Err(SubmitError::TimeoutError(timeout)),
        };
        let write = WriteAttempt {
            status: result.as_ref().ok().map(|r| r.status),
            error: result.as_ref().err().map(ToString::to_string),
            elapsed: started.elapsed(),
        };

        let (outcome, polls, cancelled) = match classify_write(&result, request.key_field()) {
            WriteClassification::Resolved(outcome) => {
                tracing::info!(
                    outcome = outcome.label(),
                    status = write.status,
                    "Submission resolved without verification"
                );
                (outcome, Vec::new(), false)
            }
            WriteClassification::Ambiguous(cause) => {
                tracing::warn!(
                    cause = ?cause,
                    "Submission outcome is ambiguous, verifying with the lookup endpoint"
                );

                let poller = VerificationPoller::new(
                    &self.transport,
                    self.config.lookup_endpoint(),
                    self.config.key_param(),
                    self.config.poll_policy(),
                );
                let verification = poller.run(request.key(), cancel).await;

                let outcome = match verification.found_at {
                    Some(attempt) => SubmissionOutcome::Success {
                        confirmation: Confirmation::Verified { attempt },
                    },
                    None => {
                        let outcome = cause.into_outcome();
                        tracing::error!(
                            outcome = outcome.label(),
                            polls = verification.records.len(),
                            "Submission could not be verified"
                        );
                        outcome
                    }
                };
                (outcome, verification.records, verification.cancelled)
            }
        };

        Ok(SubmissionReport {
            key: request.key().to_string(),
            outcome,
            write,
            polls,
            cancelled,
            submitted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_success_statuses() {
        for status in [200, 201, 204] {
            let classified = classify_response(&HttpResponse::new(status, ""), "its_number");
            assert_eq!(
                classified,
                WriteClassification::Resolved(SubmissionOutcome::Success {
                    confirmation: Confirmation::Direct { status }
                })
            );
        }
    }

    #[test]
    fn test_classify_duplicate() {
        let response = HttpResponse::new(400, r#"{"its_number": ["this its number already exists"]}"#);
        assert_eq!(
            classify_response(&response, "its_number"),
            WriteClassification::Resolved(SubmissionOutcome::AlreadyExists {
                message: "this its number already exists".to_string()
            })
        );
    }

    #[test]
    fn test_classify_validation_error_keeps_fields() {
        let response = HttpResponse::new(400, r#"{"email": ["invalid"]}"#);
        match classify_response(&response, "its_number") {
            WriteClassification::Resolved(SubmissionOutcome::ValidationError { status, errors }) => {
                assert_eq!(status, 400);
                assert_eq!(errors.errors_for("email")[0].message, "invalid");
            }
            other => panic!("unexpected classification: {:?}", other),
        }

        let response = HttpResponse::new(403, "Forbidden");
        assert!(matches!(
            classify_response(&response, "its_number"),
            WriteClassification::Resolved(SubmissionOutcome::ValidationError { status: 403, .. })
        ));
    }

    #[test]
    fn test_classify_ambiguous() {
        assert_eq!(
            classify_response(&HttpResponse::new(503, "unavailable"), "its_number"),
            WriteClassification::Ambiguous(AmbiguousCause::Status(503))
        );
        assert_eq!(
            classify_response(&HttpResponse::new(302, ""), "its_number"),
            WriteClassification::Ambiguous(AmbiguousCause::Status(302))
        );

        let failed: Result<HttpResponse> = Err(SubmitError::ConnectionError {
            message: "connection refused".to_string(),
        });
        assert!(matches!(
            classify_write(&failed, "its_number"),
            WriteClassification::Ambiguous(AmbiguousCause::Transport(_))
        ));
    }

    #[test]
    fn test_cause_keeps_original_classification() {
        assert_eq!(
            AmbiguousCause::Status(502).into_outcome(),
            SubmissionOutcome::ServerError { status: 502 }
        );
        assert!(matches!(
            AmbiguousCause::Transport("dns".to_string()).into_outcome(),
            SubmissionOutcome::NetworkFailure { .. }
        ));
    }
}
