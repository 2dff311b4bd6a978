use crate::core::progress::ProgressSink;
use crate::core::recovery::{classify_write, SubmissionClient, WriteClassification};
use crate::core::{ConfigProvider, Confirmation, HttpResponse, HttpTransport, SubmissionOutcome};
use crate::domain::api_error::ApiErrorBody;
use crate::domain::correction::{
    correction_url, validate_correction_token, CorrectionDetails, CorrectionForm,
};
use crate::utils::error::{Result, SubmitError};
use std::time::Duration;

impl<T: HttpTransport, C: ConfigProvider> SubmissionClient<T, C> {
    /// Loads the field and admin note behind a correction link. `None` when the
    /// API does not know the token.
    pub async fn fetch_correction(&self, token: &str) -> Result<Option<CorrectionDetails>> {
        validate_correction_token(token)?;

        let endpoint = correction_url(&self.config().correction_endpoint(), "token", token);
        let timeout = self.config().poll_policy().timeout;

        tracing::debug!(endpoint = %endpoint, "Fetching correction details");
        let response = self.fetch_with_timeout(&endpoint, timeout).await?;

        match response.status {
            200 => Ok(Some(serde_json::from_str(&response.body)?)),
            404 => Ok(None),
            status => {
                let errors = ApiErrorBody::parse(&response.body);
                tracing::warn!(status, errors = %errors.summary(), "Correction lookup refused");
                Err(SubmitError::UnexpectedStatusError { status, endpoint })
            }
        }
    }

    /// Sends one correction. Like `submit`, the write is never retried and a
    /// request the transport cannot build is returned as an error unsent.
    ///
    /// Corrections have no search endpoint, so an ambiguous write is checked
    /// with a single token lookup: a token the API reports as `RESOLVED` means
    /// the write landed.
    #[tracing::instrument(skip_all, fields(field = %form.field_name))]
    pub async fn resolve_correction(
        &self,
        form: CorrectionForm,
        progress: Option<&ProgressSink>,
    ) -> Result<SubmissionOutcome> {
        let (token, request) = form.into_parts();
        validate_correction_token(&token)?;

        let endpoint = correction_url(&self.config().correction_endpoint(), "resolve", &token);
        let timeout = self.config().submission_timeout();
        let field = match request.key_field() {
            "" => request.attachment_field(),
            key_field => key_field,
        };

        tracing::info!(endpoint = %endpoint, attachments = request.attachments().len(), "Submitting correction");

        let send = self
            .transport()
            .send_submission(&endpoint, &request, timeout, progress);
        let result = match tokio::time::timeout(timeout, send).await {
            Ok(Err(e)) if e.is_unsent() => {
                tracing::error!(error = %e, "Correction was not sent");
                return Err(e);
            }
            Ok(result) => result,
            Err(_) => Err(SubmitError::TimeoutError(timeout)),
        };

        let outcome = match classify_write(&result, field) {
            WriteClassification::Resolved(outcome) => outcome,
            WriteClassification::Ambiguous(cause) => {
                tracing::warn!(cause = ?cause, "Correction outcome is ambiguous, checking the token");
                match self.fetch_correction(&token).await {
                    Ok(Some(details)) if details.is_resolved() => SubmissionOutcome::Success {
                        confirmation: Confirmation::Verified { attempt: 1 },
                    },
                    Ok(_) => cause.into_outcome(),
                    Err(e) => {
                        tracing::warn!(error = %e, "Correction check failed");
                        cause.into_outcome()
                    }
                }
            }
        };

        tracing::info!(outcome = outcome.label(), "Correction finished");
        Ok(outcome)
    }

    async fn fetch_with_timeout(&self, endpoint: &str, timeout: Duration) -> Result<HttpResponse> {
        match tokio::time::timeout(timeout, self.transport().fetch(endpoint, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(SubmitError::TimeoutError(timeout)),
        }
    }
}
