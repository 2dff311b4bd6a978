use crate::core::recovery::SubmissionClient;
use crate::core::{ConfigProvider, HttpTransport};
use crate::domain::status::RegistrationStatus;
use crate::utils::error::{Result, SubmitError};
use crate::utils::validation::validate_non_empty_string;

impl<T: HttpTransport, C: ConfigProvider> SubmissionClient<T, C> {
    /// Fetches the registration stored under `key`, `None` when the API has no record.
    pub async fn lookup_status(&self, key: &str) -> Result<Option<RegistrationStatus>> {
        validate_non_empty_string("its_number", key)?;

        let endpoint = self.config().lookup_endpoint();
        let timeout = self.config().poll_policy().timeout;

        tracing::debug!(endpoint = %endpoint, its_number = %key, "Looking up registration status");
        let response = match tokio::time::timeout(
            timeout,
            self.transport()
                .check_exists(&endpoint, self.config().key_param(), key.trim(), timeout),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(SubmitError::TimeoutError(timeout)),
        };

        match response.status {
            200 => Ok(Some(serde_json::from_str(&response.body)?)),
            404 => Ok(None),
            status => Err(SubmitError::UnexpectedStatusError { status, endpoint }),
        }
    }
}
