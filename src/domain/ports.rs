use crate::core::progress::ProgressSink;
use crate::domain::model::{PollPolicy, SubmissionRequest};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Status and buffered body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The request-sending capability the submission client runs on.
///
/// Implementations return `Err` for transport-level failures (connection
/// refused, DNS, timeout) and for requests that could not be built, which must
/// be reported as `SubmitError::RequestBuildError` without touching the network.
/// Any status code the server sent comes back as `Ok`, even when the body
/// could not be read.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the create request. Called at most once per submission.
    async fn send_submission(
        &self,
        endpoint: &str,
        request: &SubmissionRequest,
        timeout: Duration,
        progress: Option<&ProgressSink>,
    ) -> Result<HttpResponse>;

    /// Read-only lookup of `key` on the existence endpoint.
    async fn check_exists(
        &self,
        endpoint: &str,
        key_param: &str,
        key: &str,
        timeout: Duration,
    ) -> Result<HttpResponse>;

    /// Plain GET of `endpoint`, used for token lookups.
    async fn fetch(&self, endpoint: &str, timeout: Duration) -> Result<HttpResponse>;
}

pub trait ConfigProvider: Send + Sync {
    fn submit_endpoint(&self) -> String;
    fn lookup_endpoint(&self) -> String;
    /// Base of the correction endpoints; `token/<t>/` and `resolve/<t>/` hang off it.
    fn correction_endpoint(&self) -> String;
    fn key_param(&self) -> &str;
    fn submission_timeout(&self) -> Duration;
    fn poll_policy(&self) -> PollPolicy;

    fn bearer_token(&self) -> Option<&str> {
        None
    }
}
