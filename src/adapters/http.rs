//! reqwest-backed implementation of [`HttpTransport`].

use crate::core::progress::{ProgressSink, ProgressTracker, UPLOAD_CHUNK_SIZE};
use crate::core::{HttpResponse, HttpTransport, SubmissionRequest};
use crate::utils::error::{Result, SubmitError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    bearer_token: Option<String>,
    chunk_size: usize,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            bearer_token: None,
            chunk_size: UPLOAD_CHUNK_SIZE,
        }
    }

    /// Token supplied by the caller. It is sent as-is and never refreshed here.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.bearer_token = (!token.trim().is_empty()).then_some(token);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn build_form(
        &self,
        request: &SubmissionRequest,
        progress: Option<&ProgressSink>,
    ) -> Result<Form> {
        let mut form = Form::new();
        for (name, value) in request.form_fields() {
            form = form.text(name.to_string(), value.to_string());
        }

        let tracker = progress
            .map(|sink| ProgressTracker::new(sink.clone(), request.total_attachment_bytes()));

        for attachment in request.attachments() {
            let body = match &tracker {
                Some(tracker) => {
                    Body::wrap_stream(tracker.track(attachment.data.clone(), self.chunk_size))
                }
                None => Body::from(attachment.data.clone()),
            };
            let part = Part::stream_with_length(body, attachment.len())
                .file_name(attachment.file_name.clone())
                .mime_str(&attachment.content_type)
                .map_err(|e| SubmitError::RequestBuildError {
                    message: format!(
                        "invalid content type {:?} for {}: {}",
                        attachment.content_type, attachment.file_name, e
                    ),
                })?;
            form = form.part(request.attachment_field().to_string(), part);
        }

        Ok(form)
    }

    async fn execute(&self, builder: RequestBuilder, url: &str) -> Result<HttpResponse> {
        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                tracing::error!(url = %url, error = %e, "HTTP request could not be built");
                return SubmitError::RequestBuildError {
                    message: e.to_string(),
                };
            }
            tracing::error!(url = %url, error = %e, "HTTP request failed");
            SubmitError::HttpError(e)
        })?;

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    url = %url,
                    status,
                    error = %e,
                    "Response body could not be read, classifying on status alone"
                );
                String::new()
            }
        };

        tracing::debug!(
            url = %url,
            status,
            response_len = body.len(),
            "HTTP request completed"
        );

        Ok(HttpResponse { status, body })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send_submission(
        &self,
        endpoint: &str,
        request: &SubmissionRequest,
        timeout: Duration,
        progress: Option<&ProgressSink>,
    ) -> Result<HttpResponse> {
        let body = if request.is_multipart() {
            Some(self.build_form(request, progress)?)
        } else {
            None
        };

        let builder = self.authorize(self.client.post(endpoint).timeout(timeout));
        let builder = match body {
            Some(form) => builder.multipart(form),
            None => {
                tracing::trace!("No attachments, sending JSON body");
                builder.json(&request.to_json())
            }
        };

        self.execute(builder, endpoint).await.map_err(|e| match e {
            SubmitError::HttpError(inner) if inner.is_timeout() => SubmitError::TimeoutError(timeout),
            other => other,
        })
    }

    async fn check_exists(
        &self,
        endpoint: &str,
        key_param: &str,
        key: &str,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let builder = self
            .client
            .get(endpoint)
            .query(&[(key_param, key)])
            .timeout(timeout);

        self.execute(self.authorize(builder), endpoint).await
    }

    async fn fetch(&self, endpoint: &str, timeout: Duration) -> Result<HttpResponse> {
        let builder = self.client.get(endpoint).timeout(timeout);
        self.execute(self.authorize(builder), endpoint).await
    }
}
