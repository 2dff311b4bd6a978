//! In-memory [`HttpTransport`] that replays scripted responses and records every call.
//!
//! Writes, lookups and fetches have separate queues. An exhausted write queue fails
//! with a connection error; exhausted lookup and fetch queues answer 404.

use crate::core::progress::ProgressSink;
use crate::core::{HttpResponse, HttpTransport, SubmissionRequest};
use crate::utils::error::{Result, SubmitError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum Scripted {
    Respond(HttpResponse),
    Fail(String),
    /// Refuse to build the request, as a transport does for malformed input.
    Reject(String),
    /// Wait before producing the inner reply. Long delays trip the caller's timeout.
    Delay(Duration, Box<Scripted>),
}

impl Scripted {
    pub fn status(status: u16) -> Self {
        Scripted::Respond(HttpResponse::new(status, ""))
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Scripted::Respond(HttpResponse::new(status, body.to_string()))
    }

    pub fn delayed(self, delay: Duration) -> Self {
        Scripted::Delay(delay, Box::new(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Write,
    Lookup,
    Fetch,
}

#[derive(Debug, Clone)]
pub struct TransportCall {
    pub kind: CallKind,
    pub endpoint: String,
    pub key: String,
    pub timeout: Duration,
    pub started: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    writes: Arc<Mutex<VecDeque<Scripted>>>,
    lookups: Arc<Mutex<VecDeque<Scripted>>>,
    fetches: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<TransportCall>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_write(&self, reply: Scripted) -> &Self {
        self.writes.lock().push_back(reply);
        self
    }

    pub fn push_lookup(&self, reply: Scripted) -> &Self {
        self.lookups.lock().push_back(reply);
        self
    }

    pub fn push_lookups(&self, replies: impl IntoIterator<Item = Scripted>) -> &Self {
        self.lookups.lock().extend(replies);
        self
    }

    pub fn push_fetch(&self, reply: Scripted) -> &Self {
        self.fetches.lock().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.count(CallKind::Write)
    }

    pub fn lookup_count(&self) -> usize {
        self.count(CallKind::Lookup)
    }

    pub fn fetch_count(&self) -> usize {
        self.count(CallKind::Fetch)
    }

    fn count(&self, kind: CallKind) -> usize {
        self.calls.lock().iter().filter(|c| c.kind == kind).count()
    }

    fn record(&self, kind: CallKind, endpoint: &str, key: &str, timeout: Duration) {
        self.calls.lock().push(TransportCall {
            kind,
            endpoint: endpoint.to_string(),
            key: key.to_string(),
            timeout,
            started: Instant::now(),
        });
    }

    async fn play(mut reply: Scripted) -> Result<HttpResponse> {
        loop {
            match reply {
                Scripted::Respond(response) => return Ok(response),
                Scripted::Fail(message) => return Err(SubmitError::ConnectionError { message }),
                Scripted::Reject(message) => {
                    return Err(SubmitError::RequestBuildError { message })
                }
                Scripted::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send_submission(
        &self,
        endpoint: &str,
        request: &SubmissionRequest,
        timeout: Duration,
        _progress: Option<&ProgressSink>,
    ) -> Result<HttpResponse> {
        self.record(CallKind::Write, endpoint, request.key(), timeout);
        let reply = self
            .writes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Scripted::Fail("no scripted write response".to_string()));
        Self::play(reply).await
    }

    async fn check_exists(
        &self,
        endpoint: &str,
        _key_param: &str,
        key: &str,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        self.record(CallKind::Lookup, endpoint, key, timeout);
        let reply = self
            .lookups
            .lock()
            .pop_front()
            .unwrap_or_else(|| Scripted::status(404));
        Self::play(reply).await
    }

    async fn fetch(&self, endpoint: &str, timeout: Duration) -> Result<HttpResponse> {
        self.record(CallKind::Fetch, endpoint, "", timeout);
        let reply = self
            .fetches
            .lock()
            .pop_front()
            .unwrap_or_else(|| Scripted::status(404));
        Self::play(reply).await
    }
}
