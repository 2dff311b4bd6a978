use crate::core::{HttpTransport, PollPolicy, PollRecord, PollResult};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

/// What a verification run observed.
#[derive(Debug, Clone, Default)]
pub struct Verification {
    pub records: Vec<PollRecord>,
    /// 1-based attempt that returned `Found`.
    pub found_at: Option<u32>,
    pub cancelled: bool,
}

/// Sequential existence checks against the lookup endpoint.
///
/// Attempts run strictly one after another with `policy.interval` between the
/// end of one and the start of the next. The first `Found` ends the run.
pub struct VerificationPoller<'a, T: HttpTransport + ?Sized> {
    transport: &'a T,
    endpoint: String,
    key_param: String,
    policy: PollPolicy,
}

impl<'a, T: HttpTransport + ?Sized> VerificationPoller<'a, T> {
    pub fn new(
        transport: &'a T,
        endpoint: impl Into<String>,
        key_param: impl Into<String>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            key_param: key_param.into(),
            policy,
        }
    }

    pub async fn run(&self, key: &str, cancel: &CancellationToken) -> Verification {
        let mut verification = Verification::default();

        if key.trim().is_empty() {
            tracing::warn!("No natural key to verify, skipping verification polling");
            return verification;
        }

        for attempt in 1..=self.policy.attempts {
            if attempt > 1 {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        verification.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.policy.interval) => {}
                }
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    verification.cancelled = true;
                    break;
                }
                result = self.check_once(key, attempt) => result,
            };

            let found = result == PollResult::Found;
            verification.records.push(PollRecord {
                attempt,
                result,
                at: Utc::now(),
            });

            if found {
                verification.found_at = Some(attempt);
                break;
            }
        }

        if verification.cancelled {
            tracing::info!(
                its_number = %key,
                attempts = verification.records.len(),
                "Verification polling cancelled"
            );
        }

        verification
    }

    /// One existence check. Never fails; anything not definitive is `Inconclusive`.
    pub async fn check_once(&self, key: &str, attempt: u32) -> PollResult {
        let lookup = self.transport.check_exists(
            &self.endpoint,
            &self.key_param,
            key,
            self.policy.timeout,
        );

        match tokio::time::timeout(self.policy.timeout, lookup).await {
            Ok(Ok(response)) => match response.status {
                200 => {
                    tracing::info!(its_number = %key, attempt, "Verification poll found the record");
                    PollResult::Found
                }
                404 => {
                    tracing::debug!(its_number = %key, attempt, "Record not found yet");
                    PollResult::NotFound
                }
                status => {
                    tracing::warn!(
                        its_number = %key,
                        attempt,
                        status,
                        "Unexpected status during verification poll"
                    );
                    PollResult::Inconclusive(format!("unexpected status {}", status))
                }
            },
            Ok(Err(e)) => {
                tracing::warn!(its_number = %key, attempt, error = %e, "Verification poll attempt failed");
                PollResult::Inconclusive(e.to_string())
            }
            Err(_) => {
                tracing::warn!(
                    its_number = %key,
                    attempt,
                    timeout_ms = self.policy.timeout.as_millis() as u64,
                    "Verification poll attempt timed out"
                );
                PollResult::Inconclusive(format!("timed out after {:?}", self.policy.timeout))
            }
        }
    }
}
