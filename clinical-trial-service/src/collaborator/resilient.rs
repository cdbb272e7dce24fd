use async_trait::async_trait;
use std::future::Future;
use tracing::warn;

use super::Collaborator;
use crate::config::CallPolicy;
use crate::error::CollaboratorError;
use crate::models::{ProtocolFindings, QualityIssue, SafetyAlert};

/// Wraps a [`Collaborator`] with a per-call timeout and bounded retries.
///
/// Only transient failures are retried; a response that fails schema
/// validation is returned straight away.
pub struct ResilientCollaborator<C> {
    inner: C,
    policy: CallPolicy,
}

impl<C: Collaborator> ResilientCollaborator<C> {
    pub fn new(inner: C, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }

    async fn call<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt_call: F,
    ) -> Result<T, CollaboratorError>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, CollaboratorError>> + Send,
    {
        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.policy.timeout, attempt_call()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(CollaboratorError::Timeout {
                    after: self.policy.timeout,
                }),
            };

            match outcome {
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff_for(attempt);
                    attempt += 1;
                    warn!(
                        operation,
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "collaborator call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl<C: Collaborator> Collaborator for ResilientCollaborator<C> {
    async fn extract_protocol(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<ProtocolFindings, CollaboratorError> {
        self.call("extract_protocol", || self.inner.extract_protocol(system, prompt))
            .await
    }

    async fn extract_safety_alerts(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<Vec<SafetyAlert>, CollaboratorError> {
        self.call("extract_safety_alerts", || {
            self.inner.extract_safety_alerts(system, prompt)
        })
        .await
    }

    async fn extract_quality_issues(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<Vec<QualityIssue>, CollaboratorError> {
        self.call("extract_quality_issues", || {
            self.inner.extract_quality_issues(system, prompt)
        })
        .await
    }

    async fn generate_text(&self, system: &str, prompt: &str) -> Result<String, CollaboratorError> {
        self.call("generate_text", || self.inner.generate_text(system, prompt))
            .await
    }
}
