//! Per-call deadlines for provider calls.

use super::{CompletionProvider, GenerationOptions, RetrievalProvider};
use crate::core::Information;
use crate::errors::ProviderError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

fn after_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Fails a completion call that outlives its deadline.
pub struct DeadlineCompletion {
    inner: Arc<dyn CompletionProvider>,
    timeout: Duration,
    label: String,
}

impl DeadlineCompletion {
    /// Wraps `inner`; `label` names the backend in timeout errors.
    #[must_use]
    pub fn new(inner: Arc<dyn CompletionProvider>, timeout: Duration, label: impl Into<String>) -> Self {
        Self {
            inner,
            timeout,
            label: label.into(),
        }
    }
}

impl std::fmt::Debug for DeadlineCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineCompletion")
            .field("label", &self.label)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CompletionProvider for DeadlineCompletion {
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(prompt, options)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(provider = %self.label, timeout_ms = after_ms(self.timeout), "Completion call timed out");
                Err(ProviderError::timeout(self.label.clone(), after_ms(self.timeout)))
            }
        }
    }
}

/// Fails a retrieval call that outlives its deadline.
pub struct DeadlineRetrieval {
    inner: Arc<dyn RetrievalProvider>,
    timeout: Duration,
    label: String,
}

impl DeadlineRetrieval {
    /// Wraps `inner`; `label` names the backend in timeout errors.
    #[must_use]
    pub fn new(inner: Arc<dyn RetrievalProvider>, timeout: Duration, label: impl Into<String>) -> Self {
        Self {
            inner,
            timeout,
            label: label.into(),
        }
    }
}

impl std::fmt::Debug for DeadlineRetrieval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineRetrieval")
            .field("label", &self.label)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RetrievalProvider for DeadlineRetrieval {
    async fn retrieve(
        &self,
        queries: &[String],
        exclude_urls: &HashSet<String>,
    ) -> Result<Vec<Information>, ProviderError> {
        match tokio::time::timeout(self.timeout, self.inner.retrieve(queries, exclude_urls)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(provider = %self.label, timeout_ms = after_ms(self.timeout), "Retrieval call timed out");
                Err(ProviderError::timeout(self.label.clone(), after_ms(self.timeout)))
            }
        }
    }
}
