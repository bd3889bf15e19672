//! Completion and retrieval capabilities.
//!
//! Stages talk to the outside world only through [`CompletionProvider`] and
//! [`RetrievalProvider`]. Concrete backends are chosen once, at construction,
//! by [`build_providers`] and shared by every run.

mod completion;
mod deadline;
mod mock;
mod retrieval;
mod retry;

#[cfg(feature = "http")]
mod gemini;
#[cfg(feature = "http")]
mod searxng;

pub use completion::{CompletionProvider, GenerationOptions};
pub use deadline::{DeadlineCompletion, DeadlineRetrieval};
pub use mock::{MockLLMProvider, MockRetriever};
pub use retrieval::RetrievalProvider;
pub use retry::{with_retry, BackoffStrategy, JitterStrategy, RetryConfig, RetryState, RetryingCompletion};

#[cfg(feature = "http")]
pub use gemini::{GeminiCompletionProvider, DEFAULT_GEMINI_BASE_URL};
#[cfg(feature = "http")]
pub use searxng::SearxngRetrievalProvider;

#[cfg(test)]
pub use completion::MockCompletionProvider;
#[cfg(test)]
pub use retrieval::MockRetrievalProvider;

use crate::config::{CompletionBackend, ProviderConfig, RetrievalBackend};
use crate::errors::PipelineError;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The provider pair a pipeline runs against.
#[derive(Clone)]
pub struct Providers {
    /// Text completion.
    pub completion: Arc<dyn CompletionProvider>,
    /// Source retrieval.
    pub retrieval: Arc<dyn RetrievalProvider>,
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers").finish_non_exhaustive()
    }
}

/// Builds the configured providers, wrapped with per-call deadlines and
/// completion retries.
///
/// `search_top_k` caps the hits a real search backend returns per query.
pub fn build_providers(config: &ProviderConfig, search_top_k: usize) -> Result<Providers, PipelineError> {
    let timeout = Duration::from_millis(config.call_timeout_ms);

    let (completion, completion_label): (Arc<dyn CompletionProvider>, &str) = match &config.completion {
        CompletionBackend::Mock => (Arc::new(MockLLMProvider::new()), "mock"),
        CompletionBackend::Gemini {
            model,
            api_key_env,
            base_url,
        } => (build_gemini(model, api_key_env, base_url.as_deref())?, "gemini"),
    };

    let (retrieval, retrieval_label): (Arc<dyn RetrievalProvider>, &str) = match &config.retrieval {
        RetrievalBackend::Mock => (Arc::new(MockRetriever::new()), "mock"),
        RetrievalBackend::Searxng { base_url } => (build_searxng(base_url, search_top_k)?, "searxng"),
    };

    info!(
        completion = completion_label,
        retrieval = retrieval_label,
        call_timeout_ms = config.call_timeout_ms,
        "Providers configured"
    );

    let completion: Arc<dyn CompletionProvider> =
        Arc::new(DeadlineCompletion::new(completion, timeout, completion_label));
    let completion: Arc<dyn CompletionProvider> = if config.retry.max_attempts > 1 {
        Arc::new(RetryingCompletion::new(completion, config.retry.clone(), completion_label))
    } else {
        completion
    };
    let retrieval: Arc<dyn RetrievalProvider> =
        Arc::new(DeadlineRetrieval::new(retrieval, timeout, retrieval_label));

    Ok(Providers {
        completion,
        retrieval,
    })
}

#[cfg(feature = "http")]
fn build_gemini(
    model: &str,
    api_key_env: &str,
    base_url: Option<&str>,
) -> Result<Arc<dyn CompletionProvider>, PipelineError> {
    let api_key = std::env::var(api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| PipelineError::Config(format!("{api_key_env} is not set")))?;
    let mut provider = GeminiCompletionProvider::new(model, api_key)?;
    if let Some(base_url) = base_url {
        provider = provider.with_base_url(base_url);
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "http"))]
fn build_gemini(
    _model: &str,
    _api_key_env: &str,
    _base_url: Option<&str>,
) -> Result<Arc<dyn CompletionProvider>, PipelineError> {
    Err(PipelineError::Config(
        "the Gemini backend requires the `http` feature".to_string(),
    ))
}

#[cfg(feature = "http")]
fn build_searxng(base_url: &str, top_k: usize) -> Result<Arc<dyn RetrievalProvider>, PipelineError> {
    Ok(Arc::new(SearxngRetrievalProvider::new(base_url, top_k)?))
}

#[cfg(not(feature = "http"))]
fn build_searxng(_base_url: &str, _top_k: usize) -> Result<Arc<dyn RetrievalProvider>, PipelineError> {
    Err(PipelineError::Config(
        "the SearXNG backend requires the `http` feature".to_string(),
    ))
}
