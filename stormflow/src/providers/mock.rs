//! Deterministic in-process providers.
//!
//! Used when no real backend is configured, and throughout the tests.

use super::{CompletionProvider, GenerationOptions, RetrievalProvider};
use crate::core::{slugify, Information};
use crate::errors::ProviderError;
use crate::stages::prompts::{
    self, TASK_DRAFT_SECTION, TASK_GENERATE_QUERIES, TASK_OUTLINE, TASK_POLISH,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const FACETS: [&str; 6] = [
    "overview",
    "history",
    "applications",
    "challenges",
    "future",
    "notable examples",
];
const QUERIES_PER_TURN: usize = 3;
const TASKS: [&str; 4] = [TASK_GENERATE_QUERIES, TASK_OUTLINE, TASK_DRAFT_SECTION, TASK_POLISH];

/// Mock LLM provider that recognises each stage's prompt.
///
/// Query generation yields fresh queries for two turns and then repeats
/// itself, so default runs end curation early.
///
/// Only counters are updated per call. Prompt text is kept only after
/// [`MockLLMProvider::recording`].
#[derive(Debug, Default)]
pub struct MockLLMProvider {
    overrides: Vec<(String, String)>,
    failures: Vec<(String, String)>,
    latency_ms: u64,
    call_count: AtomicUsize,
    task_calls: [AtomicUsize; 4],
    record_prompts: bool,
    prompts: RwLock<Vec<String>>,
}

impl MockLLMProvider {
    /// Creates a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `response` to any prompt containing `pattern`.
    #[must_use]
    pub fn with_response(mut self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.overrides.push((pattern.into(), response.into()));
        self
    }

    /// Fails any prompt containing `pattern` with `message`.
    #[must_use]
    pub fn fail_when(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.push((pattern.into(), message.into()));
        self
    }

    /// Sleeps before every answer.
    #[must_use]
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Keeps every prompt for [`MockLLMProvider::prompts`].
    #[must_use]
    pub fn recording(mut self) -> Self {
        self.record_prompts = true;
        self
    }

    /// Returns the call count.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Returns every prompt received, in order. Empty unless recording.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().clone()
    }

    /// Returns how many received prompts carried the task `header`.
    #[must_use]
    pub fn calls_for(&self, header: &str) -> usize {
        TASKS
            .iter()
            .position(|task| *task == header)
            .map_or(0, |i| self.task_calls[i].load(Ordering::SeqCst))
    }

    fn scripted(prompt: &str) -> String {
        let topic = prompts::field(prompt, "Topic").unwrap_or("the topic");
        let header = prompt.lines().next().unwrap_or_default();

        match header {
            TASK_GENERATE_QUERIES => {
                let turn: usize = prompts::field(prompt, "Turn")
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(1);
                let start = (turn.saturating_sub(1) * QUERIES_PER_TURN) % FACETS.len();
                FACETS[start..start + QUERIES_PER_TURN]
                    .iter()
                    .map(|facet| format!("{topic} {facet}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            TASK_OUTLINE => format!(
                "# {topic}\n## Overview\n## History\n### Origins\n## Applications\n## Challenges"
            ),
            TASK_DRAFT_SECTION => {
                let section = prompts::field(prompt, "Section").unwrap_or("This section");
                format!(
                    "{section} is an important aspect of {topic}. Researchers have \
                     documented it across many sources, and it continues to shape \
                     how {topic} is understood today."
                )
            }
            TASK_POLISH => {
                let body = prompts::draft_body(prompt).unwrap_or_default();
                format!("{topic} is a subject with a rich background and wide influence.\n\n{body}")
            }
            _ => "Mock response".to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for MockLLMProvider {
    async fn complete(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let header = prompt.lines().next().unwrap_or_default();
        if let Some(i) = TASKS.iter().position(|task| *task == header) {
            self.task_calls[i].fetch_add(1, Ordering::SeqCst);
        }
        if self.record_prompts {
            self.prompts.write().push(prompt.to_string());
        }

        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }

        if let Some((_, message)) = self.failures.iter().find(|(p, _)| prompt.contains(p.as_str())) {
            return Err(ProviderError::other(message.clone()));
        }
        if let Some((_, response)) = self.overrides.iter().find(|(p, _)| prompt.contains(p.as_str())) {
            return Ok(response.clone());
        }
        Ok(Self::scripted(prompt))
    }
}

/// Mock retriever yielding one record per query.
///
/// Each query `q` maps to `https://example.com/<slug of q>` with a single
/// snippet about `q`. Queries are kept only after
/// [`MockRetriever::recording`].
#[derive(Debug)]
pub struct MockRetriever {
    shared_url: Option<String>,
    respect_exclusions: bool,
    empty_snippets: bool,
    failure: Option<String>,
    latency_ms: u64,
    call_count: AtomicUsize,
    record_queries: bool,
    queries: RwLock<Vec<String>>,
}

impl Default for MockRetriever {
    fn default() -> Self {
        Self {
            shared_url: None,
            respect_exclusions: true,
            empty_snippets: false,
            failure: None,
            latency_ms: 0,
            call_count: AtomicUsize::new(0),
            record_queries: false,
            queries: RwLock::new(Vec::new()),
        }
    }
}

impl MockRetriever {
    /// Creates a new mock retriever.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snippet produced for `query`.
    #[must_use]
    pub fn snippet_for(query: &str) -> String {
        format!("{query} is a well-known concept with broad implications in the modern world.")
    }

    /// URL produced for `query`.
    #[must_use]
    pub fn url_for(query: &str) -> String {
        format!("https://example.com/{}", slugify(query))
    }

    /// Additionally returns `url` for every query, so results overlap.
    #[must_use]
    pub fn with_shared_url(mut self, url: impl Into<String>) -> Self {
        self.shared_url = Some(url.into());
        self
    }

    /// Returns excluded URLs anyway.
    #[must_use]
    pub fn ignoring_exclusions(mut self) -> Self {
        self.respect_exclusions = false;
        self
    }

    /// Returns records without snippets.
    #[must_use]
    pub fn with_empty_snippets(mut self) -> Self {
        self.empty_snippets = true;
        self
    }

    /// Fails every call with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleeps before every answer.
    #[must_use]
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Keeps every query for [`MockRetriever::queries`].
    #[must_use]
    pub fn recording(mut self) -> Self {
        self.record_queries = true;
        self
    }

    /// Returns the call count.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Returns every query received, in call order. Empty unless recording.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.read().clone()
    }

    fn record(&self, url: String, snippet: String) -> Information {
        let snippets = if self.empty_snippets {
            Vec::new()
        } else {
            vec![snippet]
        };
        Information::new(url, snippets)
    }
}

#[async_trait]
impl RetrievalProvider for MockRetriever {
    async fn retrieve(
        &self,
        queries: &[String],
        exclude_urls: &HashSet<String>,
    ) -> Result<Vec<Information>, ProviderError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.record_queries {
            self.queries.write().extend(queries.iter().cloned());
        }

        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        if let Some(message) = &self.failure {
            return Err(ProviderError::Request {
                provider: "mock-retriever".to_string(),
                message: message.clone(),
            });
        }

        let mut records = Vec::new();
        for query in queries {
            records.push(self.record(Self::url_for(query), Self::snippet_for(query)));
            if let Some(shared) = &self.shared_url {
                records.push(self.record(shared.clone(), format!("Shared background on {query}.")));
            }
        }
        if self.respect_exclusions {
            records.retain(|r| !exclude_urls.contains(&r.source_url));
        }
        Ok(records)
    }
}
