//! Service configuration.
//!
//! Configuration is read from an optional JSON file, then overlaid with
//! environment variables, then validated. Every field has a default, so an
//! empty file (or none at all) yields a working mock-backed service.

use crate::errors::PipelineError;
use crate::providers::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-lite-001";

/// Default environment variable holding the Gemini API key.
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Knowledge-curation budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurationConfig {
    /// Maximum research turns.
    pub max_conv_turns: usize,
    /// Maximum search queries generated per turn.
    pub max_queries_per_turn: usize,
    /// Maximum records kept per query.
    pub search_top_k: usize,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            max_conv_turns: 3,
            max_queries_per_turn: 3,
            search_top_k: 5,
        }
    }
}

/// Pipeline behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Curation budget.
    pub curation: CurationConfig,
    /// Words per `ArticleChunk` event.
    pub article_chunk_words: usize,
    /// Write intermediate artifacts under `runs/<run_id>/`.
    pub persist_artifacts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            curation: CurationConfig::default(),
            article_chunk_words: 32,
            persist_artifacts: false,
        }
    }
}

impl PipelineConfig {
    /// Sets the curation budget.
    #[must_use]
    pub fn with_curation(mut self, curation: CurationConfig) -> Self {
        self.curation = curation;
        self
    }

    /// Sets the words per article chunk.
    #[must_use]
    pub fn with_article_chunk_words(mut self, words: usize) -> Self {
        self.article_chunk_words = words;
        self
    }

    /// Enables or disables artifact persistence.
    #[must_use]
    pub fn with_persist_artifacts(mut self, persist: bool) -> Self {
        self.persist_artifacts = persist;
        self
    }

    /// Checks that every budget is usable.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let checks = [
            ("curation.max_conv_turns", self.curation.max_conv_turns),
            ("curation.max_queries_per_turn", self.curation.max_queries_per_turn),
            ("curation.search_top_k", self.curation.search_top_k),
            ("article_chunk_words", self.article_chunk_words),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(PipelineError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

/// Which completion backend to use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum CompletionBackend {
    /// Deterministic in-process mock.
    #[default]
    Mock,
    /// Google Gemini.
    Gemini {
        /// Model name.
        #[serde(default = "default_model")]
        model: String,
        /// Environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        /// Endpoint override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
    },
}

impl CompletionBackend {
    /// Gemini with default model and key variable.
    #[must_use]
    pub fn gemini() -> Self {
        Self::Gemini {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
        }
    }
}

/// Which retrieval backend to use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum RetrievalBackend {
    /// Deterministic in-process mock.
    #[default]
    Mock,
    /// A SearXNG instance.
    Searxng {
        /// Instance base URL.
        base_url: String,
    },
}

/// Provider selection and call policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Completion backend.
    pub completion: CompletionBackend,
    /// Retrieval backend.
    pub retrieval: RetrievalBackend,
    /// Deadline for a single provider call.
    pub call_timeout_ms: u64,
    /// Retry policy for completion calls.
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            completion: CompletionBackend::Mock,
            retrieval: RetrievalBackend::Mock,
            call_timeout_ms: 60_000,
            retry: RetryConfig::default(),
        }
    }
}

/// Where artifacts and debug writes go.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileSystemConfig {
    /// Captured in memory; inspectable through the debug endpoint.
    #[default]
    InMemory,
    /// Written below `root` on disk.
    Real {
        /// Root directory.
        root: PathBuf,
    },
}

/// Streaming transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Pause between streamed words.
    pub word_delay_ms: u64,
    /// Final fragment of every stream.
    pub sentinel: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            word_delay_ms: 50,
            sentinel: "[DONE]".to_string(),
        }
    }
}

/// Complete configuration of the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Pipeline behaviour.
    pub pipeline: PipelineConfig,
    /// Provider selection.
    pub providers: ProviderConfig,
    /// File-system capability.
    pub file_system: FileSystemConfig,
    /// Streaming transport.
    pub stream: StreamConfig,
}

impl ServiceConfig {
    /// Loads from `path` (if any), overlays the process environment and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    PipelineError::Config(format!("failed to read {}: {e}", path.display()))
                })?;
                Self::from_json_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(raw).map_err(|e| PipelineError::Config(format!("invalid config: {e}")))
    }

    /// Overlays values found through `lookup`.
    ///
    /// Recognised variables: `STORMFLOW_COMPLETION` (`mock` or `gemini`),
    /// `GEMINI_API_KEY` (selects Gemini when `STORMFLOW_COMPLETION` is unset),
    /// `GEMINI_MODEL`, `SEARXNG_URL`, `STORMFLOW_FS_ROOT`,
    /// `STORMFLOW_PERSIST_ARTIFACTS`, `STORMFLOW_WORD_DELAY_MS` and
    /// `STORMFLOW_CALL_TIMEOUT_MS`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        match non_empty("STORMFLOW_COMPLETION").as_deref().map(str::trim) {
            Some("mock") => self.providers.completion = CompletionBackend::Mock,
            Some("gemini") => {
                if !matches!(self.providers.completion, CompletionBackend::Gemini { .. }) {
                    self.providers.completion = CompletionBackend::gemini();
                }
            }
            Some(other) => {
                return Err(PipelineError::Config(format!(
                    "STORMFLOW_COMPLETION must be 'mock' or 'gemini', got '{other}'"
                )));
            }
            None => {
                if non_empty(DEFAULT_API_KEY_ENV).is_some()
                    && self.providers.completion == CompletionBackend::Mock
                {
                    self.providers.completion = CompletionBackend::gemini();
                }
            }
        }

        if let Some(new_model) = non_empty("GEMINI_MODEL") {
            if let CompletionBackend::Gemini { model, .. } = &mut self.providers.completion {
                *model = new_model;
            }
        }
        if let Some(base_url) = non_empty("SEARXNG_URL") {
            self.providers.retrieval = RetrievalBackend::Searxng { base_url };
        }
        if let Some(root) = non_empty("STORMFLOW_FS_ROOT") {
            self.file_system = FileSystemConfig::Real {
                root: PathBuf::from(root),
            };
        }
        if let Some(raw) = non_empty("STORMFLOW_PERSIST_ARTIFACTS") {
            self.pipeline.persist_artifacts = parse_bool("STORMFLOW_PERSIST_ARTIFACTS", &raw)?;
        }
        if let Some(raw) = non_empty("STORMFLOW_WORD_DELAY_MS") {
            self.stream.word_delay_ms = parse_u64("STORMFLOW_WORD_DELAY_MS", &raw)?;
        }
        if let Some(raw) = non_empty("STORMFLOW_CALL_TIMEOUT_MS") {
            self.providers.call_timeout_ms = parse_u64("STORMFLOW_CALL_TIMEOUT_MS", &raw)?;
        }
        Ok(())
    }

    /// Checks the whole configuration.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.pipeline.validate()?;
        if self.providers.call_timeout_ms == 0 {
            return Err(PipelineError::Config("providers.call_timeout_ms must be positive".into()));
        }
        if self.providers.retry.max_attempts == 0 {
            return Err(PipelineError::Config("providers.retry.max_attempts must be at least 1".into()));
        }
        if let CompletionBackend::Gemini { model, .. } = &self.providers.completion {
            if model.trim().is_empty() {
                return Err(PipelineError::Config("Gemini model must not be empty".into()));
            }
        }
        if let RetrievalBackend::Searxng { base_url } = &self.providers.retrieval {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(PipelineError::Config(format!(
                    "SearXNG base URL must be http(s), got '{base_url}'"
                )));
            }
        }
        if self.stream.sentinel.is_empty() {
            return Err(PipelineError::Config("stream.sentinel must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, PipelineError> {
    raw.trim()
        .parse()
        .map_err(|_| PipelineError::Config(format!("{key} must be a non-negative integer, got '{raw}'")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, PipelineError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PipelineError::Config(format!("{key} must be a boolean, got '{raw}'"))),
    }
}
