//! Terminal result of a blocking pipeline run.

use super::Article;
use serde::{Deserialize, Serialize};

/// Outcome of [`PipelineOrchestrator::run`](crate::pipeline::PipelineOrchestrator::run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    /// The article was produced.
    Success {
        /// The polished article.
        article: Article,
    },
    /// The run failed; `reason` names the failing stage where there is one.
    Failure {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl PipelineResult {
    /// Creates a success result.
    #[must_use]
    pub fn success(article: Article) -> Self {
        Self::Success { article }
    }

    /// Creates a failure result.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Returns true on success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the article on success.
    #[must_use]
    pub fn article(&self) -> Option<&Article> {
        match self {
            Self::Success { article } => Some(article),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the failure reason on failure.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let ok = PipelineResult::success(Article::new("body").unwrap());
        assert!(ok.is_success());
        assert_eq!(ok.article().map(Article::as_str), Some("body"));
        assert!(ok.reason().is_none());

        let failed = PipelineResult::failure("Empty query");
        assert!(!failed.is_success());
        assert_eq!(failed.reason(), Some("Empty query"));
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_value(PipelineResult::failure("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "failure", "reason": "boom"}));

        let json = serde_json::to_value(PipelineResult::success(Article::new("a b").unwrap())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "article": "a b"}));
    }
}
