//! Units of streaming output.

use super::StageKind;
use serde::{Deserialize, Serialize};

/// One unit of a streaming pipeline run.
///
/// A successful run yields four `StageStarted`, then `Done`, then one or more
/// `ArticleChunk`. A failed run yields `StageStarted` up to the failing stage
/// followed by a single `ErrorOccurred`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A stage is about to run.
    StageStarted(StageKind),
    /// A fragment of the final article.
    ArticleChunk(String),
    /// All stages succeeded; article chunks follow.
    Done,
    /// The run failed; nothing follows.
    ErrorOccurred(String),
}

impl ProgressEvent {
    /// Short name for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StageStarted(_) => "stage_started",
            Self::ArticleChunk(_) => "article_chunk",
            Self::Done => "done",
            Self::ErrorOccurred(_) => "error_occurred",
        }
    }

    /// Returns true for `ErrorOccurred`.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::ErrorOccurred(_))
    }

    /// Progress label for `StageStarted`.
    #[must_use]
    pub const fn label(&self) -> Option<&'static str> {
        match self {
            Self::StageStarted(stage) => Some(stage.label()),
            _ => None,
        }
    }
}
