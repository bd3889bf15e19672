//! Blocking response projection.

use super::{ProjectionError, ResponseProjector};
use crate::core::PipelineResult;
use serde::{Deserialize, Serialize};

/// Outcome field of a [`QueryResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The article was produced.
    Success,
    /// The run failed.
    Error,
}

/// Body of a blocking query response.
///
/// `Success` always carries a non-empty `output`; `Error` always carries an
/// `error`. The constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResponse {
    status: ResponseStatus,
    output: Option<String>,
    error: Option<String>,
}

impl QueryResponse {
    /// A successful response. Returns `None` if `output` is blank.
    #[must_use]
    pub fn success(output: impl Into<String>) -> Option<Self> {
        let output = output.into();
        if output.trim().is_empty() {
            return None;
        }
        Some(Self {
            status: ResponseStatus::Success,
            output: Some(output),
            error: None,
        })
    }

    /// An error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            output: None,
            error: Some(message.into()),
        }
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    /// The article text, on success.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// The error message, on error.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl ResponseProjector {
    /// Projects a blocking result.
    ///
    /// Failures are returned as errors so the transport reports them with a
    /// client-error status rather than a 200 carrying an error body.
    pub fn project_blocking(&self, result: PipelineResult) -> Result<QueryResponse, ProjectionError> {
        match result {
            PipelineResult::Success { article } => QueryResponse::success(article.into_string())
                .ok_or_else(|| ProjectionError::RunFailed("Pipeline produced an empty article".to_string())),
            PipelineResult::Failure { reason } => Err(ProjectionError::RunFailed(reason)),
        }
    }
}
