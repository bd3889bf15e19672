//! Error types for the stormflow pipeline.
//!
//! The taxonomy separates caller mistakes ([`ValidationError`]), collaborator
//! failures ([`ProviderError`]) and stage failures ([`StageError`]). The
//! orchestrator is the only place where any of these become a terminal
//! pipeline result.

use crate::core::StageKind;
use thiserror::Error;

/// The main error type for stormflow operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The caller supplied invalid input.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A stage failed.
    #[error("{0}")]
    Stage(#[from] StageError),

    /// A provider failed outside of any stage.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The run was cancelled.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file-system capability failed.
    #[error("{0}")]
    FileSystem(#[from] FileSystemError),
}

/// Error raised when caller input is rejected before any stage runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The topic was empty or whitespace-only.
    #[error("Empty query")]
    EmptyTopic,

    /// The topic is shorter than the accepted minimum.
    #[error("Query must be at least {min} characters long")]
    TopicTooShort {
        /// Minimum accepted length in characters.
        min: usize,
    },

    /// The topic is longer than the accepted maximum.
    #[error("Query must be at most {max} characters long")]
    TopicTooLong {
        /// Maximum accepted length in characters.
        max: usize,
    },

    /// The temperature hint is outside `0.0..=1.0`.
    #[error("Temperature must be between 0.0 and 1.0, got {value}")]
    TemperatureOutOfRange {
        /// The rejected value.
        value: f32,
    },
}

/// Longest response body kept in [`ProviderError::Status`].
pub const MAX_ERROR_BODY_CHARS: usize = 512;

/// Errors raised by completion and retrieval providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request could not be sent or the connection failed.
    #[error("request to {provider} failed: {message}")]
    Request {
        /// Provider label.
        provider: String,
        /// Underlying error message.
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        /// Provider label.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Response body, cut to [`MAX_ERROR_BODY_CHARS`].
        body: String,
    },

    /// The response could not be decoded.
    #[error("could not decode {provider} response: {message}")]
    Decode {
        /// Provider label.
        provider: String,
        /// Decoder error message.
        message: String,
    },

    /// The call exceeded its deadline.
    #[error("{provider} call timed out after {after_ms}ms")]
    Timeout {
        /// Provider label.
        provider: String,
        /// The deadline that elapsed.
        after_ms: u64,
    },

    /// The provider returned nothing usable.
    #[error("{provider} returned an empty response")]
    EmptyResponse {
        /// Provider label.
        provider: String,
    },

    /// Any other provider-specific failure.
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Creates a generic provider error.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Creates a status error, truncating `body` to [`MAX_ERROR_BODY_CHARS`].
    #[must_use]
    pub fn status(provider: impl Into<String>, status: u16, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
            Some((cut, _)) => format!("{}...", &body[..cut]),
            None => body.to_string(),
        };
        Self::Status {
            provider: provider.into(),
            status,
            body,
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(provider: impl Into<String>, after_ms: u64) -> Self {
        Self::Timeout {
            provider: provider.into(),
            after_ms,
        }
    }

    /// Returns true when retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode { .. } | Self::EmptyResponse { .. } | Self::Other(_) => false,
        }
    }
}

/// Why a stage failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageFailure {
    /// A provider call failed.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The stage produced empty or unparseable output.
    #[error("{0}")]
    Unusable(String),

    /// A previous stage's artifact was missing from the accumulator.
    #[error("missing {0} from previous stage")]
    MissingInput(&'static str),

    /// The run was cancelled while the stage was in progress.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The stage panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

/// Error raised when a pipeline stage fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stage {stage} failed: {cause}")]
pub struct StageError {
    /// Stage that failed.
    pub stage: StageKind,
    /// What went wrong.
    pub cause: StageFailure,
}

impl StageError {
    /// Creates a new stage error.
    #[must_use]
    pub fn new(stage: StageKind, cause: StageFailure) -> Self {
        Self { stage, cause }
    }

    /// Wraps a provider failure.
    #[must_use]
    pub fn provider(stage: StageKind, error: ProviderError) -> Self {
        Self::new(stage, StageFailure::Provider(error))
    }

    /// Reports output that failed the stage's post-condition.
    #[must_use]
    pub fn unusable(stage: StageKind, reason: impl Into<String>) -> Self {
        Self::new(stage, StageFailure::Unusable(reason.into()))
    }

    /// Reports an accumulator that is missing a previous artifact.
    #[must_use]
    pub fn missing_input(stage: StageKind, what: &'static str) -> Self {
        Self::new(stage, StageFailure::MissingInput(what))
    }

    /// Reports a cancellation observed inside the stage.
    #[must_use]
    pub fn cancelled(stage: StageKind, reason: impl Into<String>) -> Self {
        Self::new(stage, StageFailure::Cancelled(reason.into()))
    }

    /// Returns true if the failure is a cancellation rather than an error.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self.cause, StageFailure::Cancelled(_))
    }

    /// Converts to an event payload.
    #[must_use]
    pub fn to_event_data(&self) -> serde_json::Value {
        serde_json::json!({
            "stage": self.stage.name(),
            "error": self.cause.to_string(),
            "message": self.to_string(),
        })
    }
}

/// Errors raised by the file-system capability.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// An underlying IO operation failed.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// The path being accessed.
        path: String,
        /// The IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The path would resolve outside the configured root.
    #[error("Path escapes the file-system root: {0}")]
    OutsideRoot(String),

    /// An artifact could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A blocking run that must be reported to the client as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// The pipeline returned a failure.
    #[error("{0}")]
    RunFailed(String),
}

impl ProjectionError {
    /// The client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::RunFailed(reason) => reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_topic_message() {
        assert_eq!(ValidationError::EmptyTopic.to_string(), "Empty query");
    }

    #[test]
    fn test_stage_error_names_stage_and_cause() {
        let err = StageError::provider(
            StageKind::Outlining,
            ProviderError::timeout("completion", 1500),
        );

        let message = err.to_string();
        assert!(message.contains("outlining"));
        assert!(message.contains("timed out after 1500ms"));
    }

    #[test]
    fn test_stage_error_event_data() {
        let err = StageError::unusable(StageKind::Polishing, "polished article was empty");
        let data = err.to_event_data();

        assert_eq!(data["stage"], "polishing");
        assert_eq!(data["error"], "polished article was empty");
    }

    #[test]
    fn test_status_body_truncated() {
        let long = "é".repeat(MAX_ERROR_BODY_CHARS + 100);
        let ProviderError::Status { body, .. } = ProviderError::status("gemini", 500, &long) else {
            panic!("expected status error");
        };
        assert_eq!(body.chars().count(), MAX_ERROR_BODY_CHARS + 3);
        assert!(body.ends_with("..."));

        let short = ProviderError::status("gemini", 404, "not found");
        assert_eq!(short.to_string(), "gemini returned HTTP 404: not found");
    }

    #[test]
    fn test_missing_input_message() {
        let err = StageError::missing_input(StageKind::Drafting, "outline");
        assert_eq!(
            err.to_string(),
            "Stage drafting failed: missing outline from previous stage"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::timeout("x", 10).is_transient());
        assert!(ProviderError::Status {
            provider: "x".into(),
            status: 503,
            body: String::new(),
        }
        .is_transient());
        assert!(!ProviderError::Status {
            provider: "x".into(),
            status: 400,
            body: String::new(),
        }
        .is_transient());
        assert!(!ProviderError::other("bad key").is_transient());
    }

    #[test]
    fn test_pipeline_error_from_validation() {
        let err: PipelineError = ValidationError::EmptyTopic.into();
        assert_eq!(err.to_string(), "Empty query");
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
