//! Pipeline lifecycle events.
//!
//! The orchestrator reports every run through an injected [`EventSink`].
//! Each payload carries the run's `run_id` and an RFC 3339 `timestamp`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::StageKind;
use serde_json::{json, Value};
use uuid::Uuid;

/// A lifecycle event of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// A run began.
    PipelineStarted {
        /// Topic as submitted.
        topic: String,
        /// Whether the run streams progress.
        streaming: bool,
    },
    /// A stage is about to run.
    StageStarted {
        /// The stage.
        stage: StageKind,
    },
    /// A stage finished successfully.
    StageCompleted {
        /// The stage.
        stage: StageKind,
        /// Wall time spent in the stage.
        duration_ms: f64,
    },
    /// A stage failed.
    StageFailed {
        /// The stage.
        stage: StageKind,
        /// Failure message.
        error: String,
        /// Wall time spent in the stage.
        duration_ms: f64,
    },
    /// The run produced an article.
    PipelineCompleted {
        /// Total wall time.
        duration_ms: f64,
        /// Words in the article.
        article_words: usize,
    },
    /// The run failed.
    PipelineFailed {
        /// Failure reason.
        reason: String,
        /// Total wall time.
        duration_ms: f64,
    },
    /// The run was cancelled.
    PipelineCancelled {
        /// Cancellation reason.
        reason: String,
    },
}

impl LifecycleEvent {
    /// Dotted event type, e.g. `stage.completed`.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::PipelineStarted { .. } => "pipeline.started",
            Self::StageStarted { .. } => "stage.started",
            Self::StageCompleted { .. } => "stage.completed",
            Self::StageFailed { .. } => "stage.failed",
            Self::PipelineCompleted { .. } => "pipeline.completed",
            Self::PipelineFailed { .. } => "pipeline.failed",
            Self::PipelineCancelled { .. } => "pipeline.cancelled",
        }
    }

    /// Builds the JSON payload for this event.
    #[must_use]
    pub fn payload(&self, run_id: Uuid) -> Value {
        let mut data = match self {
            Self::PipelineStarted { topic, streaming } => {
                json!({ "topic": topic, "streaming": streaming })
            }
            Self::StageStarted { stage } => json!({ "stage": stage.name() }),
            Self::StageCompleted { stage, duration_ms } => {
                json!({ "stage": stage.name(), "duration_ms": duration_ms })
            }
            Self::StageFailed {
                stage,
                error,
                duration_ms,
            } => json!({ "stage": stage.name(), "error": error, "duration_ms": duration_ms }),
            Self::PipelineCompleted {
                duration_ms,
                article_words,
            } => json!({ "duration_ms": duration_ms, "article_words": article_words }),
            Self::PipelineFailed {
                reason,
                duration_ms,
            } => json!({ "reason": reason, "duration_ms": duration_ms }),
            Self::PipelineCancelled { reason } => json!({ "reason": reason }),
        };
        if let Value::Object(map) = &mut data {
            map.insert("run_id".to_string(), Value::String(run_id.to_string()));
            map.insert(
                "timestamp".to_string(),
                Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        data
    }

    /// Sends this event to `sink`.
    pub async fn emit_to(&self, sink: &dyn EventSink, run_id: Uuid) {
        sink.emit(self.event_type(), Some(self.payload(run_id))).await;
    }

    /// Sends this event to `sink` without awaiting.
    pub fn try_emit_to(&self, sink: &dyn EventSink, run_id: Uuid) {
        sink.try_emit(self.event_type(), Some(self.payload(run_id)));
    }
}
