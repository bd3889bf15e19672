//! Core data model for a pipeline run.
//!
//! Everything here is created fresh per request and dropped once the response
//! has been sent.

mod artifact;
mod event;
mod knowledge;
mod result;
mod status;
mod topic;

pub use artifact::{Article, Draft, DraftSection, Outline, OutlineSection};
pub use event::ProgressEvent;
pub use knowledge::{Information, KnowledgeBase};
pub use result::PipelineResult;
pub use status::{RunPhase, StageKind};
pub use topic::{slugify, Topic, MAX_TOPIC_CHARS, MIN_TOPIC_CHARS};
