//! Pipeline orchestration.
//!
//! This module provides:
//! - [`PipelineOrchestrator`], running the four stages in order
//! - Blocking runs returning a [`PipelineResult`](crate::core::PipelineResult)
//! - Lazy progress streams of [`ProgressEvent`](crate::core::ProgressEvent)
//! - Optional persistence of intermediate artifacts

mod artifacts;
mod orchestrator;
mod streaming;


pub use artifacts::{artifact_file, artifact_path, persist_stage_artifact};
pub use orchestrator::PipelineOrchestrator;
