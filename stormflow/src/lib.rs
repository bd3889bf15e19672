//! # Stormflow
//!
//! A staged research-and-write pipeline that turns a topic into a polished
//! article.
//!
//! A run passes through four stages:
//!
//! - **Curation**: simulated research turns collect sources for the topic
//! - **Outlining**: a hierarchical outline is generated from those sources
//! - **Drafting**: each top-level section is written
//! - **Polishing**: the draft is revised into the final article
//!
//! Runs are either blocking, returning a [`PipelineResult`](core::PipelineResult),
//! or streaming, yielding [`ProgressEvent`](core::ProgressEvent)s as each stage
//! starts and the article as it is handed out.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stormflow::prelude::*;
//! use std::sync::Arc;
//!
//! let orchestrator = PipelineOrchestrator::new(
//!     Arc::new(MockLLMProvider::new()),
//!     Arc::new(MockRetriever::new()),
//!     PipelineConfig::default(),
//! );
//!
//! let result = orchestrator.run("Photosynthesis", GenerationOptions::default()).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod filesystem;
pub mod observability;
pub mod pipeline;
pub mod projection;
pub mod providers;
pub mod stages;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancelOnDrop, CancellationToken};
    pub use crate::config::{
        CompletionBackend, CurationConfig, FileSystemConfig, PipelineConfig, ProviderConfig,
        RetrievalBackend, ServiceConfig, StreamConfig,
    };
    pub use crate::core::{
        Article, Draft, Information, KnowledgeBase, Outline, PipelineResult, ProgressEvent,
        RunPhase, StageKind, Topic,
    };
    pub use crate::errors::{
        FileSystemError, PipelineError, ProjectionError, ProviderError, StageError,
        StageFailure, ValidationError,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LifecycleEvent, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::filesystem::{
        build_file_system, FileSystem, InMemoryFileSystem, RealFileSystem, WriteMode,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::PipelineOrchestrator;
    pub use crate::projection::{ProjectedStream, QueryResponse, ResponseProjector};
    pub use crate::providers::{
        build_providers, CompletionProvider, GenerationOptions, MockLLMProvider, MockRetriever,
        Providers, RetrievalProvider,
    };
    pub use crate::stages::{PipelineStage, RunState, StageContext};
}
