//! HTTP transport for the stormflow pipeline.
//!
//! Routes:
//! - `POST /storm/query`: blocking or streaming article generation
//! - `GET /storm/debug/files`: writes captured by the in-memory file system
//! - `GET /health`

#![forbid(unsafe_code)]
#![warn(clippy::all, missing_docs, rust_2018_idioms)]

pub mod error;
pub mod request;
pub mod routes;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use stormflow::config::ServiceConfig;
use stormflow::errors::PipelineError;
use stormflow::events::LoggingEventSink;
use stormflow::filesystem::{build_file_system, FileSystem};
use stormflow::pipeline::PipelineOrchestrator;
use stormflow::projection::ResponseProjector;
use stormflow::providers::build_providers;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    /// Runs the pipeline.
    pub orchestrator: PipelineOrchestrator,
    /// Shapes results for HTTP.
    pub projector: ResponseProjector,
    /// Target of artifact writes.
    pub file_system: Arc<dyn FileSystem>,
}

impl AppState {
    /// Creates state from already-built parts.
    #[must_use]
    pub fn new(
        orchestrator: PipelineOrchestrator,
        projector: ResponseProjector,
        file_system: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            orchestrator,
            projector,
            file_system,
        }
    }

    /// Wires providers, file system and projector from configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, PipelineError> {
        let providers = build_providers(&config.providers, config.pipeline.curation.search_top_k)?;
        let file_system = build_file_system(&config.file_system);
        let orchestrator = PipelineOrchestrator::from_providers(&providers, config.pipeline.clone())
            .with_event_sink(Arc::new(LoggingEventSink::default()))
            .with_file_system(file_system.clone());

        Ok(Self::new(
            orchestrator,
            ResponseProjector::new(config.stream.clone()),
            file_system,
        ))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("orchestrator", &self.orchestrator)
            .field("projector", &self.projector)
            .finish_non_exhaustive()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let storm_routes = Router::new()
        .route("/query", post(routes::query))
        .route("/debug/files", get(routes::debug_files));

    Router::new()
        .nest("/storm", storm_routes)
        .route("/health", get(routes::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_default_config() {
        let state = AppState::from_config(&ServiceConfig::default()).unwrap();
        assert!(state.file_system.captured().is_empty());
        let _router = router(state);
    }
}
