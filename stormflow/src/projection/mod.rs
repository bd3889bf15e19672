//! Projection of pipeline output into transport-facing shapes.
//!
//! Blocking runs become a [`QueryResponse`] or a [`ProjectionError`]; streaming
//! runs become a sequence of text fragments ending in the configured sentinel.
//! Nothing here knows about HTTP.

mod blocking;
mod streaming;

pub use blocking::{QueryResponse, ResponseStatus};
pub use streaming::ProjectedStream;

pub use crate::errors::ProjectionError;

use crate::config::StreamConfig;

/// Adapts pipeline results and progress events for a transport.
#[derive(Debug, Clone, Default)]
pub struct ResponseProjector {
    config: StreamConfig,
}

impl ResponseProjector {
    /// Creates a projector with the given streaming settings.
    #[must_use]
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// The streaming settings.
    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}
