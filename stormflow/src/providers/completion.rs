//! Text-completion capability.

use crate::errors::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-request generation hints forwarded to the completion backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature in `0.0..=1.0`. Backends may ignore it.
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    /// Creates options with no hints set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the temperature hint.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Turns a prompt into text.
///
/// Implementations must be safe to call concurrently from independent runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Completes `prompt`.
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError>;
}
