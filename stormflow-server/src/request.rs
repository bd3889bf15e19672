//! Inbound query payload and its validation.

use serde::Deserialize;
use stormflow::core::{Topic, MAX_TOPIC_CHARS, MIN_TOPIC_CHARS};
use stormflow::errors::ValidationError;
use stormflow::providers::GenerationOptions;

/// Default temperature hint when the request omits one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

/// Body of `POST /storm/query`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryRequest {
    /// The topic to research.
    pub query: String,
    /// Stream progress instead of waiting for the article.
    #[serde(default)]
    pub stream: bool,
    /// Sampling temperature forwarded to the completion provider.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidQuery {
    /// Trimmed, length-checked topic.
    pub topic: Topic,
    /// Whether to stream.
    pub stream: bool,
    /// Generation hints.
    pub options: GenerationOptions,
}

impl QueryRequest {
    /// Creates a blocking request with the default temperature.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            stream: false,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Returns the request with streaming toggled.
    #[must_use]
    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Returns the request with a temperature hint.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Checks the topic bounds and the temperature range.
    pub fn validate(self) -> Result<ValidQuery, ValidationError> {
        let topic = Topic::parse_bounded(&self.query, MIN_TOPIC_CHARS, MAX_TOPIC_CHARS)?;
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ValidationError::TemperatureOutOfRange {
                value: self.temperature,
            });
        }
        Ok(ValidQuery {
            topic,
            stream: self.stream,
            options: GenerationOptions::new().with_temperature(self.temperature),
        })
    }
}
