//! The topic driving a pipeline run.

use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest topic accepted at the transport boundary, in characters.
pub const MIN_TOPIC_CHARS: usize = 3;

/// Longest topic accepted at the transport boundary, in characters.
pub const MAX_TOPIC_CHARS: usize = 1000;

/// A trimmed, non-empty topic string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Trims the input and rejects it if nothing is left.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Like [`Topic::parse`], additionally enforcing a character-length window.
    pub fn parse_bounded(raw: &str, min: usize, max: usize) -> Result<Self, ValidationError> {
        let topic = Self::parse(raw)?;
        let chars = topic.0.chars().count();
        if chars < min {
            return Err(ValidationError::TopicTooShort { min });
        }
        if chars > max {
            return Err(ValidationError::TopicTooLong { max });
        }
        Ok(topic)
    }

    /// Returns the topic text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a URL- and path-safe slug of the topic.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Topic {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

/// Lowercases and collapses every run of non-alphanumerics into a single `-`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
