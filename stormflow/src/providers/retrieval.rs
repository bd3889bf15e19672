//! Source-retrieval capability.

use crate::core::Information;
use crate::errors::ProviderError;
use async_trait::async_trait;
use std::collections::HashSet;

/// Turns search queries into source records.
///
/// Implementations must be safe to call concurrently from independent runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    /// Retrieves records for `queries`, skipping any URL in `exclude_urls`.
    ///
    /// An empty `queries` slice yields an empty result.
    async fn retrieve(
        &self,
        queries: &[String],
        exclude_urls: &HashSet<String>,
    ) -> Result<Vec<Information>, ProviderError>;
}
