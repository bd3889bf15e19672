//! SearXNG retrieval backend.

use super::RetrievalProvider;
use crate::core::Information;
use crate::errors::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

const PROVIDER: &str = "searxng";

/// Retrieval backend querying a SearXNG instance's JSON API.
#[derive(Debug, Clone)]
pub struct SearxngRetrievalProvider {
    client: reqwest::Client,
    base_url: String,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: Option<String>,
}

impl SearxngRetrievalProvider {
    /// Creates a provider for the instance at `base_url`, keeping at most
    /// `top_k` hits per query.
    pub fn new(base_url: impl Into<String>, top_k: usize) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("stormflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER.to_string(),
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            top_k,
        })
    }

    async fn search(&self, query: &str) -> Result<SearchResponse, ProviderError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::status(PROVIDER, status.as_u16(), &body));
        }

        response.json().await.map_err(|e| ProviderError::Decode {
            provider: PROVIDER.to_string(),
            message: e.to_string(),
        })
    }

    fn to_records(
        hits: Vec<SearchHit>,
        exclude_urls: &HashSet<String>,
        seen: &mut HashSet<String>,
        top_k: usize,
    ) -> Vec<Information> {
        hits.into_iter()
            .filter(|hit| !hit.url.is_empty() && !exclude_urls.contains(&hit.url))
            .filter(|hit| seen.insert(hit.url.clone()))
            .take(top_k)
            .map(|hit| {
                let snippets = hit
                    .content
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .into_iter()
                    .collect();
                Information::new(hit.url, snippets)
            })
            .collect()
    }
}

#[async_trait]
impl RetrievalProvider for SearxngRetrievalProvider {
    async fn retrieve(
        &self,
        queries: &[String],
        exclude_urls: &HashSet<String>,
    ) -> Result<Vec<Information>, ProviderError> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for query in queries {
            let response = self.search(query).await?;
            debug!(query = %query, hits = response.results.len(), "SearXNG search finished");
            records.extend(Self::to_records(response.results, exclude_urls, &mut seen, self.top_k));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hit(url: &str, content: Option<&str>) -> SearchHit {
        SearchHit {
            url: url.to_string(),
            content: content.map(str::to_string),
        }
    }

    #[test]
    fn test_to_records_filters_and_caps() {
        let excluded: HashSet<String> = ["https://old.example".to_string()].into_iter().collect();
        let mut seen = HashSet::new();
        let hits = vec![
            hit("https://old.example", Some("stale")),
            hit("", Some("no url")),
            hit("https://a.example", Some("  alpha ")),
            hit("https://a.example", Some("dup")),
            hit("https://b.example", None),
            hit("https://c.example", Some("gamma")),
        ];

        let records = SearxngRetrievalProvider::to_records(hits, &excluded, &mut seen, 2);
        assert_eq!(
            records,
            vec![
                Information::new("https://a.example", vec!["alpha".to_string()]),
                Information::new("https://b.example", Vec::new()),
            ]
        );
    }

    #[test]
    fn test_decode_search_response() {
        let raw = r#"{"query": "rust", "results": [{"url": "https://rust-lang.org", "title": "Rust", "content": "A language"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].content.as_deref(), Some("A language"));
    }

    #[tokio::test]
    async fn test_empty_queries_skip_io() {
        let provider = SearxngRetrievalProvider::new("http://127.0.0.1:9", 5).unwrap();
        let records = provider.retrieve(&[], &HashSet::new()).await.unwrap();
        assert!(records.is_empty());
    }
}
