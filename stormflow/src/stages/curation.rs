//! Knowledge curation: simulated research turns that collect sources.

use super::{prompts, PipelineStage, RunState, StageContext};
use crate::config::CurationConfig;
use crate::core::{KnowledgeBase, StageKind};
use crate::errors::StageError;
use crate::providers::{CompletionProvider, RetrievalProvider};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

const STAGE: StageKind = StageKind::Curation;

/// Collects sources for the topic over a bounded number of research turns.
///
/// Each turn asks the completion provider for new search queries, then
/// retrieves every query concurrently against the URLs already known.
pub struct CurationStage {
    completion: Arc<dyn CompletionProvider>,
    retrieval: Arc<dyn RetrievalProvider>,
    config: CurationConfig,
}

impl CurationStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        retrieval: Arc<dyn RetrievalProvider>,
        config: CurationConfig,
    ) -> Self {
        Self {
            completion,
            retrieval,
            config,
        }
    }

    async fn next_queries(
        &self,
        topic: &str,
        turn: usize,
        asked: &[String],
        known_sources: usize,
        ctx: &StageContext,
    ) -> Result<Vec<String>, StageError> {
        let max = self.config.max_queries_per_turn;
        let prompt = prompts::generate_queries(topic, turn, max, asked, known_sources);
        let raw = self
            .completion
            .complete(&prompt, ctx.options())
            .await
            .map_err(|e| StageError::provider(STAGE, e))?;

        let mut queries: Vec<String> = prompts::parse_queries(&raw, max)
            .into_iter()
            .filter(|q| !asked.iter().any(|a| a.eq_ignore_ascii_case(q)))
            .collect();
        if queries.is_empty() && turn == 1 {
            queries.push(topic.to_string());
        }
        Ok(queries)
    }
}

impl std::fmt::Debug for CurationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurationStage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for CurationStage {
    fn kind(&self) -> StageKind {
        STAGE
    }

    async fn run(&self, state: RunState, ctx: &StageContext) -> Result<RunState, StageError> {
        let topic = state.topic().as_str();
        let mut knowledge = KnowledgeBase::new();
        let mut asked: Vec<String> = Vec::new();

        for turn in 1..=self.config.max_conv_turns {
            ctx.check_cancelled(STAGE)?;

            let queries = self
                .next_queries(topic, turn, &asked, knowledge.len(), ctx)
                .await?;
            if queries.is_empty() {
                debug!(run_id = %ctx.run_id(), turn, "No new queries, ending curation");
                break;
            }

            let exclude = knowledge.urls();
            let batches = try_join_all(
                queries
                    .iter()
                    .map(|q| self.retrieval.retrieve(std::slice::from_ref(q), &exclude)),
            )
            .await
            .map_err(|e| StageError::provider(STAGE, e))?;

            let mut added = 0;
            for records in batches {
                added += knowledge.extend(records.into_iter().take(self.config.search_top_k));
            }
            debug!(
                run_id = %ctx.run_id(),
                turn,
                queries = queries.len(),
                added,
                "Curation turn finished"
            );
            asked.extend(queries);
        }

        info!(
            run_id = %ctx.run_id(),
            sources = knowledge.len(),
            snippets = knowledge.snippet_count(),
            "Knowledge curated"
        );
        Ok(state.with_knowledge(knowledge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Information;
    use crate::errors::{ProviderError, StageFailure};
    use crate::providers::{MockCompletionProvider, MockLLMProvider, MockRetrievalProvider, MockRetriever};
    use crate::stages::prompts::TASK_GENERATE_QUERIES;
    use crate::stages::test_support;
    use pretty_assertions::assert_eq;

    fn stage(
        completion: Arc<dyn CompletionProvider>,
        retrieval: Arc<dyn RetrievalProvider>,
    ) -> CurationStage {
        CurationStage::new(completion, retrieval, CurationConfig::default())
    }

    #[tokio::test]
    async fn test_curation_collects_and_ends_early() {
        let llm = Arc::new(MockLLMProvider::new());
        let retriever = Arc::new(MockRetriever::new());
        let state = stage(llm.clone(), retriever.clone())
            .run(test_support::state("Rust"), &test_support::context())
            .await
            .unwrap();

        // The mock repeats its first turn's queries on turn 3.
        assert_eq!(llm.calls_for(TASK_GENERATE_QUERIES), 3);
        assert_eq!(retriever.call_count(), 6);
        assert_eq!(state.knowledge().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_curation_falls_back_to_topic() {
        let llm = Arc::new(MockLLMProvider::new().with_response(TASK_GENERATE_QUERIES, "\n  \n"));
        let retriever = Arc::new(MockRetriever::new().recording());
        let state = stage(llm, retriever.clone())
            .run(test_support::state("Quantum computing"), &test_support::context())
            .await
            .unwrap();

        assert_eq!(retriever.queries(), vec!["Quantum computing".to_string()]);
        let kb = state.knowledge().unwrap();
        assert_eq!(kb.len(), 1);
        assert!(kb.contains_url("https://example.com/quantum-computing"));
    }

    #[tokio::test]
    async fn test_curation_dedups_overlapping_urls() {
        let llm = Arc::new(MockLLMProvider::new());
        let retriever = Arc::new(
            MockRetriever::new()
                .with_shared_url("https://example.com/shared")
                .ignoring_exclusions(),
        );
        let state = stage(llm, retriever)
            .run(test_support::state("Rust"), &test_support::context())
            .await
            .unwrap();

        let kb = state.knowledge().unwrap();
        let shared = kb
            .iter()
            .filter(|r| r.source_url == "https://example.com/shared")
            .count();
        assert_eq!(shared, 1);
        assert_eq!(kb.len(), 7);
    }

    #[tokio::test]
    async fn test_curation_passes_exclusion_set() {
        let llm = Arc::new(MockLLMProvider::new());
        let mut retrieval = MockRetrievalProvider::new();
        retrieval
            .expect_retrieve()
            .times(6)
            .returning(|queries, exclude| {
                assert_eq!(queries.len(), 1);
                let url = format!("https://example.com/{}", queries[0].len());
                if exclude.is_empty() {
                    Ok(vec![Information::new(url, Vec::new())])
                } else {
                    assert!(exclude.iter().all(|u| u.starts_with("https://example.com/")));
                    Ok(Vec::new())
                }
            });

        let state = stage(llm, Arc::new(retrieval))
            .run(test_support::state("Rust"), &test_support::context())
            .await
            .unwrap();
        assert!(!state.knowledge().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_curation_tolerates_empty_results() {
        let llm = Arc::new(MockLLMProvider::new());
        let mut retrieval = MockRetrievalProvider::new();
        retrieval.expect_retrieve().returning(|_, _| Ok(Vec::new()));

        let state = stage(llm, Arc::new(retrieval))
            .run(test_support::state("Rust"), &test_support::context())
            .await
            .unwrap();
        assert!(state.knowledge().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_curation_caps_records_per_query() {
        let llm = Arc::new(MockLLMProvider::new().with_response(TASK_GENERATE_QUERIES, "only query"));
        let mut retrieval = MockRetrievalProvider::new();
        retrieval.expect_retrieve().returning(|_, _| {
            Ok((0..10)
                .map(|i| Information::new(format!("https://example.com/{i}"), Vec::new()))
                .collect())
        });

        let config = CurationConfig {
            max_conv_turns: 1,
            max_queries_per_turn: 3,
            search_top_k: 4,
        };
        let state = CurationStage::new(llm, Arc::new(retrieval), config)
            .run(test_support::state("Rust"), &test_support::context())
            .await
            .unwrap();
        assert_eq!(state.knowledge().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_curation_provider_failure() {
        let llm = Arc::new(MockLLMProvider::new());
        let retriever = Arc::new(MockRetriever::new().failing("search backend down"));
        let err = stage(llm, retriever)
            .run(test_support::state("Rust"), &test_support::context())
            .await
            .unwrap_err();

        assert_eq!(err.stage, StageKind::Curation);
        assert!(matches!(err.cause, StageFailure::Provider(ProviderError::Request { .. })));
        assert!(err.to_string().starts_with("Stage curation failed:"));
    }

    #[tokio::test]
    async fn test_curation_query_generation_failure() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .returning(|_, _| Err(ProviderError::other("quota exceeded")));
        let retriever = Arc::new(MockRetriever::new());

        let err = stage(Arc::new(completion), retriever.clone())
            .run(test_support::state("Rust"), &test_support::context())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Stage curation failed: quota exceeded");
        assert_eq!(retriever.call_count(), 0);
    }

    #[tokio::test]
    async fn test_curation_observes_cancellation() {
        let llm = Arc::new(MockLLMProvider::new());
        let retriever = Arc::new(MockRetriever::new());
        let ctx = test_support::context();
        ctx.cancel_token().cancel("shutting down");

        let err = stage(llm.clone(), retriever)
            .run(test_support::state("Rust"), &ctx)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(llm.call_count(), 0);
    }
}
