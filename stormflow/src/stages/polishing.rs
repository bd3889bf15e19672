//! Final polishing pass.

use super::{prompts, PipelineStage, RunState, StageContext};
use crate::core::{Article, StageKind};
use crate::errors::StageError;
use crate::providers::CompletionProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

const STAGE: StageKind = StageKind::Polishing;

/// Revises the draft into the final article.
///
/// An empty or failed revision fails the stage; the draft is never
/// substituted for the article.
pub struct PolishingStage {
    completion: Arc<dyn CompletionProvider>,
}

impl PolishingStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }
}

impl std::fmt::Debug for PolishingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolishingStage").finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for PolishingStage {
    fn kind(&self) -> StageKind {
        STAGE
    }

    async fn run(&self, state: RunState, ctx: &StageContext) -> Result<RunState, StageError> {
        ctx.check_cancelled(STAGE)?;
        let draft = state.require_draft(STAGE)?;

        let raw = self
            .completion
            .complete(&prompts::polish(state.topic().as_str(), &draft.render()), ctx.options())
            .await
            .map_err(|e| StageError::provider(STAGE, e))?;

        let article = Article::new(raw)
            .ok_or_else(|| StageError::unusable(STAGE, "polished article was empty"))?;

        info!(run_id = %ctx.run_id(), words = article.word_count(), "Article polished");
        Ok(state.with_article(article))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Draft, DraftSection};
    use crate::errors::StageFailure;
    use crate::providers::{GenerationOptions, MockCompletionProvider, MockLLMProvider};
    use crate::stages::prompts::TASK_POLISH;
    use crate::stages::test_support;

    fn drafted() -> RunState {
        test_support::state("Rust").with_draft(Draft::new(vec![DraftSection::new(
            "History",
            "Rust began at Mozilla.",
        )]))
    }

    #[tokio::test]
    async fn test_polish_produces_article() {
        let state = PolishingStage::new(Arc::new(MockLLMProvider::new()))
            .run(drafted(), &test_support::context())
            .await
            .unwrap();

        let article = state.article().unwrap();
        assert!(article.as_str().contains("Rust began at Mozilla."));
    }

    #[tokio::test]
    async fn test_empty_polish_fails_without_fallback() {
        let llm = MockLLMProvider::new().with_response(TASK_POLISH, "  ");
        let err = PolishingStage::new(Arc::new(llm))
            .run(drafted(), &test_support::context())
            .await
            .unwrap_err();

        assert_eq!(err.stage, StageKind::Polishing);
        assert!(matches!(err.cause, StageFailure::Unusable(_)));
    }

    #[tokio::test]
    async fn test_temperature_forwarded() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .withf(|_, options| options.temperature == Some(0.2))
            .times(1)
            .returning(|_, _| Ok("Final article.".to_string()));

        let ctx = StageContext::new(
            uuid::Uuid::new_v4(),
            GenerationOptions::new().with_temperature(0.2),
            crate::cancellation::CancellationToken::shared(),
        );
        let state = PolishingStage::new(Arc::new(completion))
            .run(drafted(), &ctx)
            .await
            .unwrap();
        assert_eq!(state.article().unwrap().as_str(), "Final article.");
    }
}
