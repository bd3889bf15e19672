//! Outline generation.

use super::{prompts, PipelineStage, RunState, StageContext};
use crate::core::{Outline, StageKind};
use crate::errors::StageError;
use crate::providers::CompletionProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

const STAGE: StageKind = StageKind::Outlining;

/// Asks for a hierarchical outline grounded in the curated sources.
pub struct OutliningStage {
    completion: Arc<dyn CompletionProvider>,
}

impl OutliningStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }
}

impl std::fmt::Debug for OutliningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutliningStage").finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for OutliningStage {
    fn kind(&self) -> StageKind {
        STAGE
    }

    async fn run(&self, state: RunState, ctx: &StageContext) -> Result<RunState, StageError> {
        ctx.check_cancelled(STAGE)?;
        let topic = state.topic().as_str();
        let knowledge = state.require_knowledge(STAGE)?;

        let raw = self
            .completion
            .complete(&prompts::outline(topic, knowledge), ctx.options())
            .await
            .map_err(|e| StageError::provider(STAGE, e))?;

        let outline = Outline::parse(&raw, topic);
        if outline.is_empty() {
            return Err(StageError::unusable(
                STAGE,
                "response contained no outline headings",
            ));
        }

        info!(run_id = %ctx.run_id(), sections = outline.len(), "Outline generated");
        Ok(state.with_outline(outline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{KnowledgeBase, OutlineSection};
    use crate::errors::StageFailure;
    use crate::providers::{MockCompletionProvider, MockLLMProvider};
    use crate::stages::prompts::TASK_OUTLINE;
    use crate::stages::test_support;
    use pretty_assertions::assert_eq;

    fn curated(topic: &str) -> RunState {
        test_support::state(topic).with_knowledge(KnowledgeBase::new())
    }

    #[tokio::test]
    async fn test_outline_from_mock() {
        let stage = OutliningStage::new(Arc::new(MockLLMProvider::new()));
        let state = stage
            .run(curated("Rust"), &test_support::context())
            .await
            .unwrap();

        let outline = state.outline().unwrap();
        assert_eq!(outline.sections[0], OutlineSection::new(2, "Overview"));
        assert_eq!(outline.top_level().len(), 4);
    }

    #[tokio::test]
    async fn test_outline_prompt_embeds_topic() {
        let mut completion = MockCompletionProvider::new();
        completion
            .expect_complete()
            .withf(|prompt, _| prompt.starts_with(TASK_OUTLINE) && prompt.contains("Topic: Tokio"))
            .times(1)
            .returning(|_, _| Ok("# Runtime\n# Tasks".to_string()));

        let state = OutliningStage::new(Arc::new(completion))
            .run(curated("Tokio"), &test_support::context())
            .await
            .unwrap();
        assert_eq!(state.outline().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unusable_outline_fails() {
        let llm = MockLLMProvider::new().with_response(TASK_OUTLINE, "I cannot help with that.");
        let err = OutliningStage::new(Arc::new(llm))
            .run(curated("Rust"), &test_support::context())
            .await
            .unwrap_err();

        assert_eq!(err.stage, StageKind::Outlining);
        assert!(matches!(err.cause, StageFailure::Unusable(_)));
    }

    #[tokio::test]
    async fn test_requires_knowledge() {
        let err = OutliningStage::new(Arc::new(MockLLMProvider::new()))
            .run(test_support::state("Rust"), &test_support::context())
            .await
            .unwrap_err();
        assert_eq!(err.cause, StageFailure::MissingInput("knowledge base"));
    }
}
