//! Section-by-section drafting.

use super::{prompts, PipelineStage, RunState, StageContext};
use crate::core::{Draft, DraftSection, StageKind};
use crate::errors::StageError;
use crate::providers::CompletionProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const STAGE: StageKind = StageKind::Drafting;

/// Writes one section per top-level outline heading, in outline order.
pub struct DraftingStage {
    completion: Arc<dyn CompletionProvider>,
}

impl DraftingStage {
    /// Creates the stage.
    #[must_use]
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }
}

impl std::fmt::Debug for DraftingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftingStage").finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineStage for DraftingStage {
    fn kind(&self) -> StageKind {
        STAGE
    }

    async fn run(&self, state: RunState, ctx: &StageContext) -> Result<RunState, StageError> {
        let topic = state.topic().as_str();
        let knowledge = state.require_knowledge(STAGE)?;
        let outline = state.require_outline(STAGE)?;

        let mut sections = Vec::new();
        for (section, subsections) in outline.top_level() {
            ctx.check_cancelled(STAGE)?;

            let prompt = prompts::draft_section(topic, section, &subsections, knowledge);
            let body = self
                .completion
                .complete(&prompt, ctx.options())
                .await
                .map_err(|e| StageError::provider(STAGE, e))?;

            let body = body.trim();
            if body.is_empty() {
                debug!(run_id = %ctx.run_id(), section = %section.title, "Dropping empty section");
                continue;
            }
            sections.push(DraftSection::new(section.title.clone(), body));
        }

        let draft = Draft::new(sections);
        if draft.sections.is_empty() {
            return Err(StageError::unusable(STAGE, "every drafted section was empty"));
        }

        info!(
            run_id = %ctx.run_id(),
            sections = draft.sections.len(),
            words = draft.word_count(),
            "Draft written"
        );
        Ok(state.with_draft(draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{KnowledgeBase, Outline, OutlineSection};
    use crate::errors::{ProviderError, StageFailure};
    use crate::providers::{MockCompletionProvider, MockLLMProvider};
    use crate::stages::prompts::TASK_DRAFT_SECTION;
    use crate::stages::test_support;
    use pretty_assertions::assert_eq;

    fn outlined(sections: Vec<OutlineSection>) -> RunState {
        test_support::state("Rust")
            .with_knowledge(KnowledgeBase::new())
            .with_outline(Outline::new(sections))
    }

    #[tokio::test]
    async fn test_draft_follows_outline() {
        let llm = Arc::new(MockLLMProvider::new().recording());
        let state = DraftingStage::new(llm.clone())
            .run(
                outlined(vec![
                    OutlineSection::new(1, "History"),
                    OutlineSection::new(2, "Origins"),
                    OutlineSection::new(1, "Adoption"),
                ]),
                &test_support::context(),
            )
            .await
            .unwrap();

        let headings: Vec<_> = state
            .draft()
            .unwrap()
            .sections
            .iter()
            .map(|s| s.heading.as_str())
            .collect();
        assert_eq!(headings, vec!["History", "Adoption"]);
        assert_eq!(llm.calls_for(TASK_DRAFT_SECTION), 2);
        assert!(llm.prompts()[0].contains("- Origins"));
    }

    #[tokio::test]
    async fn test_empty_sections_dropped() {
        let llm = MockLLMProvider::new().with_response("Section: Adoption", "   ");
        let state = DraftingStage::new(Arc::new(llm))
            .run(
                outlined(vec![OutlineSection::new(1, "History"), OutlineSection::new(1, "Adoption")]),
                &test_support::context(),
            )
            .await
            .unwrap();
        assert_eq!(state.draft().unwrap().sections.len(), 1);
    }

    #[tokio::test]
    async fn test_all_empty_fails() {
        let mut completion = MockCompletionProvider::new();
        completion.expect_complete().returning(|_, _| Ok("\n".to_string()));

        let err = DraftingStage::new(Arc::new(completion))
            .run(outlined(vec![OutlineSection::new(1, "History")]), &test_support::context())
            .await
            .unwrap_err();
        assert!(matches!(err.cause, StageFailure::Unusable(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_names_stage() {
        let llm = MockLLMProvider::new().fail_when(TASK_DRAFT_SECTION, "context window exceeded");
        let err = DraftingStage::new(Arc::new(llm))
            .run(outlined(vec![OutlineSection::new(1, "History")]), &test_support::context())
            .await
            .unwrap_err();

        assert_eq!(err.stage, StageKind::Drafting);
        assert_eq!(
            err.cause,
            StageFailure::Provider(ProviderError::other("context window exceeded"))
        );
    }

    #[tokio::test]
    async fn test_requires_outline() {
        let err = DraftingStage::new(Arc::new(MockLLMProvider::new()))
            .run(
                test_support::state("Rust").with_knowledge(KnowledgeBase::new()),
                &test_support::context(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.cause, StageFailure::MissingInput("outline"));
    }
}
