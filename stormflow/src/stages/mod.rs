//! The four pipeline stages.
//!
//! A stage takes the run's accumulated [`RunState`] by value and returns it
//! enriched with the stage's artifact. Stages hold their providers; the
//! per-run [`StageContext`] carries identity, generation hints and the
//! cancellation token.

mod curation;
mod drafting;
mod outlining;
mod polishing;
pub mod prompts;

pub use curation::CurationStage;
pub use drafting::DraftingStage;
pub use outlining::OutliningStage;
pub use polishing::PolishingStage;

use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::core::{Article, Draft, KnowledgeBase, Outline, StageKind, Topic};
use crate::errors::StageError;
use crate::providers::{GenerationOptions, Providers};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use uuid::Uuid;

/// Accumulated artifacts of one run.
///
/// Each stage consumes the state and returns a new one carrying its output.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    topic: Topic,
    knowledge: Option<KnowledgeBase>,
    outline: Option<Outline>,
    draft: Option<Draft>,
    article: Option<Article>,
}

impl RunState {
    /// Creates the initial state for `topic`.
    #[must_use]
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            knowledge: None,
            outline: None,
            draft: None,
            article: None,
        }
    }

    /// The run's topic.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Knowledge collected by curation.
    #[must_use]
    pub fn knowledge(&self) -> Option<&KnowledgeBase> {
        self.knowledge.as_ref()
    }

    /// Outline produced by outlining.
    #[must_use]
    pub fn outline(&self) -> Option<&Outline> {
        self.outline.as_ref()
    }

    /// Draft produced by drafting.
    #[must_use]
    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Article produced by polishing.
    #[must_use]
    pub fn article(&self) -> Option<&Article> {
        self.article.as_ref()
    }

    /// Consumes the state, returning the article if polishing ran.
    #[must_use]
    pub fn into_article(self) -> Option<Article> {
        self.article
    }

    /// Returns the state with `knowledge` attached.
    #[must_use]
    pub fn with_knowledge(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Returns the state with `outline` attached.
    #[must_use]
    pub fn with_outline(mut self, outline: Outline) -> Self {
        self.outline = Some(outline);
        self
    }

    /// Returns the state with `draft` attached.
    #[must_use]
    pub fn with_draft(mut self, draft: Draft) -> Self {
        self.draft = Some(draft);
        self
    }

    /// Returns the state with `article` attached.
    #[must_use]
    pub fn with_article(mut self, article: Article) -> Self {
        self.article = Some(article);
        self
    }

    pub(crate) fn require_knowledge(&self, stage: StageKind) -> Result<&KnowledgeBase, StageError> {
        self.knowledge
            .as_ref()
            .ok_or_else(|| StageError::missing_input(stage, "knowledge base"))
    }

    pub(crate) fn require_outline(&self, stage: StageKind) -> Result<&Outline, StageError> {
        self.outline
            .as_ref()
            .ok_or_else(|| StageError::missing_input(stage, "outline"))
    }

    pub(crate) fn require_draft(&self, stage: StageKind) -> Result<&Draft, StageError> {
        self.draft
            .as_ref()
            .ok_or_else(|| StageError::missing_input(stage, "draft"))
    }
}

/// Per-run context handed to every stage.
#[derive(Debug, Clone)]
pub struct StageContext {
    run_id: Uuid,
    options: GenerationOptions,
    cancel: Arc<CancellationToken>,
}

impl StageContext {
    /// Creates a context.
    #[must_use]
    pub fn new(run_id: Uuid, options: GenerationOptions, cancel: Arc<CancellationToken>) -> Self {
        Self {
            run_id,
            options,
            cancel,
        }
    }

    /// The run's identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Generation hints to forward to completion calls.
    #[must_use]
    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// The run's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> &Arc<CancellationToken> {
        &self.cancel
    }

    /// Fails with a cancellation error if the run was cancelled.
    pub fn check_cancelled(&self, stage: StageKind) -> Result<(), StageError> {
        if self.cancel.is_cancelled() {
            let reason = self.cancel.reason().unwrap_or_else(|| "cancelled".to_string());
            return Err(StageError::cancelled(stage, reason));
        }
        Ok(())
    }
}

/// One step of the pipeline.
#[async_trait]
pub trait PipelineStage: Send + Sync + Debug {
    /// Which stage this is.
    fn kind(&self) -> StageKind;

    /// Runs the stage over `state`, returning the enriched state.
    async fn run(&self, state: RunState, ctx: &StageContext) -> Result<RunState, StageError>;
}

/// The standard four stages wired to `providers`, in execution order.
#[must_use]
pub fn default_stages(providers: &Providers, config: &PipelineConfig) -> Vec<Arc<dyn PipelineStage>> {
    vec![
        Arc::new(CurationStage::new(
            providers.completion.clone(),
            providers.retrieval.clone(),
            config.curation,
        )),
        Arc::new(OutliningStage::new(providers.completion.clone())),
        Arc::new(DraftingStage::new(providers.completion.clone())),
        Arc::new(PolishingStage::new(providers.completion.clone())),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn context() -> StageContext {
        StageContext::new(Uuid::new_v4(), GenerationOptions::default(), CancellationToken::shared())
    }

    pub fn state(topic: &str) -> RunState {
        RunState::new(Topic::parse(topic).unwrap())
    }
}
