//! Sequential execution of the four stages.

use super::artifacts::persist_stage_artifact;
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::core::{PipelineResult, RunPhase, StageKind, Topic};
use crate::errors::{PipelineError, StageError, StageFailure};
use crate::events::{EventSink, LifecycleEvent, NoOpEventSink};
use crate::filesystem::FileSystem;
use crate::observability::{pipeline_span, stage_span, SpanTimer};
use crate::providers::{CompletionProvider, GenerationOptions, Providers, RetrievalProvider};
use crate::stages::{default_stages, PipelineStage, RunState, StageContext};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// Runs topics through curation, outlining, drafting and polishing.
///
/// The orchestrator holds no per-run state; cloning it is cheap and every
/// call to [`run`](Self::run) or [`run_streaming`](Self::run_streaming) works
/// on its own accumulator, so concurrent runs never share artifacts.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    pub(super) stages: Arc<[Arc<dyn PipelineStage>]>,
    pub(super) config: PipelineConfig,
    pub(super) events: Arc<dyn EventSink>,
    pub(super) file_system: Option<Arc<dyn FileSystem>>,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator over the standard stages.
    #[must_use]
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        retrieval: Arc<dyn RetrievalProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self::from_providers(
            &Providers {
                completion,
                retrieval,
            },
            config,
        )
    }

    /// Creates an orchestrator over the standard stages wired to `providers`.
    #[must_use]
    pub fn from_providers(providers: &Providers, config: PipelineConfig) -> Self {
        let stages = default_stages(providers, &config);
        Self {
            stages: stages.into(),
            config,
            events: Arc::new(NoOpEventSink),
            file_system: None,
        }
    }

    /// Creates an orchestrator over custom stage implementations.
    ///
    /// Exactly one stage of each kind is required, in execution order.
    pub fn from_stages(
        stages: Vec<Arc<dyn PipelineStage>>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let kinds: Vec<StageKind> = stages.iter().map(|s| s.kind()).collect();
        if kinds != StageKind::ALL {
            return Err(PipelineError::Config(format!(
                "stages must be {:?}, got {kinds:?}",
                StageKind::ALL
            )));
        }
        Ok(Self {
            stages: stages.into(),
            config,
            events: Arc::new(NoOpEventSink),
            file_system: None,
        })
    }

    /// Reports lifecycle events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Persists stage artifacts to `fs` when enabled in the configuration.
    #[must_use]
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// The pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline to completion.
    pub async fn run(&self, topic: &str, options: GenerationOptions) -> PipelineResult {
        self.run_with_cancel(topic, options, CancellationToken::shared())
            .await
    }

    /// Runs the pipeline to completion, observing `cancel` between units of
    /// work and while stages are in flight.
    pub async fn run_with_cancel(
        &self,
        topic: &str,
        options: GenerationOptions,
        cancel: Arc<CancellationToken>,
    ) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let timer = SpanTimer::start("pipeline");

        let topic = match Topic::parse(topic) {
            Ok(topic) => topic,
            Err(e) => {
                warn!(%run_id, error = %e, "Rejected topic");
                return self.fail(run_id, e.to_string(), &timer).await;
            }
        };

        let span = pipeline_span(run_id, topic.as_str());
        self.run_stages(run_id, topic, StageContext::new(run_id, options, cancel), timer)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        topic: Topic,
        ctx: StageContext,
        timer: SpanTimer,
    ) -> PipelineResult {
        info!(%run_id, topic = %topic, "Pipeline started");
        LifecycleEvent::PipelineStarted {
            topic: topic.to_string(),
            streaming: false,
        }
        .emit_to(self.events.as_ref(), run_id)
        .await;

        let mut phase = RunPhase::Idle;
        let mut state = RunState::new(topic);
        for stage in self.stages.iter() {
            if let Some(reason) = cancellation_reason(&ctx) {
                transition(run_id, phase, RunPhase::Failed);
                return self.cancelled(run_id, reason).await;
            }
            phase = transition(run_id, phase, RunPhase::running(stage.kind()));
            state = match self.execute_stage(stage, state, &ctx).await {
                Ok(next) => next,
                Err(e) if e.is_cancellation() => {
                    transition(run_id, phase, RunPhase::Failed);
                    let reason = cancellation_reason(&ctx).unwrap_or_else(|| e.cause.to_string());
                    return self.cancelled(run_id, reason).await;
                }
                Err(e) => {
                    transition(run_id, phase, RunPhase::Failed);
                    return self.fail(run_id, e.to_string(), &timer).await;
                }
            };
        }

        match state.into_article() {
            Some(article) => {
                transition(run_id, phase, RunPhase::Done);
                let duration_ms = timer.finish();
                info!(%run_id, duration_ms, words = article.word_count(), "Pipeline completed");
                LifecycleEvent::PipelineCompleted {
                    duration_ms,
                    article_words: article.word_count(),
                }
                .emit_to(self.events.as_ref(), run_id)
                .await;
                PipelineResult::success(article)
            }
            None => {
                transition(run_id, phase, RunPhase::Failed);
                let reason =
                    StageError::missing_input(StageKind::Polishing, "article").to_string();
                self.fail(run_id, reason, &timer).await
            }
        }
    }

    /// Runs one stage with events, tracing, panic containment and artifact
    /// persistence.
    pub(super) async fn execute_stage(
        &self,
        stage: &Arc<dyn PipelineStage>,
        state: RunState,
        ctx: &StageContext,
    ) -> Result<RunState, StageError> {
        let kind = stage.kind();
        let run_id = ctx.run_id();
        let timer = SpanTimer::start(kind.name());

        LifecycleEvent::StageStarted { stage: kind }
            .emit_to(self.events.as_ref(), run_id)
            .await;

        let work = AssertUnwindSafe(stage.run(state, ctx))
            .catch_unwind()
            .instrument(stage_span(run_id, kind));
        let outcome = tokio::select! {
            biased;
            () = ctx.cancel_token().cancelled() => {
                let reason = ctx.cancel_token().reason().unwrap_or_else(|| "cancelled".to_string());
                Err(StageError::cancelled(kind, reason))
            }
            result = work => match result {
                Ok(outcome) => outcome,
                Err(panic) => Err(StageError::new(kind, StageFailure::Panicked(panic_message(&*panic)))),
            },
        };

        let duration_ms = timer.finish();
        match &outcome {
            Ok(state) => {
                info!(%run_id, stage = kind.name(), duration_ms, "Stage completed");
                LifecycleEvent::StageCompleted {
                    stage: kind,
                    duration_ms,
                }
                .emit_to(self.events.as_ref(), run_id)
                .await;
                self.persist(run_id, kind, state).await;
            }
            Err(e) if e.is_cancellation() => {
                info!(%run_id, stage = kind.name(), "Stage interrupted by cancellation");
            }
            Err(e) => {
                error!(%run_id, stage = kind.name(), error = %e, duration_ms, "Stage failed");
                LifecycleEvent::StageFailed {
                    stage: kind,
                    error: e.cause.to_string(),
                    duration_ms,
                }
                .emit_to(self.events.as_ref(), run_id)
                .await;
            }
        }
        outcome
    }

    async fn persist(&self, run_id: Uuid, stage: StageKind, state: &RunState) {
        if !self.config.persist_artifacts {
            return;
        }
        let Some(fs) = &self.file_system else {
            return;
        };
        if let Err(e) = persist_stage_artifact(fs.as_ref(), run_id, stage, state).await {
            warn!(%run_id, stage = stage.name(), error = %e, "Failed to persist artifact");
        }
    }

    pub(super) async fn fail(&self, run_id: Uuid, reason: String, timer: &SpanTimer) -> PipelineResult {
        let duration_ms = timer.elapsed_ms();
        warn!(%run_id, reason = %reason, duration_ms, "Pipeline failed");
        LifecycleEvent::PipelineFailed {
            reason: reason.clone(),
            duration_ms,
        }
        .emit_to(self.events.as_ref(), run_id)
        .await;
        PipelineResult::failure(reason)
    }

    pub(super) async fn cancelled(&self, run_id: Uuid, reason: String) -> PipelineResult {
        info!(%run_id, reason = %reason, "Pipeline cancelled");
        LifecycleEvent::PipelineCancelled {
            reason: reason.clone(),
        }
        .emit_to(self.events.as_ref(), run_id)
        .await;
        PipelineResult::failure(PipelineError::Cancelled(reason).to_string())
    }
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("stages", &self.stages)
            .field("config", &self.config)
            .field("persists", &self.file_system.is_some())
            .finish_non_exhaustive()
    }
}

/// Moves a run from `from` to `to`, logging the change.
pub(super) fn transition(run_id: Uuid, from: RunPhase, to: RunPhase) -> RunPhase {
    debug_assert!(from.can_transition_to(to), "illegal phase change {from} -> {to}");
    debug!(%run_id, from = %from, to = %to, "Run phase changed");
    to
}

pub(super) fn cancellation_reason(ctx: &StageContext) -> Option<String> {
    let token = ctx.cancel_token();
    token
        .is_cancelled()
        .then(|| token.reason().unwrap_or_else(|| "cancelled".to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Article;
    use crate::events::CollectingEventSink;
    use crate::providers::{MockLLMProvider, MockRetriever};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct ScriptedStage {
        kind: StageKind,
        behaviour: Behaviour,
    }

    #[derive(Debug, Clone, Copy)]
    enum Behaviour {
        Pass,
        Panic,
        Hang,
    }

    #[async_trait]
    impl PipelineStage for ScriptedStage {
        fn kind(&self) -> StageKind {
            self.kind
        }

        async fn run(&self, state: RunState, _ctx: &StageContext) -> Result<RunState, StageError> {
            match self.behaviour {
                Behaviour::Pass if self.kind == StageKind::Polishing => {
                    Ok(state.with_article(Article::new("scripted article").unwrap()))
                }
                Behaviour::Pass => Ok(state),
                Behaviour::Panic => panic!("boom in {}", self.kind),
                Behaviour::Hang => {
                    futures::future::pending::<()>().await;
                    Ok(state)
                }
            }
        }
    }

    fn scripted(overrides: &[(StageKind, Behaviour)]) -> Vec<Arc<dyn PipelineStage>> {
        StageKind::ALL
            .iter()
            .map(|&kind| {
                let behaviour = overrides
                    .iter()
                    .find(|(k, _)| *k == kind)
                    .map_or(Behaviour::Pass, |(_, b)| *b);
                Arc::new(ScriptedStage { kind, behaviour }) as Arc<dyn PipelineStage>
            })
            .collect()
    }

    #[test]
    fn test_from_stages_requires_canonical_order() {
        let mut stages = scripted(&[]);
        stages.swap(0, 1);
        let err = PipelineOrchestrator::from_stages(stages, PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));

        let mut stages = scripted(&[]);
        stages.pop();
        assert!(PipelineOrchestrator::from_stages(stages, PipelineConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_scripted_stages_succeed() {
        let orchestrator =
            PipelineOrchestrator::from_stages(scripted(&[]), PipelineConfig::default()).unwrap();
        let result = orchestrator.run("Rust", GenerationOptions::default()).await;
        assert_eq!(result.article().map(Article::as_str), Some("scripted article"));
    }

    #[tokio::test]
    async fn test_panicking_stage_becomes_failure() {
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = PipelineOrchestrator::from_stages(
            scripted(&[(StageKind::Drafting, Behaviour::Panic)]),
            PipelineConfig::default(),
        )
        .unwrap()
        .with_event_sink(sink.clone());

        let result = orchestrator.run("Rust", GenerationOptions::default()).await;
        assert_eq!(
            result.reason(),
            Some("Stage drafting failed: panicked: boom in drafting")
        );
        assert_eq!(sink.events_of_type("stage.failed").len(), 1);
        assert_eq!(sink.events_of_type("pipeline.failed").len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_stage() {
        let orchestrator = PipelineOrchestrator::from_stages(
            scripted(&[(StageKind::Outlining, Behaviour::Hang)]),
            PipelineConfig::default(),
        )
        .unwrap();
        let cancel = CancellationToken::shared();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                cancel.cancel("client disconnected");
            })
        };
        let result = orchestrator
            .run_with_cancel("Rust", GenerationOptions::default(), cancel)
            .await;
        canceller.await.unwrap();

        assert_eq!(result.reason(), Some("Pipeline cancelled: client disconnected"));
    }

    #[tokio::test]
    async fn test_lifecycle_events_in_order() {
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(MockLLMProvider::new()),
            Arc::new(MockRetriever::new()),
            PipelineConfig::default(),
        )
        .with_event_sink(sink.clone());

        assert!(orchestrator
            .run("Rust", GenerationOptions::default())
            .await
            .is_success());

        let types = sink.event_types();
        assert_eq!(types.first().map(String::as_str), Some("pipeline.started"));
        assert_eq!(types.last().map(String::as_str), Some("pipeline.completed"));
        assert_eq!(
            types.iter().filter(|t| *t == "stage.completed").count(),
            4
        );
        let (_, payload) = &sink.events_of_type("stage.started")[0];
        assert_eq!(payload.as_ref().unwrap()["stage"], "curation");
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
