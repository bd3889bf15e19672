//! Lazy progress streams over a pipeline run.
//!
//! Nothing runs until the stream is polled. Each poll advances the run by
//! one unit: announcing a stage, executing it, or handing out a chunk of the
//! article. Dropping the stream cancels the run.

use super::orchestrator::{cancellation_reason, transition, PipelineOrchestrator};
use crate::cancellation::{CancelOnDrop, CancellationToken};
use crate::core::{ProgressEvent, RunPhase, StageKind, Topic};
use crate::errors::StageError;
use crate::events::LifecycleEvent;
use crate::observability::{pipeline_span, SpanTimer};
use crate::providers::GenerationOptions;
use crate::stages::{RunState, StageContext};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{info, warn, Instrument, Span};
use uuid::Uuid;

const DROP_REASON: &str = "stream dropped by consumer";

impl PipelineOrchestrator {
    /// Streams the progress of a run.
    ///
    /// A successful run yields one `StageStarted` per stage, then `Done`,
    /// then the article as `ArticleChunk`s. A failed run ends with a single
    /// `ErrorOccurred`. A cancelled run simply ends.
    #[must_use]
    pub fn run_streaming(
        &self,
        topic: &str,
        options: GenerationOptions,
    ) -> BoxStream<'static, ProgressEvent> {
        self.run_streaming_with_cancel(topic, options, CancellationToken::shared())
    }

    /// Like [`run_streaming`](Self::run_streaming), observing an external token.
    #[must_use]
    pub fn run_streaming_with_cancel(
        &self,
        topic: &str,
        options: GenerationOptions,
        cancel: Arc<CancellationToken>,
    ) -> BoxStream<'static, ProgressEvent> {
        let run_id = Uuid::new_v4();
        let run = StreamRun {
            orchestrator: self.clone(),
            ctx: StageContext::new(run_id, options, cancel.clone()),
            guard: CancelOnDrop::new(cancel, DROP_REASON),
            timer: SpanTimer::start("pipeline"),
            phase: RunPhase::Idle,
            span: pipeline_span(run_id, topic),
            step: Step::Start {
                topic: topic.to_string(),
            },
        };

        stream::unfold(run, |mut run| async move {
            let span = run.span.clone();
            let event = run.advance().instrument(span).await?;
            Some((event, run))
        })
        .boxed()
    }
}

enum Step {
    Start { topic: String },
    Announce { state: RunState, index: usize },
    Execute { state: RunState, index: usize },
    Chunks { chunks: std::vec::IntoIter<String> },
    Finished,
}

struct StreamRun {
    orchestrator: PipelineOrchestrator,
    ctx: StageContext,
    guard: CancelOnDrop,
    timer: SpanTimer,
    phase: RunPhase,
    span: Span,
    step: Step,
}

impl StreamRun {
    fn run_id(&self) -> Uuid {
        self.ctx.run_id()
    }

    async fn advance(&mut self) -> Option<ProgressEvent> {
        loop {
            match std::mem::replace(&mut self.step, Step::Finished) {
                Step::Start { topic } => match Topic::parse(&topic) {
                    Ok(topic) => {
                        info!(run_id = %self.run_id(), topic = %topic, "Streaming pipeline started");
                        LifecycleEvent::PipelineStarted {
                            topic: topic.to_string(),
                            streaming: true,
                        }
                        .emit_to(self.orchestrator.events.as_ref(), self.run_id())
                        .await;
                        self.step = Step::Announce {
                            state: RunState::new(topic),
                            index: 0,
                        };
                    }
                    Err(e) => return Some(self.fail(e.to_string()).await),
                },
                Step::Announce { state, index } => {
                    if let Some(reason) = cancellation_reason(&self.ctx) {
                        self.cancelled(reason).await;
                        return None;
                    }
                    let Some(stage) = self.orchestrator.stages.get(index) else {
                        return Some(self.complete(state).await);
                    };
                    let kind = stage.kind();
                    self.enter(RunPhase::running(kind));
                    self.step = Step::Execute { state, index };
                    return Some(ProgressEvent::StageStarted(kind));
                }
                Step::Execute { state, index } => {
                    let stage = self.orchestrator.stages[index].clone();
                    match self.orchestrator.execute_stage(&stage, state, &self.ctx).await {
                        Ok(next) => {
                            self.step = Step::Announce {
                                state: next,
                                index: index + 1,
                            };
                        }
                        Err(e) if e.is_cancellation() => {
                            let reason = cancellation_reason(&self.ctx)
                                .unwrap_or_else(|| e.cause.to_string());
                            self.cancelled(reason).await;
                            return None;
                        }
                        Err(e) => return Some(self.fail(e.to_string()).await),
                    }
                }
                Step::Chunks { mut chunks } => {
                    if let Some(reason) = cancellation_reason(&self.ctx) {
                        self.cancelled(reason).await;
                        return None;
                    }
                    let Some(chunk) = chunks.next() else {
                        self.guard.disarm();
                        return None;
                    };
                    self.step = Step::Chunks { chunks };
                    return Some(ProgressEvent::ArticleChunk(chunk));
                }
                Step::Finished => return None,
            }
        }
    }

    async fn complete(&mut self, state: RunState) -> ProgressEvent {
        let Some(article) = state.into_article() else {
            let reason = StageError::missing_input(StageKind::Polishing, "article").to_string();
            return self.fail(reason).await;
        };

        self.enter(RunPhase::Done);
        let duration_ms = self.timer.elapsed_ms();
        info!(run_id = %self.run_id(), duration_ms, words = article.word_count(), "Pipeline completed");
        LifecycleEvent::PipelineCompleted {
            duration_ms,
            article_words: article.word_count(),
        }
        .emit_to(self.orchestrator.events.as_ref(), self.run_id())
        .await;

        self.step = Step::Chunks {
            chunks: article
                .chunks(self.orchestrator.config.article_chunk_words)
                .into_iter(),
        };
        ProgressEvent::Done
    }

    fn enter(&mut self, phase: RunPhase) {
        self.phase = transition(self.run_id(), self.phase, phase);
    }

    async fn fail(&mut self, reason: String) -> ProgressEvent {
        self.enter(RunPhase::Failed);
        self.guard.disarm();
        self.orchestrator
            .fail(self.run_id(), reason.clone(), &self.timer)
            .await;
        ProgressEvent::ErrorOccurred(reason)
    }

    async fn cancelled(&mut self, reason: String) {
        // Cancelling while chunks drain leaves the run Done.
        if !self.phase.is_terminal() {
            self.enter(RunPhase::Failed);
        }
        self.guard.disarm();
        self.orchestrator.cancelled(self.run_id(), reason).await;
    }
}

impl Drop for StreamRun {
    fn drop(&mut self) {
        if self.guard.is_armed() {
            warn!(run_id = %self.run_id(), "Stream dropped before completion, cancelling run");
            LifecycleEvent::PipelineCancelled {
                reason: DROP_REASON.to_string(),
            }
            .try_emit_to(self.orchestrator.events.as_ref(), self.run_id());
        }
    }
}
