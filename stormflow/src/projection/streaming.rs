//! Streaming response projection.

use super::ResponseProjector;
use crate::core::ProgressEvent;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;

/// Text fragments of a streaming run, ready for a transport.
pub struct ProjectedStream {
    /// The first event was an error, so no successful output was flushed.
    /// Transports use this to pick a failure status.
    pub failed_before_flush: bool,
    /// The fragments, ending with the sentinel.
    pub fragments: BoxStream<'static, String>,
}

impl std::fmt::Debug for ProjectedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectedStream")
            .field("failed_before_flush", &self.failed_before_flush)
            .finish_non_exhaustive()
    }
}

impl ResponseProjector {
    /// Projects a progress stream into text fragments.
    ///
    /// Awaits the first event before returning so the caller can choose a
    /// status code. The sentinel is always the final fragment.
    pub async fn project_stream(
        &self,
        mut events: BoxStream<'static, ProgressEvent>,
    ) -> ProjectedStream {
        let first = events.next().await;
        let failed_before_flush = first.as_ref().is_some_and(ProgressEvent::is_error);

        let delay = Duration::from_millis(self.config.word_delay_ms);
        let sentinel = self.config.sentinel.clone();
        let fragments = stream::iter(first)
            .chain(events)
            .flat_map(move |event| fragments_for(event, delay))
            .chain(stream::once(future::ready(sentinel)))
            .boxed();

        ProjectedStream {
            failed_before_flush,
            fragments,
        }
    }
}

fn fragments_for(event: ProgressEvent, delay: Duration) -> BoxStream<'static, String> {
    match event {
        ProgressEvent::StageStarted(stage) => {
            stream::once(future::ready(format!("{}...\n", stage.label()))).boxed()
        }
        ProgressEvent::Done => stream::once(future::ready("\nDone!\n\n".to_string())).boxed(),
        ProgressEvent::ErrorOccurred(message) => {
            stream::once(future::ready(format!("Error: {message}"))).boxed()
        }
        ProgressEvent::ArticleChunk(chunk) => {
            let words: Vec<String> = chunk.split_whitespace().map(|w| format!("{w} ")).collect();
            stream::iter(words)
                .then(move |word| async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    word
                })
                .boxed()
        }
    }
}
