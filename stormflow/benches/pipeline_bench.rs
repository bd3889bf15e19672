//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures::StreamExt;
use std::sync::Arc;
use stormflow::config::PipelineConfig;
use stormflow::core::{Article, Outline};
use stormflow::pipeline::PipelineOrchestrator;
use stormflow::providers::{GenerationOptions, MockLLMProvider, MockRetriever};

fn orchestrator() -> PipelineOrchestrator {
    PipelineOrchestrator::new(
        Arc::new(MockLLMProvider::new()),
        Arc::new(MockRetriever::new()),
        PipelineConfig::default(),
    )
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let orchestrator = orchestrator();

    c.bench_function("blocking_run_mock", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(
                orchestrator
                    .run("Photosynthesis", GenerationOptions::default())
                    .await,
            )
        });
    });

    c.bench_function("streaming_run_mock", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(
                orchestrator
                    .run_streaming("Photosynthesis", GenerationOptions::default())
                    .count()
                    .await,
            )
        });
    });
}

fn parsing_benchmark(c: &mut Criterion) {
    let raw = "# Photosynthesis\n## Overview\n- Light reactions\n- Calvin cycle\n## History\n### Discovery\n## Applications\n1. Agriculture\n2. Biofuels";
    c.bench_function("outline_parse", |b| {
        b.iter(|| black_box(Outline::parse(black_box(raw), "Photosynthesis")));
    });

    let article = Article::new("word ".repeat(2_000)).expect("non-empty article");
    c.bench_function("article_chunks", |b| {
        b.iter(|| black_box(article.chunks(32)));
    });
}

criterion_group!(benches, pipeline_benchmark, parsing_benchmark);
criterion_main!(benches);
