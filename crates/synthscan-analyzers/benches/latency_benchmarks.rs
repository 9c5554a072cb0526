//! Latency benchmarks for the heuristic and dispatch paths
//!
//! The heuristic early exit should answer in microseconds, far below the
//! cost of a model forward pass; these benches keep that visible.
//!
//! Run with: cargo bench -p synthscan-analyzers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Runtime;

use synthscan_analyzers::pixels::PixelBuffer;
use synthscan_analyzers::{
    softmax, Dispatcher, FusionPipeline, HeuristicScorer, ImageClassifier, ModelInferenceAdapter,
    ModelOutputs, PreloadedProvider,
};
use synthscan_core::{keys, EncodedImage, MetadataRecord, Result};

struct ConstantClassifier;

impl ImageClassifier for ConstantClassifier {
    fn predict(&self, _pixels: &PixelBuffer) -> Result<ModelOutputs> {
        Ok(HashMap::from([("logits".to_string(), vec![0.1, 0.4])]))
    }

    fn input_size(&self) -> (u32, u32) {
        (224, 224)
    }

    fn name(&self) -> &str {
        "constant"
    }
}

fn generated_metadata() -> MetadataRecord {
    MetadataRecord::new()
        .with_block(keys::PNG)
        .with(keys::PIXEL_WIDTH, 1024)
        .with(keys::PIXEL_HEIGHT, 1024)
}

fn camera_metadata() -> MetadataRecord {
    MetadataRecord::new()
        .with_block(keys::EXIF)
        .with_block(keys::GPS)
        .with(keys::PIXEL_WIDTH, 4032)
        .with(keys::PIXEL_HEIGHT, 3024)
}

/// Benchmark the metadata heuristic
fn benchmark_heuristic(c: &mut Criterion) {
    let cases = vec![
        ("generated", generated_metadata()),
        ("camera", camera_metadata()),
        ("empty", MetadataRecord::new()),
    ];

    let mut group = c.benchmark_group("Heuristic_Scorer");
    group.sample_size(100);

    for (name, metadata) in cases {
        group.bench_with_input(BenchmarkId::new("score", name), &metadata, |b, metadata| {
            b.iter(|| HeuristicScorer::score(black_box(metadata)));
        });
    }

    group.finish();
}

/// Benchmark softmax over a two-class output
fn benchmark_softmax(c: &mut Criterion) {
    let logits: Vec<f32> = vec![0.3, 1.7];
    c.bench_function("softmax_two_class", |b| {
        b.iter(|| softmax(black_box(logits.as_slice())));
    });
}

/// Dispatch overhead on the early-exit path versus the fused path
fn benchmark_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let classifier: Arc<dyn ImageClassifier> = Arc::new(ConstantClassifier);
    let adapter = Arc::new(ModelInferenceAdapter::new(PreloadedProvider::new(classifier)));
    let dispatcher = Dispatcher::builder()
        .strategy(FusionPipeline::image(adapter))
        .build();

    // Undecodable payload: the fused path measures heuristic plus fallback
    let media = EncodedImage::new(vec![0u8; 64]);
    let generated = generated_metadata();
    let camera = camera_metadata();

    let mut group = c.benchmark_group("Dispatch");
    group.sample_size(100);

    group.bench_function("early_exit", |b| {
        b.iter(|| {
            rt.block_on(async {
                dispatcher
                    .analyze_image(black_box(&media), black_box(&generated))
                    .await
                    .unwrap()
            })
        });
    });

    group.bench_function("fused_conversion_fallback", |b| {
        b.iter(|| {
            rt.block_on(async {
                dispatcher
                    .analyze_image(black_box(&media), black_box(&camera))
                    .await
                    .unwrap()
            })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_heuristic,
    benchmark_softmax,
    benchmark_dispatch
);
criterion_main!(benches);
