//! Two-stage fusion pipeline
//!
//! The metadata heuristic always runs first. When its score reaches the
//! early-exit threshold the asset is flagged without touching the model;
//! otherwise the media is converted to a pixel grid, scored by the model,
//! and the two signals are combined linearly.

use crate::heuristic::HeuristicScorer;
use crate::inference::ModelInferenceAdapter;
use crate::pixels::{ImageNetConverter, PixelBuffer, PixelConverter};
use crate::strategy::AnalysisStrategy;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use synthscan_core::{AnalysisResult, EncodedImage, Error, MediaCapability, MetadataRecord, Result};
use tracing::{debug, warn};

/// Heuristic score at or above which inference is skipped
pub const EARLY_EXIT_THRESHOLD: u32 = 60;

/// Weight of the model probability in the fused confidence
pub const MODEL_WEIGHT: f32 = 0.7;

/// Weight of the normalized heuristic score in the fused confidence
pub const HEURISTIC_WEIGHT: f32 = 0.3;

/// Fusion constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    /// Heuristic score at or above which inference is skipped
    pub early_exit_threshold: u32,

    /// Weight of the model probability
    pub model_weight: f32,

    /// Weight of `heuristic_score / 100`
    pub heuristic_weight: f32,

    /// Fused confidence above which an asset is flagged synthetic
    pub decision_threshold: f32,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            early_exit_threshold: EARLY_EXIT_THRESHOLD,
            model_weight: MODEL_WEIGHT,
            heuristic_weight: HEURISTIC_WEIGHT,
            decision_threshold: AnalysisResult::DECISION_THRESHOLD,
        }
    }
}

impl FusionParams {
    /// Check weights and threshold are within `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::config(format!("{} must be within [0, 1], got {}", name, value)))
            }
        };

        unit("model_weight", self.model_weight)?;
        unit("heuristic_weight", self.heuristic_weight)?;
        unit("decision_threshold", self.decision_threshold)?;
        Ok(())
    }

    /// Whether a heuristic score short-circuits inference
    pub fn is_early_exit(&self, heuristic_score: u32) -> bool {
        heuristic_score >= self.early_exit_threshold
    }

    /// Linear combination of the model probability and the heuristic score
    pub fn fuse(&self, model_score: f32, heuristic_score: u32) -> f32 {
        model_score * self.model_weight + (heuristic_score as f32 / 100.0) * self.heuristic_weight
    }
}

/// Heuristic-first analysis strategy for one media representation `M`.
///
/// Media is cloned into the blocking pool for conversion, so `M` should be
/// cheap to clone (e.g. [`EncodedImage`], which shares its bytes).
pub struct FusionPipeline<M, C> {
    name: String,
    capability: MediaCapability,
    params: FusionParams,
    converter: Arc<C>,
    adapter: Arc<ModelInferenceAdapter>,
    _media: PhantomData<fn() -> M>,
}

impl FusionPipeline<EncodedImage, ImageNetConverter> {
    /// Image pipeline decoding encoded bytes with the ImageNet converter
    pub fn image(adapter: Arc<ModelInferenceAdapter>) -> Self {
        Self::new(MediaCapability::Image, ImageNetConverter::new(), adapter).with_name("image-fusion")
    }
}

impl<M, C> FusionPipeline<M, C>
where
    M: Clone + Send + Sync + 'static,
    C: PixelConverter<M> + 'static,
{
    /// Create a pipeline with default fusion constants
    pub fn new(capability: MediaCapability, converter: C, adapter: Arc<ModelInferenceAdapter>) -> Self {
        Self {
            name: format!("{}-fusion", capability),
            capability,
            params: FusionParams::default(),
            converter: Arc::new(converter),
            adapter,
            _media: PhantomData,
        }
    }

    /// Override the fusion constants. Fails with [`Error::Config`] when a
    /// weight or the decision threshold is outside `[0, 1]`.
    pub fn with_params(mut self, params: FusionParams) -> Result<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    /// Set the pipeline name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fusion constants in use
    pub fn params(&self) -> &FusionParams {
        &self.params
    }

    /// Synchronous fast path: the result when metadata alone is conclusive
    pub fn try_early_exit(&self, metadata: &MetadataRecord) -> Option<AnalysisResult> {
        let heuristic = HeuristicScorer::score(metadata);
        self.params
            .is_early_exit(heuristic)
            .then(|| AnalysisResult::from_heuristic(heuristic))
    }

    /// Run the full pipeline. Always produces a result: conversion and
    /// inference faults only remove the model's contribution.
    pub async fn run(&self, media: &M, metadata: &MetadataRecord) -> AnalysisResult {
        let start = Instant::now();
        let heuristic = HeuristicScorer::score(metadata);

        if self.params.is_early_exit(heuristic) {
            debug!(
                "{}: heuristic score {} >= {}, skipping inference",
                self.name, heuristic, self.params.early_exit_threshold
            );
            metrics::counter!("synthscan_analyses_total", "path" => "early_exit").increment(1);
            return AnalysisResult::from_heuristic(heuristic);
        }

        let model_score = match self.convert(media).await {
            Ok(pixels) => self.adapter.score(pixels).await,
            Err(e) => {
                warn!("{}: pixel conversion failed, using heuristic only: {}", self.name, e);
                metrics::counter!("synthscan_inference_failures_total", "stage" => "conversion")
                    .increment(1);
                0.0
            }
        };

        let fused = self.params.fuse(model_score, heuristic);
        let result =
            AnalysisResult::from_confidence_with_threshold(fused, self.params.decision_threshold);

        debug!(
            "{}: heuristic={} model={:.4} fused={:.4} in {}us",
            self.name,
            heuristic,
            model_score,
            result.confidence(),
            start.elapsed().as_micros()
        );
        metrics::counter!("synthscan_analyses_total", "path" => "fused").increment(1);

        result
    }

    /// Decode and resize on the blocking pool
    async fn convert(&self, media: &M) -> Result<PixelBuffer> {
        let (width, height) = self.adapter.input_size();
        let converter = Arc::clone(&self.converter);
        let media = media.clone();

        tokio::task::spawn_blocking(move || converter.to_pixels(&media, width, height))
            .await
            .map_err(|e| Error::conversion(format!("conversion task failed: {}", e)))?
    }
}

#[async_trait::async_trait]
impl<M, C> AnalysisStrategy for FusionPipeline<M, C>
where
    M: Clone + Send + Sync + 'static,
    C: PixelConverter<M> + 'static,
{
    type Media = M;

    fn capability(&self) -> MediaCapability {
        self.capability
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, media: &M, metadata: &MetadataRecord) -> Option<AnalysisResult> {
        Some(self.run(media, metadata).await)
    }
}
