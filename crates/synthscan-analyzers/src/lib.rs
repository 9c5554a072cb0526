//! SynthScan Analyzers
//!
//! Strategies estimating whether a media asset was synthetically generated.
//!
//! Analysis is two-stage:
//! - A metadata heuristic runs first and costs microseconds
//! - When the heuristic is not conclusive, a Candle image classifier scores
//!   the pixels and the two signals are fused
//!
//! Strategies are registered per media capability in a [`Dispatcher`].

pub mod config;
pub mod dispatcher;
pub mod fusion;
pub mod heuristic;
pub mod inference;
pub mod model_loader;
pub mod pixels;
pub mod strategy;
pub mod vector_ops;

pub use config::{AnalyzerConfig, DeviceSpec, FusionSpec, ModelSourceSpec, ModelSpec};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use fusion::{FusionParams, FusionPipeline};
pub use heuristic::{HeuristicBreakdown, HeuristicScorer};
pub use inference::{
    ClassifierProvider, ImageClassifier, ModelInferenceAdapter, ModelOutputs, PreloadedProvider,
};
pub use model_loader::{CandleVitProvider, DeviceType, ModelConfig, ModelSource};
pub use pixels::{ImageNetConverter, PixelBuffer, PixelConverter};
pub use strategy::{AnalysisStrategy, ErasedStrategy, MediaPayload};
pub use vector_ops::softmax;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::dispatcher::Dispatcher;
    pub use crate::fusion::{FusionParams, FusionPipeline};
    pub use crate::heuristic::HeuristicScorer;
    pub use crate::inference::{ClassifierProvider, ImageClassifier, ModelInferenceAdapter};
    pub use crate::model_loader::{CandleVitProvider, ModelConfig};
    pub use crate::pixels::{PixelBuffer, PixelConverter};
    pub use crate::strategy::AnalysisStrategy;
    pub use synthscan_core::prelude::*;
}
