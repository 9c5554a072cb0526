//! Mock classifiers, providers and converters for testing
//!
//! Provides configurable implementations of the inference and conversion
//! traits so pipelines and dispatch can be exercised without model weights.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use synthscan_analyzers::{
    ClassifierProvider, ImageClassifier, ModelInferenceAdapter, ModelOutputs, PixelBuffer,
    PixelConverter, PreloadedProvider,
};
use synthscan_core::{keys, Error, MetadataRecord, Result};

/// Edge length used by mocks
pub const MOCK_INPUT_SIZE: u32 = 8;

/// A configurable mock classifier for testing
pub struct MockClassifier {
    name: String,
    logits: Vec<f32>,
    output_name: String,
    input_size: u32,
    fail: bool,
    call_count: AtomicU32,
}

impl MockClassifier {
    /// Create a new mock classifier with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            logits: vec![0.0, 0.0],
            output_name: "logits".to_string(),
            input_size: MOCK_INPUT_SIZE,
            fail: false,
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the logits this classifier will return
    pub fn with_logits(mut self, logits: Vec<f32>) -> Self {
        self.logits = logits;
        self
    }

    /// Report logits under a different output name
    pub fn with_output_name(mut self, name: &str) -> Self {
        self.output_name = name.to_string();
        self
    }

    /// Set the expected input size
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    /// Make every forward pass fail
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Get the number of times predict was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl ImageClassifier for MockClassifier {
    fn predict(&self, _pixels: &PixelBuffer) -> Result<ModelOutputs> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(Error::inference("Simulated classifier failure"));
        }

        Ok(HashMap::from([(self.output_name.clone(), self.logits.clone())]))
    }

    fn input_size(&self) -> (u32, u32) {
        (self.input_size, self.input_size)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A provider that always fails to load - for testing error paths
pub struct FailingProvider;

#[async_trait]
impl ClassifierProvider for FailingProvider {
    async fn load(&self) -> Result<Arc<dyn ImageClassifier>> {
        Err(Error::model_unavailable("Simulated load failure"))
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

/// Converter producing a constant grid, counting calls
#[derive(Default)]
pub struct SolidConverter {
    calls: Arc<AtomicU32>,
}

impl SolidConverter {
    /// Shared call counter
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

impl<M> PixelConverter<M> for SolidConverter {
    fn to_pixels(&self, _media: &M, width: u32, height: u32) -> Result<PixelBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PixelBuffer::filled(width, height, 0.5))
    }
}

/// Converter that blocks its thread for a fixed time, like a large decode
pub struct SlowConverter {
    delay: Duration,
}

impl SlowConverter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl<M> PixelConverter<M> for SlowConverter {
    fn to_pixels(&self, _media: &M, width: u32, height: u32) -> Result<PixelBuffer> {
        std::thread::sleep(self.delay);
        Ok(PixelBuffer::filled(width, height, 0.5))
    }
}

/// Converter that always fails
pub struct FailingConverter;

impl<M> PixelConverter<M> for FailingConverter {
    fn to_pixels(&self, _media: &M, _width: u32, _height: u32) -> Result<PixelBuffer> {
        Err(Error::conversion("Simulated decode failure"))
    }
}

/// Adapter backed by a shared mock classifier
pub fn adapter_for(classifier: &Arc<MockClassifier>) -> Arc<ModelInferenceAdapter> {
    let shared: Arc<dyn ImageClassifier> = classifier.clone();
    let size = classifier.input_size().0;
    Arc::new(ModelInferenceAdapter::new(PreloadedProvider::new(shared)).with_input_size(size, size))
}

/// Metadata scoring 70: no EXIF, PNG block, no GPS, 512x512
pub fn generated_metadata() -> MetadataRecord {
    MetadataRecord::new()
        .with_block(keys::PNG)
        .with(keys::PIXEL_WIDTH, 512)
        .with(keys::PIXEL_HEIGHT, 512)
}

/// Metadata scoring 0: EXIF and GPS blocks, 101x57
pub fn camera_metadata() -> MetadataRecord {
    MetadataRecord::new()
        .with_block(keys::EXIF)
        .with_block(keys::GPS)
        .with(keys::PIXEL_WIDTH, 101)
        .with(keys::PIXEL_HEIGHT, 57)
}

/// Softmax probability of class 1 for a two-class output
pub fn class_one_probability(logits: [f32; 2]) -> f32 {
    1.0 / (1.0 + (logits[0] - logits[1]).exp())
}
