//! Model inference adapter
//!
//! Wraps a trained image classifier behind a lazily initialized, shared
//! handle. The forward pass runs on Tokio's blocking pool, and every failure
//! along the way (load, shape mismatch, runtime error, malformed output)
//! degrades to a synthetic-class probability of `0.0` instead of failing the
//! request.

use crate::pixels::PixelBuffer;
use crate::vector_ops::softmax;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use synthscan_core::{Error, Result};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Index of the "synthetic" class in a two-class output
pub const SYNTHETIC_CLASS_INDEX: usize = 1;

/// Default name of the output tensor holding class logits
pub const DEFAULT_OUTPUT_NAME: &str = "logits";

/// Named output tensors produced by one forward pass, flattened
pub type ModelOutputs = HashMap<String, Vec<f32>>;

/// A trained classifier operating on fixed-size pixel grids
pub trait ImageClassifier: Send + Sync {
    /// Run a forward pass
    fn predict(&self, pixels: &PixelBuffer) -> Result<ModelOutputs>;

    /// `(width, height)` the classifier expects
    fn input_size(&self) -> (u32, u32);

    /// Classifier name, for logs
    fn name(&self) -> &str;
}

/// Loads an [`ImageClassifier`]; called at most once per adapter
#[async_trait::async_trait]
pub trait ClassifierProvider: Send + Sync {
    /// Load the classifier
    async fn load(&self) -> Result<Arc<dyn ImageClassifier>>;

    /// Human-readable description of the model source
    fn describe(&self) -> String;
}

/// Provider that hands out an already-constructed classifier
pub struct PreloadedProvider {
    classifier: Arc<dyn ImageClassifier>,
}

impl PreloadedProvider {
    /// Wrap an existing classifier
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait::async_trait]
impl ClassifierProvider for PreloadedProvider {
    async fn load(&self) -> Result<Arc<dyn ImageClassifier>> {
        Ok(Arc::clone(&self.classifier))
    }

    fn describe(&self) -> String {
        format!("preloaded:{}", self.classifier.name())
    }
}

/// Owns the lazily loaded classifier and turns its output into a probability
pub struct ModelInferenceAdapter {
    provider: Box<dyn ClassifierProvider>,
    classifier: OnceCell<Arc<dyn ImageClassifier>>,
    output_name: String,
    input_size: (u32, u32),
}

impl ModelInferenceAdapter {
    /// Create an adapter; the classifier is loaded on first use
    pub fn new(provider: impl ClassifierProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            classifier: OnceCell::new(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            input_size: (
                crate::pixels::DEFAULT_INPUT_SIZE,
                crate::pixels::DEFAULT_INPUT_SIZE,
            ),
        }
    }

    /// Read class logits from a differently named output tensor
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Set the pixel grid size requested from converters
    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_size = (width, height);
        self
    }

    /// `(width, height)` of the pixel grid to hand to [`score`](Self::score)
    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    /// Whether the classifier has been loaded
    pub fn is_loaded(&self) -> bool {
        self.classifier.initialized()
    }

    /// Get the classifier, loading it exactly once even under concurrent
    /// first use. A failed load is not cached and is retried next call.
    pub async fn classifier(&self) -> Result<Arc<dyn ImageClassifier>> {
        let classifier = self
            .classifier
            .get_or_try_init(|| async {
                let start = Instant::now();
                info!("Loading classifier from {}", self.provider.describe());
                let classifier = self.provider.load().await?;
                info!(
                    "Loaded classifier '{}' in {}ms",
                    classifier.name(),
                    start.elapsed().as_millis()
                );
                Ok::<_, Error>(classifier)
            })
            .await?;

        Ok(Arc::clone(classifier))
    }

    /// Probability in `[0, 1]` that the pixels show synthetic content.
    ///
    /// Returns `0.0` on any failure.
    pub async fn score(&self, pixels: PixelBuffer) -> f32 {
        match self.try_score(pixels).await {
            Ok(probability) => probability,
            Err(e) => {
                warn!("Inference degraded to 0.0: {}", e);
                metrics::counter!("synthscan_inference_failures_total", "stage" => "inference")
                    .increment(1);
                0.0
            }
        }
    }

    async fn try_score(&self, pixels: PixelBuffer) -> Result<f32> {
        let classifier = self.classifier().await?;

        let expected = classifier.input_size();
        if (pixels.width(), pixels.height()) != expected {
            return Err(Error::inference(format!(
                "classifier '{}' expects {}x{} input, got {}x{}",
                classifier.name(),
                expected.0,
                expected.1,
                pixels.width(),
                pixels.height()
            )));
        }

        let start = Instant::now();
        let mut outputs = tokio::task::spawn_blocking(move || classifier.predict(&pixels))
            .await
            .map_err(|e| Error::inference(format!("inference task failed: {}", e)))??;
        debug!("Forward pass took {}us", start.elapsed().as_micros());

        let logits = outputs.remove(&self.output_name).ok_or_else(|| {
            Error::inference(format!("output tensor '{}' missing", self.output_name))
        })?;

        synthetic_probability(&logits)
    }
}

/// Softmax over the logits, then the synthetic-class probability
pub fn synthetic_probability(logits: &[f32]) -> Result<f32> {
    if logits.len() <= SYNTHETIC_CLASS_INDEX {
        return Err(Error::inference(format!(
            "expected at least {} logits, got {}",
            SYNTHETIC_CLASS_INDEX + 1,
            logits.len()
        )));
    }

    let probabilities = softmax(logits);
    Ok(probabilities[SYNTHETIC_CLASS_INDEX].clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClassifier {
        outputs: ModelOutputs,
    }

    impl ImageClassifier for FixedClassifier {
        fn predict(&self, _pixels: &PixelBuffer) -> Result<ModelOutputs> {
            Ok(self.outputs.clone())
        }

        fn input_size(&self) -> (u32, u32) {
            (4, 4)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct CountingProvider {
        logits: Vec<f32>,
        loads: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ClassifierProvider for CountingProvider {
        async fn load(&self) -> Result<Arc<dyn ImageClassifier>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let outputs = HashMap::from([("logits".to_string(), self.logits.clone())]);
            Ok(Arc::new(FixedClassifier { outputs }))
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    fn adapter(logits: Vec<f32>) -> (ModelInferenceAdapter, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            logits,
            loads: Arc::clone(&loads),
        };
        (
            ModelInferenceAdapter::new(provider).with_input_size(4, 4),
            loads,
        )
    }

    #[test]
    fn test_synthetic_probability() {
        let p = synthetic_probability(&[0.0, 0.0]).unwrap();
        assert!((p - 0.5).abs() < 1e-6);

        assert!(synthetic_probability(&[3.0]).is_err());
        assert!(synthetic_probability(&[]).is_err());
    }

    #[tokio::test]
    async fn test_score_two_class_output() {
        let (adapter, loads) = adapter(vec![-2.0, 2.0]);
        let score = adapter.score(PixelBuffer::filled(4, 4, 0.0)).await;

        let expected = 1.0 / (1.0 + (-4.0f32).exp());
        assert!((score - expected).abs() < 1e-5);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_output_scores_zero() {
        let (adapter, _) = adapter(vec![5.0]);
        assert_eq!(adapter.score(PixelBuffer::filled(4, 4, 0.0)).await, 0.0);
    }

    #[tokio::test]
    async fn test_wrong_input_size_scores_zero() {
        let (adapter, _) = adapter(vec![-2.0, 2.0]);
        assert_eq!(adapter.score(PixelBuffer::filled(8, 8, 0.0)).await, 0.0);
    }

    #[tokio::test]
    async fn test_missing_output_scores_zero() {
        let (adapter, _) = adapter(vec![-2.0, 2.0]);
        let adapter = adapter.with_output_name("probabilities");
        assert_eq!(adapter.score(PixelBuffer::filled(4, 4, 0.0)).await, 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_loads_once() {
        let (adapter, loads) = adapter(vec![0.0, 1.0]);
        let adapter = Arc::new(adapter);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let adapter = Arc::clone(&adapter);
                tokio::spawn(async move { adapter.score(PixelBuffer::filled(4, 4, 0.0)).await })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            assert!(task.unwrap() > 0.5);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(adapter.is_loaded());
    }
}
