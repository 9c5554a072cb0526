//! Model loading for Candle-based image classifiers

use crate::inference::{ClassifierProvider, ImageClassifier, DEFAULT_OUTPUT_NAME};
use crate::pixels::DEFAULT_INPUT_SIZE;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use synthscan_core::{Error, Result};
use tracing::info;

#[cfg(feature = "ml-models")]
use crate::{inference::ModelOutputs, pixels::PixelBuffer};
#[cfg(feature = "ml-models")]
use candle_core::{DType, Device, Module, Tensor};
#[cfg(feature = "ml-models")]
use candle_nn::VarBuilder;
#[cfg(feature = "ml-models")]
use candle_transformers::models::vit;

/// Configuration for loading an image classifier
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Source of the model weights
    pub source: ModelSource,

    /// Optional ViT configuration JSON; defaults to ViT-B/16 at 224px
    pub config_path: Option<PathBuf>,

    /// Device to run inference on
    pub device: DeviceType,

    /// Number of output classes
    pub num_labels: usize,

    /// Edge length of the square model input
    pub input_size: u32,

    /// Name under which logits are reported
    pub output_name: String,
}

/// Source location for model weights
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Load from local file system
    LocalPath(PathBuf),

    /// Download from Hugging Face Hub
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
        filename: String,
    },
}

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// CPU inference (always available)
    Cpu,
    /// CUDA GPU inference (if available)
    Cuda(usize),
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: ModelSource::LocalPath(PathBuf::new()),
            config_path: None,
            device: DeviceType::Cpu,
            num_labels: 2,
            input_size: DEFAULT_INPUT_SIZE,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

impl ModelConfig {
    /// Create a model configuration from a local safetensors file
    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::LocalPath(path.into()),
            ..Default::default()
        }
    }

    /// Create a model configuration from Hugging Face
    pub fn from_hf(repo_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo_id: repo_id.into(),
                revision: None,
                filename: filename.into(),
            },
            ..Default::default()
        }
    }

    /// Set the ViT configuration file
    pub fn with_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Set device
    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    /// Set the number of output classes
    pub fn with_num_labels(mut self, num_labels: usize) -> Self {
        self.num_labels = num_labels;
        self
    }

    /// Set the square input edge length
    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    /// Set Hugging Face revision
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        if let ModelSource::HuggingFace { repo_id, filename, .. } = self.source {
            self.source = ModelSource::HuggingFace {
                repo_id,
                revision: Some(revision.into()),
                filename,
            };
        }
        self
    }

    /// Resolve the weights file, downloading it if needed.
    ///
    /// A missing artifact is a fatal start-up condition and reported as
    /// [`Error::ModelUnavailable`].
    pub fn resolve_weights(&self) -> Result<PathBuf> {
        match &self.source {
            ModelSource::LocalPath(path) => {
                if !path.is_file() {
                    return Err(Error::model_unavailable(format!(
                        "model file not found: {}",
                        path.display()
                    )));
                }
                Ok(path.clone())
            }
            ModelSource::HuggingFace {
                repo_id,
                revision,
                filename,
            } => download_from_hf(repo_id, revision.as_deref(), filename),
        }
    }

    /// Short description of the model source, for logs
    pub fn describe(&self) -> String {
        match &self.source {
            ModelSource::LocalPath(path) => path.display().to_string(),
            ModelSource::HuggingFace {
                repo_id, filename, ..
            } => format!("hf://{}/{}", repo_id, filename),
        }
    }
}

#[cfg(feature = "ml-models")]
fn download_from_hf(repo_id: &str, revision: Option<&str>, filename: &str) -> Result<PathBuf> {
    use hf_hub::{api::sync::Api, Repo, RepoType};

    info!("Fetching model from Hugging Face: {} ({})", repo_id, filename);

    let api = Api::new()
        .map_err(|e| Error::model_unavailable(format!("failed to initialize HF API: {}", e)))?;

    let repo = api.repo(Repo::with_revision(
        repo_id.to_string(),
        RepoType::Model,
        revision.unwrap_or("main").to_string(),
    ));

    repo.get(filename).map_err(|e| {
        Error::model_unavailable(format!("failed to download {} from {}: {}", filename, repo_id, e))
    })
}

#[cfg(not(feature = "ml-models"))]
fn download_from_hf(repo_id: &str, _revision: Option<&str>, _filename: &str) -> Result<PathBuf> {
    Err(Error::model_unavailable(format!(
        "cannot fetch '{}': built without the ml-models feature",
        repo_id
    )))
}

/// Loads a Vision Transformer classifier from safetensors weights.
///
/// The weights path is resolved eagerly in [`CandleVitProvider::new`] so a
/// missing artifact stops start-up; the weights themselves are only mapped
/// and the model built on first use.
pub struct CandleVitProvider {
    config: ModelConfig,
    weights_path: PathBuf,
}

impl CandleVitProvider {
    /// Resolve the weights and prepare a provider
    pub fn new(config: ModelConfig) -> Result<Self> {
        let weights_path = config.resolve_weights()?;
        if let Some(config_path) = &config.config_path {
            if !config_path.is_file() {
                return Err(Error::model_unavailable(format!(
                    "model config not found: {}",
                    config_path.display()
                )));
            }
        }

        info!("Model weights resolved to {}", weights_path.display());
        Ok(Self {
            config,
            weights_path,
        })
    }

    /// Path of the resolved weights file
    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }

    /// The configuration this provider was built from
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl ClassifierProvider for CandleVitProvider {
    async fn load(&self) -> Result<Arc<dyn ImageClassifier>> {
        let config = self.config.clone();
        let weights_path = self.weights_path.clone();

        let classifier = tokio::task::spawn_blocking(move || load_vit(&config, &weights_path))
            .await
            .map_err(|e| Error::internal(format!("model load task failed: {}", e)))??;

        Ok(classifier)
    }

    fn describe(&self) -> String {
        self.config.describe()
    }
}

#[cfg(feature = "ml-models")]
fn load_vit(config: &ModelConfig, weights_path: &Path) -> Result<Arc<dyn ImageClassifier>> {
    let device = create_device(config.device)?;

    let vit_config = match &config.config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<vit::Config>(&content)?
        }
        None => vit::Config::vit_base_patch16_224(),
    };

    // SAFETY: the weights file is treated as read-only for the process lifetime.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
            .map_err(|e| Error::model_unavailable(format!("failed to map safetensors: {}", e)))?
    };

    let model = vit::Model::new(&vit_config, config.num_labels, vb)
        .map_err(|e| Error::model_unavailable(format!("failed to build ViT: {}", e)))?;

    let name = weights_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("vit")
        .to_string();

    Ok(Arc::new(VitClassifier {
        model,
        device,
        name,
        input_size: config.input_size,
        output_name: config.output_name.clone(),
    }))
}

#[cfg(not(feature = "ml-models"))]
fn load_vit(_config: &ModelConfig, weights_path: &Path) -> Result<Arc<dyn ImageClassifier>> {
    Err(Error::model_unavailable(format!(
        "cannot load {}: built without the ml-models feature",
        weights_path.display()
    )))
}

/// Create Candle device from device type
#[cfg(feature = "ml-models")]
fn create_device(device_type: DeviceType) -> Result<Device> {
    match device_type {
        DeviceType::Cpu => Ok(Device::Cpu),
        DeviceType::Cuda(idx) => Device::new_cuda(idx)
            .map_err(|e| Error::model_unavailable(format!("failed to create CUDA device: {}", e))),
        DeviceType::Metal(idx) => Device::new_metal(idx)
            .map_err(|e| Error::model_unavailable(format!("failed to create Metal device: {}", e))),
    }
}

/// Vision Transformer sequence classifier
#[cfg(feature = "ml-models")]
pub struct VitClassifier {
    model: vit::Model,
    device: Device,
    name: String,
    input_size: u32,
    output_name: String,
}

#[cfg(feature = "ml-models")]
impl ImageClassifier for VitClassifier {
    fn predict(&self, pixels: &PixelBuffer) -> Result<ModelOutputs> {
        let (channels, height, width) = pixels.shape();
        let input = Tensor::from_slice(pixels.as_slice(), (1, channels, height, width), &self.device)
            .map_err(|e| Error::inference(format!("failed to build input tensor: {}", e)))?;

        let logits = self
            .model
            .forward(&input)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| Error::inference(format!("forward pass failed: {}", e)))?;

        Ok(ModelOutputs::from([(self.output_name.clone(), logits)]))
    }

    fn input_size(&self) -> (u32, u32) {
        (self.input_size, self.input_size)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
