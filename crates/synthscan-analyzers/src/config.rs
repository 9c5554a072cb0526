//! Configuration for fusion constants and model loading

use crate::fusion::{FusionParams, EARLY_EXIT_THRESHOLD, HEURISTIC_WEIGHT, MODEL_WEIGHT};
use crate::inference::DEFAULT_OUTPUT_NAME;
use crate::model_loader::{DeviceType, ModelConfig, ModelSource};
use crate::pixels::DEFAULT_INPUT_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use synthscan_core::{AnalysisResult, Error, Result};

/// Top-level analyzer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Fusion constants
    #[serde(default)]
    pub fusion: FusionSpec,

    /// Image classifier; without one, only the heuristic can be evaluated
    #[serde(default)]
    pub model: Option<ModelSpec>,
}

/// Fusion constants (for YAML/config files)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionSpec {
    /// Heuristic score at or above which inference is skipped
    #[serde(default = "default_early_exit_threshold")]
    pub early_exit_threshold: u32,

    /// Weight of the model probability
    #[serde(default = "default_model_weight")]
    pub model_weight: f32,

    /// Weight of the normalized heuristic score
    #[serde(default = "default_heuristic_weight")]
    pub heuristic_weight: f32,

    /// Fused confidence above which an asset is flagged synthetic
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f32,
}

impl Default for FusionSpec {
    fn default() -> Self {
        Self {
            early_exit_threshold: default_early_exit_threshold(),
            model_weight: default_model_weight(),
            heuristic_weight: default_heuristic_weight(),
            decision_threshold: default_decision_threshold(),
        }
    }
}

/// Model configuration specification (for YAML/config files)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model source specification
    #[serde(flatten)]
    pub source: ModelSourceSpec,

    /// ViT configuration JSON (optional)
    pub config: Option<PathBuf>,

    /// Device to run on
    #[serde(default)]
    pub device: DeviceSpec,

    /// Number of output classes
    #[serde(default = "default_num_labels")]
    pub num_labels: usize,

    /// Output tensor holding class logits
    #[serde(default = "default_output_name")]
    pub output: String,

    /// Edge length of the square model input
    #[serde(default = "default_input_size")]
    pub input_size: u32,
}

/// Model source specification (for config files)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSourceSpec {
    /// Local file path
    Local { path: PathBuf },

    /// Hugging Face Hub
    HuggingFace {
        repo_id: String,
        filename: String,
        revision: Option<String>,
    },
}

/// Device specification (for config files)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda { index: Option<usize> },
    Metal { index: Option<usize> },
}

impl AnalyzerConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid analyzer config: {}", e)))?;
        config.fusion.to_params().validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Fusion constants in runtime form
    pub fn fusion_params(&self) -> FusionParams {
        self.fusion.to_params()
    }

    /// Model configuration in runtime form, if a model is configured
    pub fn model_config(&self) -> Option<ModelConfig> {
        self.model.as_ref().map(ModelSpec::to_model_config)
    }
}

impl FusionSpec {
    /// Convert to runtime fusion constants
    pub fn to_params(&self) -> FusionParams {
        FusionParams {
            early_exit_threshold: self.early_exit_threshold,
            model_weight: self.model_weight,
            heuristic_weight: self.heuristic_weight,
            decision_threshold: self.decision_threshold,
        }
    }
}

impl ModelSpec {
    /// Local weights file with default device, labels and input size
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSourceSpec::Local { path: path.into() },
            config: None,
            device: DeviceSpec::default(),
            num_labels: default_num_labels(),
            output: default_output_name(),
            input_size: default_input_size(),
        }
    }

    /// Convert to ModelConfig for loading
    pub fn to_model_config(&self) -> ModelConfig {
        let source = match &self.source {
            ModelSourceSpec::Local { path } => ModelSource::LocalPath(path.clone()),
            ModelSourceSpec::HuggingFace {
                repo_id,
                filename,
                revision,
            } => ModelSource::HuggingFace {
                repo_id: repo_id.clone(),
                revision: revision.clone(),
                filename: filename.clone(),
            },
        };

        ModelConfig {
            source,
            config_path: self.config.clone(),
            device: self.device.to_device_type(),
            num_labels: self.num_labels,
            input_size: self.input_size,
            output_name: self.output.clone(),
        }
    }
}

impl DeviceSpec {
    /// Convert to DeviceType
    pub fn to_device_type(&self) -> DeviceType {
        match self {
            DeviceSpec::Cpu => DeviceType::Cpu,
            DeviceSpec::Cuda { index } => DeviceType::Cuda(index.unwrap_or(0)),
            DeviceSpec::Metal { index } => DeviceType::Metal(index.unwrap_or(0)),
        }
    }
}

/// Default location of downloaded or bundled models
pub fn default_models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("synthscan")
        .join("models")
}

fn default_early_exit_threshold() -> u32 {
    EARLY_EXIT_THRESHOLD
}

fn default_model_weight() -> f32 {
    MODEL_WEIGHT
}

fn default_heuristic_weight() -> f32 {
    HEURISTIC_WEIGHT
}

fn default_decision_threshold() -> f32 {
    AnalysisResult::DECISION_THRESHOLD
}

fn default_num_labels() -> usize {
    2
}

fn default_output_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

fn default_input_size() -> u32 {
    DEFAULT_INPUT_SIZE
}
