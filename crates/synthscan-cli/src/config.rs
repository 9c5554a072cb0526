//! CLI configuration

use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use synthscan_analyzers::{AnalyzerConfig, ModelSourceSpec, ModelSpec};
use synthscan_core::MetadataRecord;

/// Overrides collected from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Local weights file replacing the configured model source
    pub model: Option<PathBuf>,

    /// ViT configuration JSON for the model
    pub model_config: Option<PathBuf>,
}

/// Load the analyzer configuration and apply CLI overrides.
///
/// Without a config file the built-in defaults are used.
pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<AnalyzerConfig> {
    let mut config = match config_path {
        Some(path) => AnalyzerConfig::from_file(path)
            .with_context(|| format!("loading analyzer config {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };

    if let Some(path) = &overrides.model {
        match config.model.as_mut() {
            Some(spec) => spec.source = ModelSourceSpec::Local { path: path.clone() },
            None => config.model = Some(ModelSpec::local(path.clone())),
        }
    }

    if let Some(path) = &overrides.model_config {
        let spec = config
            .model
            .as_mut()
            .context("--model-config requires a model (use --model or the config file)")?;
        spec.config = Some(path.clone());
    }

    Ok(config)
}

/// Read a JSON metadata sidecar. A missing path yields an empty record.
pub fn load_metadata(path: Option<&Path>) -> anyhow::Result<MetadataRecord> {
    let Some(path) = path else {
        return Ok(MetadataRecord::new());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading metadata {}", path.display()))?;
    let metadata: MetadataRecord = serde_json::from_str(&content)
        .with_context(|| format!("metadata {} must be a JSON object", path.display()))?;
    Ok(metadata)
}

/// Summary of the effective configuration, logged at start-up
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub early_exit_threshold: u32,
    pub model_weight: f32,
    pub heuristic_weight: f32,
    pub model: Option<String>,
}

impl From<&AnalyzerConfig> for ConfigSummary {
    fn from(config: &AnalyzerConfig) -> Self {
        let params = config.fusion_params();
        Self {
            early_exit_threshold: params.early_exit_threshold,
            model_weight: params.model_weight,
            heuristic_weight: params.heuristic_weight,
            model: config.model_config().map(|m| m.describe()),
        }
    }
}
