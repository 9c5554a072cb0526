//! Core types for SynthScan

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Well-known metadata keys consulted by the analyzers.
///
/// Names follow the image property dictionaries produced by platform
/// image-IO libraries; callers are free to supply any other keys.
pub mod keys {
    /// Descriptive capture block (camera make, exposure, ...)
    pub const EXIF: &str = "{Exif}";
    /// PNG encoding block (text chunks, gamma, ...)
    pub const PNG: &str = "{PNG}";
    /// Geolocation block
    pub const GPS: &str = "{GPS}";
    /// Pixel width of the asset
    pub const PIXEL_WIDTH: &str = "PixelWidth";
    /// Pixel height of the asset
    pub const PIXEL_HEIGHT: &str = "PixelHeight";
}

/// Schema-free metadata describing a media asset.
///
/// Lookups never fail: an absent key, or one whose value is `null`, reads
/// as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    entries: Map<String, Value>,
}

impl MetadataRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Mark a block as present with an empty dictionary value
    pub fn with_block(self, key: impl Into<String>) -> Self {
        self.with(key, Value::Object(Map::new()))
    }

    /// Get the raw value for a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).filter(|v| !v.is_null())
    }

    /// Whether a key is present with a non-null value
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Read a value as an integer; floats and strings read as `None`
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Number of entries, including `null` ones
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for MetadataRecord {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

impl TryFrom<Value> for MetadataRecord {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(crate::Error::config(format!(
                "metadata must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Media type tag used to select an analysis strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCapability {
    /// Still images
    Image,
    /// Video clips
    Video,
    /// Audio recordings
    Audio,
}

impl fmt::Display for MediaCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        };
        f.write_str(name)
    }
}

/// Outcome of analysing one asset.
///
/// Immutable once built: either derived from a fused confidence, or from a
/// heuristic early exit where the asset is always flagged synthetic.
/// Serialize-only: results are never rebuilt from external input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisResult {
    is_synthetic: bool,
    confidence: f32,
}

impl AnalysisResult {
    /// Confidence above which a fused result is flagged synthetic
    pub const DECISION_THRESHOLD: f32 = 0.5;

    /// Build a result from a fused confidence using the default threshold
    pub fn from_confidence(confidence: f32) -> Self {
        Self::from_confidence_with_threshold(confidence, Self::DECISION_THRESHOLD)
    }

    /// Build a result from a fused confidence using a custom threshold
    pub fn from_confidence_with_threshold(confidence: f32, threshold: f32) -> Self {
        let confidence = clamp_unit(confidence);
        Self {
            is_synthetic: confidence > threshold,
            confidence,
        }
    }

    /// Build a result from a heuristic early exit
    pub fn from_heuristic(score: u32) -> Self {
        Self {
            is_synthetic: true,
            confidence: clamp_unit(score as f32 / 100.0),
        }
    }

    /// Whether the asset is judged synthetic
    pub fn is_synthetic(&self) -> bool {
        self.is_synthetic
    }

    /// Confidence in [0, 1]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
