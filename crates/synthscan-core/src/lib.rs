//! SynthScan Core
//!
//! Core types and error handling shared across SynthScan components.
//!
//! This crate provides:
//! - Schema-free metadata records describing media assets
//! - The analysis result and media capability types
//! - Media payloads handed to analysis strategies
//! - Error types and result handling

pub mod error;
pub mod media;
pub mod types;

pub use error::{Error, Result};
pub use media::EncodedImage;
pub use types::{keys, AnalysisResult, MediaCapability, MetadataRecord};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::media::EncodedImage;
    pub use crate::types::{keys, AnalysisResult, MediaCapability, MetadataRecord};
}
