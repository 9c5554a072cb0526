//! Error types for SynthScan

/// Result type alias using SynthScan's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for SynthScan operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Analysis strategy errors
    #[error("analysis error: {0}")]
    Analysis(String),

    /// Model forward-pass errors
    #[error("inference error: {0}")]
    Inference(String),

    /// Media to pixel-grid conversion errors
    #[error("conversion error: {0}")]
    Conversion(String),

    /// A required model artifact could not be found or loaded
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new analysis error
    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new conversion error
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create a new model-unavailable error
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error should stop start-up rather than degrade a request
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_) | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::model_unavailable("weights.safetensors");
        assert_eq!(err.to_string(), "model unavailable: weights.safetensors");
        assert!(err.is_fatal());

        let err = Error::inference("shape mismatch");
        assert!(!err.is_fatal());
    }
}
