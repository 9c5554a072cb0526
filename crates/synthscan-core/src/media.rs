//! Media payloads handed to analysis strategies

use bytes::Bytes;
use std::path::Path;

/// An encoded still image (PNG, JPEG, WebP, ...) held in memory.
///
/// Cloning is cheap; the underlying buffer is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data: Bytes,
}

impl EncodedImage {
    /// Wrap already-encoded image bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Read an encoded image from disk
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Ok(Self::new(data))
    }

    /// Raw encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size of the encoded payload in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for EncodedImage {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_image_from_missing_file() {
        let err = EncodedImage::from_file("/nonexistent/synthscan/image.png").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_encoded_image_clone_shares_buffer() {
        let image = EncodedImage::from(vec![1u8, 2, 3]);
        let copy = image.clone();
        assert_eq!(copy.as_bytes(), &[1, 2, 3]);
        assert_eq!(image.len(), 3);
        assert!(!image.is_empty());
    }
}
