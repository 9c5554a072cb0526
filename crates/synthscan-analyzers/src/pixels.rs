//! Fixed-size pixel grids and media-to-pixel conversion

use image::imageops::FilterType;
use image::{DynamicImage, Rgb32FImage};
use synthscan_core::{EncodedImage, Error, Result};

/// Default model input edge length
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Number of colour channels in a pixel buffer
pub const CHANNELS: usize = 3;

/// Per-channel mean used for ImageNet-style normalization
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel standard deviation used for ImageNet-style normalization
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Dense 3-channel `f32` grid in channel-major (CHW) order.
///
/// Built fresh for each request and moved into the inference call that
/// consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl PixelBuffer {
    /// Wrap CHW data, checking its length against the dimensions
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let expected = Self::expected_len(width, height);
        if width == 0 || height == 0 || data.len() != expected {
            return Err(Error::conversion(format!(
                "pixel buffer of {}x{} needs {} values, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Buffer filled with a constant value
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; Self::expected_len(width, height)],
        }
    }

    fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(channels, height, width)` shape
    pub fn shape(&self) -> (usize, usize, usize) {
        (CHANNELS, self.height as usize, self.width as usize)
    }

    /// Raw CHW values
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the buffer, returning its CHW values
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Converts a media payload into the fixed-size grid a model expects
pub trait PixelConverter<M>: Send + Sync {
    /// Decode and resize `media` to `width` x `height`
    fn to_pixels(&self, media: &M, width: u32, height: u32) -> Result<PixelBuffer>;
}

/// Decode, resize (triangle filter) and ImageNet-normalize images
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageNetConverter;

impl ImageNetConverter {
    /// Create a new converter
    pub fn new() -> Self {
        Self
    }

    fn normalize(img: &Rgb32FImage, width: u32, height: u32) -> Vec<f32> {
        let plane = width as usize * height as usize;
        let mut data = vec![0.0; plane * CHANNELS];
        for (x, y, pixel) in img.enumerate_pixels() {
            let idx = (y * width + x) as usize;
            for c in 0..CHANNELS {
                data[idx + plane * c] = (pixel[c] - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
        data
    }
}

impl PixelConverter<DynamicImage> for ImageNetConverter {
    fn to_pixels(&self, media: &DynamicImage, width: u32, height: u32) -> Result<PixelBuffer> {
        if width == 0 || height == 0 {
            return Err(Error::conversion("target dimensions must be non-zero"));
        }
        if media.width() == 0 || media.height() == 0 {
            return Err(Error::conversion("source image has no pixels"));
        }

        let resized = media
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb32f();

        PixelBuffer::new(width, height, Self::normalize(&resized, width, height))
    }
}

impl PixelConverter<EncodedImage> for ImageNetConverter {
    fn to_pixels(&self, media: &EncodedImage, width: u32, height: u32) -> Result<PixelBuffer> {
        let decoded = image::load_from_memory(media.as_bytes())
            .map_err(|e| Error::conversion(format!("failed to decode image: {}", e)))?;
        self.to_pixels(&decoded, width, height)
    }
}

/// Read the pixel dimensions from an encoded image header without decoding it
pub fn encoded_dimensions(media: &EncodedImage) -> Result<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(media.as_bytes()))
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|e| Error::conversion(format!("failed to read image header: {}", e)))
}
