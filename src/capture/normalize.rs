//! Image normalization
//!
//! Captured images arrive in whatever size and format the provider produced.
//! Before storage every image is bounded to a maximum resolution (aspect
//! ratio preserved, never enlarged) and re-encoded as JPEG at a fixed
//! quality, so dataset entries are uniform regardless of provider.

use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};

use super::CaptureError;
use crate::config::CaptureConfig;

/// A normalized, storage-ready image
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Bounds captures to a maximum resolution and re-encodes them as JPEG
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    max_width: u32,
    max_height: u32,
    jpeg_quality: u8,
}

impl ImageNormalizer {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            max_width: config.max_width,
            max_height: config.max_height,
            jpeg_quality: config.jpeg_quality,
        }
    }

    pub fn normalize(&self, raw: &[u8]) -> Result<NormalizedImage, CaptureError> {
        let decoded =
            image::load_from_memory(raw).map_err(|_| CaptureError::MalformedImage)?;

        let img = if decoded.width() > self.max_width || decoded.height() > self.max_height {
            decoded.resize(self.max_width, self.max_height, FilterType::Lanczos3)
        } else {
            decoded
        };

        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), self.jpeg_quality);
        img.write_with_encoder(encoder)?;

        Ok(NormalizedImage {
            bytes,
            width: img.width(),
            height: img.height(),
        })
    }
}
