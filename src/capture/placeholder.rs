//! Placeholder capture provider
//!
//! Renders a deterministic stand-in image for a URL on a fixed-size canvas.
//! Never fails, never touches the network; useful for development and for
//! building pipeline-shaped datasets without a screenshot service.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Cursor;

use async_trait::async_trait;
use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage};
use url::Url;

use super::{title_from_url, CaptureError, CaptureProvider, RawCapture};
use crate::types::{PageAttributes, Viewport};

const HEADER_FRACTION: u32 = 8;
const PLACEHOLDER_QUALITY: u8 = 80;

#[derive(Default)]
pub struct PlaceholderProvider;

impl PlaceholderProvider {
    pub fn new() -> Self {
        Self
    }

    /// Render the canvas: a light background, a header band whose color is
    /// derived from the URL, and a block pattern encoding the URL hash so two
    /// different URLs are visually distinguishable.
    fn render(url: &Url, viewport: Viewport) -> RgbImage {
        let mut hasher = DefaultHasher::new();
        url.as_str().hash(&mut hasher);
        let seed = hasher.finish();

        let header_color = Rgb([
            64 + (seed & 0x7f) as u8,
            64 + ((seed >> 8) & 0x7f) as u8,
            64 + ((seed >> 16) & 0x7f) as u8,
        ]);
        let background = Rgb([240, 240, 240]);
        let block = Rgb([
            96 + ((seed >> 24) & 0x5f) as u8,
            96 + ((seed >> 32) & 0x5f) as u8,
            96 + ((seed >> 40) & 0x5f) as u8,
        ]);

        let header_height = (viewport.height / HEADER_FRACTION).max(1);
        let cell = (viewport.width / 16).max(1);

        RgbImage::from_fn(viewport.width, viewport.height, |x, y| {
            if y < header_height {
                header_color
            } else {
                // 64-cell checker keyed off the hash bits
                let col = (x / cell) % 8;
                let row = ((y - header_height) / cell) % 8;
                let bit = (seed >> ((col + row * 8) % 64)) & 1;
                if bit == 1 {
                    block
                } else {
                    background
                }
            }
        })
    }
}

#[async_trait]
impl CaptureProvider for PlaceholderProvider {
    async fn capture(&self, url: &Url, viewport: Viewport) -> Result<RawCapture, CaptureError> {
        let canvas = Self::render(url, viewport);

        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), PLACEHOLDER_QUALITY);
        canvas.write_with_encoder(encoder)?;

        Ok(RawCapture {
            bytes,
            attributes: PageAttributes {
                title: Some(title_from_url(url)),
                description: Some("placeholder screenshot".to_string()),
                ..PageAttributes::default()
            },
        })
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}
