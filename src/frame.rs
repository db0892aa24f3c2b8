//! RGB frame container.
//!
//! `Frame` owns one frame's pixel data for the duration of a pipeline
//! iteration and provides the operations the pipeline needs:
//!
//! - clipping to the configured region of interest
//! - resizing (bilinear) for model input and display output
//! - sub-image extraction for crop export
//! - JPEG encode/decode
//!
//! The inference loop keeps two copies per iteration: a clean copy that crop
//! export reads from, and a display copy that the annotator draws on. The
//! two never alias.

use anyhow::{anyhow, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::geometry::Region;

/// JPEG quality for preview frames and crop exports.
const JPEG_QUALITY: u8 = 90;

/// One RGB camera frame.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from raw interleaved RGB bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(anyhow!(
                "raw frame size mismatch: got {} bytes, expected {} for {}x{} RGB",
                data.len(),
                expected,
                width,
                height
            ));
        }
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("raw frame buffer rejected by image container"))?;
        Ok(Self { image })
    }

    /// A white canvas, used as the display relay's idle content.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Extract the configured region of interest.
    ///
    /// Fails when the region does not fit inside this frame; a camera
    /// delivering smaller frames than the clip region expects is a source
    /// fault, not something to silently truncate.
    pub fn clip(&self, region: &Region) -> Result<Frame> {
        let right = region.x.checked_add(region.width);
        let bottom = region.y.checked_add(region.height);
        match (right, bottom) {
            (Some(r), Some(b)) if r <= self.width() && b <= self.height() => {}
            _ => {
                return Err(anyhow!(
                    "clip region {}x{}+{}+{} exceeds frame bounds {}x{}",
                    region.width,
                    region.height,
                    region.x,
                    region.y,
                    self.width(),
                    self.height()
                ));
            }
        }
        let sub = imageops::crop_imm(&self.image, region.x, region.y, region.width, region.height);
        Ok(Frame {
            image: sub.to_image(),
        })
    }

    /// Extract a sub-image. The region must already be clamped to frame
    /// bounds (see [`crate::geometry::clamp_region`]).
    pub fn crop(&self, region: &Region) -> Frame {
        let sub = imageops::crop_imm(&self.image, region.x, region.y, region.width, region.height);
        Frame {
            image: sub.to_image(),
        }
    }

    /// Bilinear resize to the given dimensions.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        Frame {
            image: imageops::resize(&self.image, width, height, FilterType::Triangle),
        }
    }

    /// Encode as a standalone JPEG.
    pub fn encode_jpeg(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
        self.image
            .write_with_encoder(encoder)
            .map_err(|e| anyhow!("jpeg encode failed: {}", e))?;
        Ok(buf)
    }

    /// Decode a JPEG byte buffer into a frame.
    pub fn decode_jpeg(bytes: &[u8]) -> Result<Frame> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| anyhow!("jpeg decode failed: {}", e))?
            .to_rgb8();
        Ok(Frame { image })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
