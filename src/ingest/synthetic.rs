//! Synthetic frame source for `stub://` URLs.

use anyhow::Result;
use image::{Rgb, RgbImage};

use crate::frame::Frame;
use crate::ingest::{FrameSource, SourceStats};

/// Frames between synthetic scene changes.
const SCENE_CHANGE_INTERVAL: u64 = 50;

/// Generates a synthetic scene: a static background that changes every
/// [`SCENE_CHANGE_INTERVAL`] frames, simulating an object entering the
/// field of view. Frames within one scene are identical, so a motion-gated
/// detector fires exactly at scene boundaries.
pub struct SyntheticSource {
    url: String,
    width: u32,
    height: u32,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(url: &str, width: u32, height: u32) -> Self {
        Self {
            url: url.to_string(),
            width,
            height,
            frame_count: 0,
            // Random phase so repeated runs do not replay the same scenes.
            scene_state: rand::random(),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.url,
            self.width,
            self.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        if self.frame_count % SCENE_CHANGE_INTERVAL == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let scene = self.scene_state;
        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            let v = (x as u64 + y as u64 + scene as u64) % 256;
            Rgb([v as u8, (v / 2) as u8, scene])
        });
        Ok(Frame::new(image))
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.url.clone(),
        }
    }
}
