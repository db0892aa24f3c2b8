use std::collections::VecDeque;

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::Detector;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Stub backend for tests and `stub://` demo runs.
///
/// Two modes:
/// - scripted: returns a pre-planned detection list per frame, then empty
///   lists once the script runs out;
/// - motion-gated: hashes each frame's pixels and emits a fixed detection
///   list whenever the content changed since the previous frame.
pub struct StubDetector {
    script: VecDeque<Vec<Detection>>,
    on_motion: Vec<Detection>,
    last_hash: Option<[u8; 32]>,
}

impl StubDetector {
    /// Scripted mode: frame N gets the Nth entry.
    pub fn scripted(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            script: frames.into(),
            on_motion: Vec::new(),
            last_hash: None,
        }
    }

    /// Motion-gated mode: emit `detections` whenever pixels changed.
    pub fn on_motion(detections: Vec<Detection>) -> Self {
        Self {
            script: VecDeque::new(),
            on_motion: detections,
            last_hash: None,
        }
    }
}

impl Detector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        if let Some(detections) = self.script.pop_front() {
            return Ok(detections);
        }

        let current_hash: [u8; 32] = Sha256::digest(frame.as_image().as_raw()).into();
        let motion = self.last_hash.is_some_and(|prev| prev != current_hash);
        self.last_hash = Some(current_hash);

        if motion {
            Ok(self.on_motion.clone())
        } else {
            Ok(Vec::new())
        }
    }
}
