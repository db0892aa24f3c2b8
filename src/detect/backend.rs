use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Object-detection backend trait.
///
/// The model call is an opaque, synchronous collaborator: the pipeline hands
/// it a model-input-sized frame and receives labeled, scored bounding boxes
/// back. Everything the pipeline does with those boxes is independent of how
/// they were produced, which keeps post-processing testable without
/// inference hardware.
///
/// Implementations may block internally (hardware accelerators, remote
/// engines); the inference loop treats the call as blocking I/O.
pub trait Detector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run inference on a model-input-sized frame.
    ///
    /// Returns raw detections in model-input coordinates. An error marks
    /// this frame's inference as failed; the pipeline decides whether to
    /// continue or escalate.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the loop starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
