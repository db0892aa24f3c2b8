use crate::geometry::BoundingBox;

/// One raw detection, as returned by the model call.
///
/// Immutable and scoped to a single frame. The bounding box is in
/// model-input coordinates; downstream stages rescale it into clipped-frame
/// space.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Integer label code (see [`crate::labels`]).
    pub label: u32,
    /// Confidence in `[0, 1]`.
    pub probability: f32,
    /// Bounding box in model-input coordinates.
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: u32, probability: f32, bbox: BoundingBox) -> Self {
        Self {
            label,
            probability,
            bbox,
        }
    }
}
