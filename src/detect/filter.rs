use std::collections::HashSet;

use crate::detect::result::Detection;

/// Apply the confidence threshold and keep-label set to raw detections.
///
/// Returns the ordered subsequence where `probability > threshold` (strict)
/// and the label is in `keep`. Relative order matches the model's output:
/// it determines draw order for overlapping overlays and last-write-wins
/// order in the frame summary. An empty result is valid and yields an empty
/// summary and no crops for the frame.
pub fn filter_detections(
    raw: &[Detection],
    threshold: f32,
    keep: &HashSet<u32>,
) -> Vec<Detection> {
    raw.iter()
        .filter(|det| det.probability > threshold && keep.contains(&det.label))
        .cloned()
        .collect()
}
