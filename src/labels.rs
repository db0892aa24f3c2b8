//! Detector label table.
//!
//! The detection model emits integer label codes. This table maps them to
//! the human-readable names used in overlays and published summaries, and
//! carries the default keep/exclude sets for crop export.

/// Label codes the pipeline keeps by default (bird, cat, dog).
pub const DEFAULT_KEEP_LABELS: &[u32] = &[3, 8, 12];

/// Label codes suppressed from crop export by default (boat, chair,
/// pottedplant). A label can be excluded here and still appear in overlays
/// and summaries.
pub const DEFAULT_EXCLUDED_LABELS: &[u32] = &[4, 9, 16];

const LABEL_NAMES: &[(u32, &str)] = &[
    (1, "aeroplane"),
    (2, "bicycle"),
    (3, "bird"),
    (4, "boat"),
    (5, "bottle"),
    (6, "bus"),
    (7, "car"),
    (8, "cat"),
    (9, "chair"),
    (10, "cow"),
    (11, "dining table"),
    (12, "dog"),
    (13, "horse"),
    (14, "motorbike"),
    (15, "person"),
    (16, "pottedplant"),
    (17, "sheep"),
    (18, "sofa"),
    (19, "train"),
    (20, "tvmonitor"),
];

/// Look up the human-readable name for a label code.
pub fn label_name(code: u32) -> Option<&'static str> {
    LABEL_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Human-readable label text, with a stable fallback for codes outside the
/// table so an unexpected model output never drops a summary entry.
pub fn label_text(code: u32) -> String {
    match label_name(code) {
        Some(name) => name.to_string(),
        None => format!("label_{}", code),
    }
}
