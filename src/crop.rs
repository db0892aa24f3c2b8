//! Crop export for the secondary classifier.
//!
//! For each kept detection outside the excluded-label set, derives a padded
//! crop region, clamps it to the clipped frame, extracts the sub-image from
//! the clean (unannotated) copy, resizes to the classifier's input size and
//! hands the encoded result to the crop store.
//!
//! Every failure here is absorbed: an empty clamped region, a failed encode
//! or a failed store skips that one crop and the frame continues.

use std::collections::HashSet;

use crate::detect::Detection;
use crate::frame::Frame;
use crate::geometry::{clamp_region, ScaledBox};
use crate::storage::CropStore;

/// Classifier input edge length: crops are resized to this square.
pub const CROP_OUTPUT_SIZE: u32 = 224;

/// Derives, clamps and exports crops for kept detections.
///
/// Crop keys embed a process-local sequence number
/// (`cropped_image_{n}.jpg`). The counter restarts at zero on every run, so
/// keys are unique within one process lifetime only; a store shared across
/// restarts can see a later run overwrite an earlier run's objects.
pub struct CropExtractor {
    pad: i32,
    output_size: u32,
    excluded: HashSet<u32>,
    seq: u64,
}

impl CropExtractor {
    pub fn new(pad: u32, output_size: u32, excluded: HashSet<u32>) -> Self {
        Self {
            pad: pad as i32,
            output_size,
            excluded,
            seq: 0,
        }
    }

    /// Number of crops exported so far in this run.
    pub fn exported(&self) -> u64 {
        self.seq
    }

    /// Export one detection's crop from the clean frame.
    ///
    /// Returns `true` when a crop was stored. Skips (returning `false`)
    /// when the label is excluded, the clamped region is empty, or encode
    /// or store fails.
    pub fn export(
        &mut self,
        clean: &Frame,
        detection: &Detection,
        sbox: &ScaledBox,
        store: &mut dyn CropStore,
    ) -> bool {
        if self.excluded.contains(&detection.label) {
            return false;
        }

        let padded = sbox.padded(self.pad);
        let Some(region) = clamp_region(&padded, clean.width(), clean.height()) else {
            log::debug!(
                "crop region empty for label {} (box {:?}), skipping",
                detection.label,
                sbox
            );
            return false;
        };

        let crop = clean.crop(&region).resized(self.output_size, self.output_size);
        let jpeg = match crop.encode_jpeg() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("crop encode failed for label {}: {}", detection.label, e);
                return false;
            }
        };

        let key = format!("cropped_image_{}.jpg", self.seq);
        match store.store(&key, &jpeg) {
            Ok(()) => {
                log::debug!(
                    "stored crop {} for label {} from region {:?}",
                    key,
                    detection.label,
                    region
                );
                self.seq += 1;
                true
            }
            Err(e) => {
                log::warn!("crop store failed for {}: {}", key, e);
                false
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
