//! Coordinate mapping between model-input space and clipped-frame space.
//!
//! The detector sees a fixed-size resized copy of the clipped frame, so its
//! bounding boxes come back in model-input coordinates. Everything downstream
//! (overlay drawing, crop export) works in full-resolution clipped-frame
//! coordinates, which requires an independent scale factor per axis: the
//! resize step does not preserve aspect ratio.

/// Scale factor mapping one axis of model-input space back to the clipped
/// frame. Computed independently for x and y.
pub fn axis_scale(clipped_dim: u32, model_input_dim: u32) -> f32 {
    clipped_dim as f32 / model_input_dim as f32
}

/// Bounding box in model-input coordinates, as produced by the detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BoundingBox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Map this box into clipped-frame coordinates.
    ///
    /// Coordinates truncate toward zero (`as i32`). Scaling is monotonic and
    /// positive, so `xmin <= xmax` and `ymin <= ymax` are preserved without
    /// re-ordering.
    pub fn scaled(&self, x_scale: f32, y_scale: f32) -> ScaledBox {
        ScaledBox {
            xmin: (self.xmin * x_scale) as i32,
            ymin: (self.ymin * y_scale) as i32,
            xmax: (self.xmax * x_scale) as i32,
            ymax: (self.ymax * y_scale) as i32,
        }
    }
}

/// Bounding box in clipped-frame pixel coordinates.
///
/// Edges may lie outside the frame; clamp with [`clamp_region`] before
/// indexing pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaledBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl ScaledBox {
    /// Expand the box by `pad` pixels on every side.
    pub fn padded(&self, pad: i32) -> ScaledBox {
        ScaledBox {
            xmin: self.xmin - pad,
            ymin: self.ymin - pad,
            xmax: self.xmax + pad,
            ymax: self.ymax + pad,
        }
    }
}

/// A non-empty rectangle in frame coordinates.
///
/// [`clamp_region`] never produces an empty or negative-size `Region`;
/// callers constructing one directly keep width and height non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Build a region from explicit offsets and dimensions.
    ///
    /// Returns `None` when width or height is zero.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Option<Region> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Region {
            x,
            y,
            width,
            height,
        })
    }
}

/// Clamp all four edges of a box to `[0, max_width) x [0, max_height)`.
///
/// Returns `None` when the clamped width or height collapses to zero or
/// below - never a negative-size rectangle.
pub fn clamp_region(
    sbox: &ScaledBox,
    max_width: u32,
    max_height: u32,
) -> Option<Region> {
    let x0 = sbox.xmin.clamp(0, max_width as i32);
    let x1 = sbox.xmax.clamp(0, max_width as i32);
    let y0 = sbox.ymin.clamp(0, max_height as i32);
    let y1 = sbox.ymax.clamp(0, max_height as i32);

    let width = x1 - x0;
    let height = y1 - y0;
    if width <= 0 || height <= 0 {
        return None;
    }

    Some(Region {
        x: x0 as u32,
        y: y0 as u32,
        width: width as u32,
        height: height as u32,
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_scales_are_independent() {
        let sx = axis_scale(640, 300);
        let sy = axis_scale(480, 300);
        assert!((sx - 640.0 / 300.0).abs() < f32::EPSILON);
        assert!((sy - 480.0 / 300.0).abs() < f32::EPSILON);
    }

    #[test]
    fn scaling_truncates_toward_zero() {
        // 100 * (640/300) = 213.33..; truncation keeps 213, never rounds up.
        let bbox = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
        let scaled = bbox.scaled(axis_scale(640, 300), axis_scale(640, 300));
        assert_eq!(scaled.xmin, 213);
        assert_eq!(scaled.ymin, 213);
        assert_eq!(scaled.xmax, 426);
        assert_eq!(scaled.ymax, 426);
    }

    #[test]
    fn scaling_is_invertible_within_one_pixel() {
        let sx = axis_scale(640, 300);
        let sy = axis_scale(640, 300);
        let bbox = BoundingBox::new(37.0, 91.0, 154.0, 262.0);
        let scaled = bbox.scaled(sx, sy);

        for (orig, back) in [
            (bbox.xmin, scaled.xmin as f32 / sx),
            (bbox.ymin, scaled.ymin as f32 / sy),
            (bbox.xmax, scaled.xmax as f32 / sx),
            (bbox.ymax, scaled.ymax as f32 / sy),
        ] {
            assert!(
                (orig - back).abs() <= 1.0,
                "round trip drifted more than one pixel: {} vs {}",
                orig,
                back
            );
        }
    }

    #[test]
    fn clamp_fully_inside_is_unchanged() {
        let sbox = ScaledBox {
            xmin: 10,
            ymin: 20,
            xmax: 110,
            ymax: 220,
        };
        let region = clamp_region(&sbox, 640, 640).expect("non-empty");
        assert_eq!(
            region,
            Region {
                x: 10,
                y: 20,
                width: 100,
                height: 200
            }
        );
    }

    #[test]
    fn clamp_fully_outside_is_empty() {
        let right_of_frame = ScaledBox {
            xmin: 700,
            ymin: 10,
            xmax: 800,
            ymax: 110,
        };
        assert_eq!(clamp_region(&right_of_frame, 640, 640), None);

        let above_frame = ScaledBox {
            xmin: 10,
            ymin: -200,
            xmax: 110,
            ymax: -100,
        };
        assert_eq!(clamp_region(&above_frame, 640, 640), None);
    }

    #[test]
    fn clamp_partial_overlap_is_intersection() {
        let sbox = ScaledBox {
            xmin: -50,
            ymin: 600,
            xmax: 100,
            ymax: 700,
        };
        let region = clamp_region(&sbox, 640, 640).expect("non-empty");
        assert_eq!(
            region,
            Region {
                x: 0,
                y: 600,
                width: 100,
                height: 40
            }
        );
    }

    #[test]
    fn zero_size_region_rejected() {
        assert_eq!(Region::new(5, 5, 0, 10), None);
        assert_eq!(Region::new(5, 5, 10, 0), None);
        assert!(Region::new(5, 5, 10, 10).is_some());
    }

    #[test]
    fn padding_expands_all_sides() {
        let sbox = ScaledBox {
            xmin: 100,
            ymin: 100,
            xmax: 200,
            ymax: 200,
        };
        let padded = sbox.padded(20);
        assert_eq!(
            padded,
            ScaledBox {
                xmin: 80,
                ymin: 80,
                xmax: 220,
                ymax: 220
            }
        );
    }
}
