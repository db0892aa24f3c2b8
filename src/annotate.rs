//! Detection overlay drawing.
//!
//! Draws a hollow rectangle at each kept detection's scaled box plus a
//! `"{label}: {probability}%"` caption above it. All drawing happens on the
//! display copy of the frame; the clean copy that crop export reads from is
//! never touched.
//!
//! Captions use a built-in 5x7 glyph table (uppercased, scaled 2x) instead
//! of a font crate, so no font asset ships with the binary. Characters
//! outside the table render as blanks.

use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::frame::Frame;
use crate::geometry::{clamp_region, ScaledBox};

/// Overlay color shared by rectangles and captions.
const OVERLAY_COLOR: Rgb<u8> = Rgb([20, 165, 255]);

/// Rectangle outline thickness in pixels.
const OUTLINE_THICKNESS: u32 = 5;

/// Vertical gap between a box's top edge and its caption.
const TEXT_OFFSET: i32 = 15;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SCALE: u32 = 2;
/// Horizontal advance per character (glyph plus one column of spacing).
const GLYPH_ADVANCE: u32 = (GLYPH_WIDTH + 1) * GLYPH_SCALE;
const TEXT_HEIGHT: u32 = GLYPH_HEIGHT * GLYPH_SCALE;

/// Draws detection overlays onto a display frame.
pub struct FrameAnnotator {
    color: Rgb<u8>,
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnnotator {
    pub fn new() -> Self {
        Self {
            color: OVERLAY_COLOR,
        }
    }

    /// Caption text for one detection: `"{label}: {probability*100:.2}%"`.
    pub fn caption(label: &str, probability: f32) -> String {
        format!("{}: {:.2}%", label, probability * 100.0)
    }

    /// Draw one detection's rectangle and caption.
    ///
    /// The rectangle is clipped to frame bounds; a box entirely outside the
    /// frame draws nothing. The caption origin is clamped so no glyph lands
    /// outside the frame.
    pub fn annotate(&self, frame: &mut Frame, text: &str, sbox: &ScaledBox) {
        let frame_w = frame.width();
        let frame_h = frame.height();

        if let Some(region) = clamp_region(sbox, frame_w, frame_h) {
            let image = frame.as_image_mut();
            for inset in 0..OUTLINE_THICKNESS {
                let width = region.width.saturating_sub(2 * inset);
                let height = region.height.saturating_sub(2 * inset);
                if width == 0 || height == 0 {
                    break;
                }
                let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32)
                    .of_size(width, height);
                draw_hollow_rect_mut(image, rect, self.color);
            }
        }

        let (text_x, text_y) = caption_origin(text, sbox, frame_w, frame_h);
        draw_text(frame, text_x, text_y, text, self.color);
    }
}

/// Clamp the caption's top-left corner so the rendered text stays inside
/// `[0, frame_w) x [0, frame_h)`.
fn caption_origin(text: &str, sbox: &ScaledBox, frame_w: u32, frame_h: u32) -> (u32, u32) {
    let width = text_width(text);
    let max_x = frame_w.saturating_sub(width);
    let max_y = frame_h.saturating_sub(TEXT_HEIGHT);

    let x = sbox.xmin.clamp(0, max_x as i32) as u32;
    let y = (sbox.ymin - TEXT_OFFSET - TEXT_HEIGHT as i32).clamp(0, max_y as i32) as u32;
    (x, y)
}

fn text_width(text: &str) -> u32 {
    text.chars().count() as u32 * GLYPH_ADVANCE
}

fn draw_text(frame: &mut Frame, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    let frame_w = frame.width();
    let frame_h = frame.height();
    let image = frame.as_image_mut();

    for (index, ch) in text.chars().enumerate() {
        let Some(rows) = glyph(ch) else {
            continue;
        };
        let glyph_x = x + index as u32 * GLYPH_ADVANCE;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1u8 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                // One glyph bit becomes a GLYPH_SCALE x GLYPH_SCALE block.
                for dy in 0..GLYPH_SCALE {
                    for dx in 0..GLYPH_SCALE {
                        let px = glyph_x + col * GLYPH_SCALE + dx;
                        let py = y + row as u32 * GLYPH_SCALE + dy;
                        if px < frame_w && py < frame_h {
                            image.put_pixel(px, py, color);
                        }
                    }
                }
            }
        }
    }
}

/// 5x7 glyph rows, top to bottom, bit 4 = leftmost column. Lookup is
/// case-insensitive; unknown characters return `None` and render blank.
fn glyph(ch: char) -> Option<&'static [u8; 7]> {
    let ch = ch.to_ascii_uppercase();
    GLYPHS
        .iter()
        .find(|(glyph_ch, _)| *glyph_ch == ch)
        .map(|(_, rows)| rows)
}

#[rustfmt::skip]
const GLYPHS: &[(char, [u8; 7])] = &[
    (' ', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000]),
    (':', [0b00000, 0b00100, 0b00000, 0b00000, 0b00000, 0b00100, 0b00000]),
    ('.', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100]),
    ('%', [0b11000, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b00011]),
    ('-', [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000]),
    ('_', [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111]),
    ('0', [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
    ('1', [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
    ('2', [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
    ('3', [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110]),
    ('4', [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
    ('5', [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110]),
    ('6', [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
    ('7', [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000]),
    ('8', [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
    ('9', [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100]),
    ('A', [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('B', [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110]),
    ('C', [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110]),
    ('D', [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110]),
    ('E', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111]),
    ('F', [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('G', [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111]),
    ('H', [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
    ('I', [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
    ('J', [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100]),
    ('K', [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001]),
    ('L', [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
    ('M', [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001]),
    ('N', [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001]),
    ('O', [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('P', [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
    ('Q', [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101]),
    ('R', [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001]),
    ('S', [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110]),
    ('T', [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
    ('U', [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
    ('V', [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100]),
    ('W', [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010]),
    ('X', [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001]),
    ('Y', [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100]),
    ('Z', [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111]),
];

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
