// ============================================================
// Layer 3 — Captcha Geometry
// ============================================================
// The captcha generator always draws its five glyphs at the
// same pixel positions, so segmentation is pure arithmetic:
//
//   full image ──crop(region)──► text region (44 x 10)
//                                   │
//          ┌──────┬──────┬──────┬───┴──┬──────┐
//   x =    0      9     18     27     36     44
//          [ 8px ][ 8px ][ 8px ][ 8px ][ 8px ]
//
// Every number here is correctness-critical. An input from a
// different generator still crops "successfully" but yields
// garbage glyphs, so the values live in named configuration
// instead of being scattered through the segmenter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned pixel rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x:      u32,
    pub y:      u32,
    pub width:  u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// True when the rectangle lies entirely inside a `width x height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("invalid segmentation geometry: {0}")]
    Invalid(String),

    #[error(
        "image is {width}x{height} but the text region {region:?} needs at least {}x{}",
        .region.right(), .region.bottom()
    )]
    ImageTooSmall { width: u32, height: u32, region: Rect },
}

/// Fixed layout of one captcha generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// Sub-rectangle of the full image that holds every glyph
    pub region:      Rect,
    /// Number of glyphs, i.e. the decoded text length
    pub glyph_count: usize,
    /// Width of one glyph slice in pixels
    pub glyph_width: u32,
    /// Distance between the left edges of neighbouring slices
    pub stride:      u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            region:      Rect::new(5, 11, 44, 10),
            glyph_count: 5,
            glyph_width: 8,
            stride:      9,
        }
    }
}

impl Geometry {
    /// Check the configuration is self-consistent.
    ///
    /// Every slice must begin inside the region; only the last one
    /// may run past the right edge (it is clipped when sliced).
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.glyph_count == 0 {
            return Err(GeometryError::Invalid("glyph_count must be at least 1".into()));
        }
        if self.glyph_width == 0 || self.stride == 0 {
            return Err(GeometryError::Invalid("glyph_width and stride must be non-zero".into()));
        }
        if self.region.width == 0 || self.region.height == 0 {
            return Err(GeometryError::Invalid("text region must not be empty".into()));
        }
        let last_start = (self.glyph_count as u64 - 1) * self.stride as u64;
        if last_start >= self.region.width as u64 {
            return Err(GeometryError::Invalid(format!(
                "{} glyphs with stride {} start past the {}px wide region",
                self.glyph_count, self.stride, self.region.width
            )));
        }
        Ok(())
    }
}

/// Fixed-stride spans over a region; the trailing span is clipped to
/// `region_width` rather than rejected. Spans that would start at or
/// beyond the edge come back with zero width.
pub fn glyph_spans(region_width: u32, count: usize, width: u32, stride: u32) -> Vec<(u32, u32)> {
    (0..count as u32)
        .map(|i| {
            let x = (i * stride).min(region_width);
            (x, width.min(region_width - x))
        })
        .collect()
}
