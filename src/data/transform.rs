// ============================================================
// Layer 4 — Glyph Transform (normalization contract)
// ============================================================
// Converts one glyph image into the flat f32 buffer the model
// consumes. Training and inference both call `apply`, and the
// parameters are written into the checkpoint descriptor, so a
// checkpoint trained under different parameters is refused at
// load time instead of silently mispredicting.
//
//   glyph ─► grayscale ─► resize (H x W) ─► /255 ─► (x - mean) / std
//
// Output layout is row-major [H, W], matching a [1, H, W]
// single-channel tensor.

use image::{imageops::FilterType, DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlyphTransform {
    pub height: u32,
    pub width:  u32,
    pub mean:   f32,
    pub std:    f32,
}

impl Default for GlyphTransform {
    fn default() -> Self {
        Self { height: 10, width: 8, mean: 0.5, std: 0.5 }
    }
}

impl GlyphTransform {
    /// Number of values `apply` produces.
    pub fn len(&self) -> usize {
        (self.height * self.width) as usize
    }

    pub fn apply(&self, glyph: &DynamicImage) -> Vec<f32> {
        let gray = self.resize(glyph.to_luma8());
        gray.pixels()
            .map(|p| (p.0[0] as f32 / 255.0 - self.mean) / self.std)
            .collect()
    }

    fn resize(&self, gray: GrayImage) -> GrayImage {
        if gray.dimensions() == (self.width, self.height) {
            return gray;
        }
        image::imageops::resize(&gray, self.width, self.height, FilterType::Triangle)
    }
}
