// Shared fixtures for unit tests: synthetic captchas laid out with
// the default geometry (region at (5, 11), glyphs 8px wide every 9px).

use std::path::Path;

use anyhow::Result;
use image::{imageops, DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::domain::traits::{GlyphClassifier, TextRecognizer};

pub const CAPTCHA_WIDTH: u32 = 60;
pub const CAPTCHA_HEIGHT: u32 = 30;

/// Paste 8x10 glyphs into a white 60x30 canvas at the default positions.
pub fn captcha_from_glyphs(glyphs: &[GrayImage]) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(CAPTCHA_WIDTH, CAPTCHA_HEIGHT, Rgb([255, 255, 255]));
    for (i, glyph) in glyphs.iter().enumerate() {
        let rgb = DynamicImage::ImageLuma8(glyph.clone()).to_rgb8();
        imageops::replace(&mut canvas, &rgb, 5 + 9 * i as i64, 11);
    }
    canvas
}

/// A captcha whose glyph `i` is a flat square of gray `levels[i]`.
pub fn synthetic_captcha(levels: &[u8]) -> RgbImage {
    let glyphs: Vec<GrayImage> = levels
        .iter()
        .map(|&l| GrayImage::from_pixel(8, 10, Luma([l])))
        .collect();
    captcha_from_glyphs(&glyphs)
}

/// Reads a flat glyph back into a character: gray level `40 * k`
/// maps to `alphabet[k]`.
pub struct LevelClassifier {
    pub alphabet: Vec<char>,
}

impl LevelClassifier {
    pub fn new(alphabet: &str) -> Self {
        Self { alphabet: alphabet.chars().collect() }
    }

    pub fn level_of(&self, c: char) -> u8 {
        let k = self.alphabet.iter().position(|&a| a == c).expect("char in alphabet");
        (k * 40) as u8
    }

    pub fn captcha_for(&self, text: &str) -> RgbImage {
        let levels: Vec<u8> = text.chars().map(|c| self.level_of(c)).collect();
        synthetic_captcha(&levels)
    }
}

impl GlyphClassifier for LevelClassifier {
    fn classify(&self, glyph: &DynamicImage) -> Result<Option<String>> {
        let gray = glyph.to_luma8();
        let mean = gray.pixels().map(|p| p.0[0] as f32).sum::<f32>() / gray.pixels().len() as f32;
        let k = (mean / 40.0).round() as usize;
        Ok(self.alphabet.get(k).map(|c| c.to_string()))
    }
}

/// OCR stand-in with a fixed answer and a switchable availability.
pub struct FixedOcr {
    pub available: bool,
    pub answer:    String,
}

impl TextRecognizer for FixedOcr {
    fn name(&self) -> &str {
        "fixed"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn recognize(&self, _image: &Path) -> Result<String> {
        Ok(self.answer.clone())
    }
}
