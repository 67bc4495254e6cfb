// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The decoder talks to its two recognisers only through these
// traits:
//   - CnnClassifier  implements GlyphClassifier
//   - TesseractCli   implements TextRecognizer
//
// Both must be Send + Sync: one service instance is shared by
// every concurrent decode call.

use std::path::Path;

use anyhow::Result;
use image::DynamicImage;

// ─── GlyphClassifier ──────────────────────────────────────────────────────────
/// Predicts the character drawn in one glyph slice.
pub trait GlyphClassifier: Send + Sync {
    /// Returns `Ok(None)` when the predicted class has no label
    /// (a stale or mismatched class index); callers substitute a
    /// placeholder instead of failing.
    fn classify(&self, glyph: &DynamicImage) -> Result<Option<String>>;
}

// ─── TextRecognizer ───────────────────────────────────────────────────────────
/// An external, optional OCR engine that reads the whole captcha.
pub trait TextRecognizer: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Capability probe. Called once when the service is built.
    fn is_available(&self) -> bool;

    /// Read the text in the image at `image`, whitespace trimmed.
    fn recognize(&self, image: &Path) -> Result<String>;
}
