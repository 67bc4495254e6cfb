// ============================================================
// Layer 2 — Decoder (segmentation → classification → arbitration)
// ============================================================
// Runs one captcha through the pipeline, strictly in order:
//
//   Start       segment the file into glyph artifacts
//   Segmented   classify every glyph, concatenate left to right
//   Classified  ask the OCR engine, if it was available at startup
//   OcrQueried  reconcile both answers
//   Resolved    final text
//
// Any per-image failure (missing file, unreadable image, layout
// that doesn't fit the geometry, classifier error) ends in
// Failed with the "N/A" sentinel instead of an error. An OCR
// failure only drops the OCR opinion.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;

use crate::data::segmenter::{Segmentation, Segmenter};
use crate::domain::{
    arbitration::{arbitrate, ArbitrationDecision, DecodeState, EngineSettings},
    traits::{GlyphClassifier, TextRecognizer},
};
use crate::infra::temp_tracker::TempTracker;

/// Stands in for a glyph whose class has no label.
pub const PLACEHOLDER: char = '?';

pub struct Decoder {
    segmenter:  Segmenter,
    classifier: Arc<dyn GlyphClassifier>,
    /// Present only if the engine reported itself available at construction
    ocr:        Option<Arc<dyn TextRecognizer>>,
    settings:   EngineSettings,
    work_dir:   PathBuf,
}

impl Decoder {
    /// Build a decoder. The OCR engine, if any, is probed exactly once
    /// here; an unavailable engine puts the decoder in CNN-only mode.
    pub fn new(
        segmenter:  Segmenter,
        classifier: Arc<dyn GlyphClassifier>,
        ocr:        Option<Arc<dyn TextRecognizer>>,
        settings:   EngineSettings,
        work_dir:   impl Into<PathBuf>,
    ) -> Self {
        let ocr = ocr.filter(|engine| {
            let available = engine.is_available();
            tracing::info!("OCR engine '{}' available: {}", engine.name(), available);
            available
        });
        Self { segmenter, classifier, ocr, settings, work_dir: work_dir.into() }
    }

    #[cfg(test)]
    pub fn ocr_available(&self) -> bool {
        self.ocr.is_some()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Decode the captcha at `image`. Artifacts are named with `tag`.
    pub fn decode(&self, image: &Path, tag: &str, tracker: &TempTracker) -> ArbitrationDecision {
        tracing::debug!("{:?}: '{}'", DecodeState::Start, image.display());

        let segmentation = match self.segmenter.segment_file(image, &self.work_dir, tag, tracker) {
            Ok(Some(seg)) => seg,
            Ok(None) => return ArbitrationDecision::failed(self.settings.get()),
            Err(e) => {
                tracing::warn!("Segmentation failed: {:#}", e);
                return ArbitrationDecision::failed(self.settings.get());
            }
        };
        tracing::debug!("{:?}: {} glyphs", DecodeState::Segmented, segmentation.glyphs.len());
        for path in segmentation.artifact_paths() {
            tracing::debug!("  artifact '{}'", path.display());
        }

        let cnn_text = match self.classify(&segmentation) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Classification failed: {:#}", e);
                return ArbitrationDecision::failed(self.settings.get());
            }
        };
        tracing::debug!("{:?}: {}", DecodeState::Classified, cnn_text);

        let ocr_text = self.ocr.as_ref().and_then(|engine| match engine.recognize(image) {
            Ok(text) => {
                tracing::debug!("{:?}: {}", DecodeState::OcrQueried, text);
                Some(text)
            }
            Err(e) => {
                tracing::warn!("OCR failed, using CNN only: {:#}", e);
                None
            }
        });

        arbitrate(cnn_text, ocr_text, self.settings.get())
    }

    fn classify(&self, segmentation: &Segmentation) -> Result<String> {
        let mut text = String::with_capacity(segmentation.glyphs.len());
        for glyph in &segmentation.glyphs {
            match self.classifier.classify(&glyph.image)? {
                Some(label) => text.push_str(&label),
                None => {
                    tracing::warn!("Glyph {} has no label, using '{}'", glyph.index, PLACEHOLDER);
                    text.push(PLACEHOLDER);
                }
            }
        }
        Ok(text)
    }
}
