// ============================================================
// Layer 5 — Inferencer
// ============================================================
use std::path::Path;

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    prelude::*,
};
use image::DynamicImage;
use parking_lot::Mutex;

use crate::data::{batcher::images_to_tensor, transform::GlyphTransform};
use crate::domain::traits::GlyphClassifier;
use crate::infra::{checkpoint::CheckpointManager, class_index::ClassifierIndex};
use crate::ml::model::GlyphCnn;

type InferBackend = NdArray;

/// Glyph classifier backed by a trained `GlyphCnn`.
///
/// Loaded once per service and shared by every decode call. Forward
/// passes are serialised through a mutex.
pub struct CnnClassifier {
    model:     Mutex<GlyphCnn<InferBackend>>,
    index:     ClassifierIndex,
    transform: GlyphTransform,
    device:    NdArrayDevice,
}

impl CnnClassifier {
    pub fn from_checkpoint_dir(dir: &Path) -> Result<Self> {
        let device    = NdArrayDevice::default();
        let transform = GlyphTransform::default();
        let loaded    = CheckpointManager::new(dir).load::<InferBackend>(&transform, &device)?;
        tracing::info!(
            "Loaded CNN model with {} classes (run {})",
            loaded.index.len(),
            loaded.descriptor.run_tag
        );
        Ok(Self::new(loaded.model, loaded.index, transform, device))
    }

    pub fn new(
        model:     GlyphCnn<InferBackend>,
        index:     ClassifierIndex,
        transform: GlyphTransform,
        device:    NdArrayDevice,
    ) -> Self {
        Self { model: Mutex::new(model), index, transform, device }
    }

    pub fn index(&self) -> &ClassifierIndex {
        &self.index
    }

    /// Arg-max class for one glyph.
    pub fn predict_class(&self, glyph: &DynamicImage) -> usize {
        let pixels = self.transform.apply(glyph);
        let input  = images_to_tensor::<InferBackend>(
            pixels,
            1,
            self.transform.height as usize,
            self.transform.width as usize,
            &self.device,
        );

        let logits = self.model.lock().forward(input);
        logits.argmax(1).into_scalar().elem::<i64>() as usize
    }
}

impl GlyphClassifier for CnnClassifier {
    fn classify(&self, glyph: &DynamicImage) -> Result<Option<String>> {
        let class = self.predict_class(glyph);
        let label = self.index.label_of(class).map(str::to_string);
        if label.is_none() {
            tracing::warn!("Predicted class {} has no label in the class index", class);
        }
        Ok(label)
    }
}
