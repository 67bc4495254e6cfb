// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores a trained classifier as one unit. A model
// directory holds three files that are only valid together:
//
//   models/
//     glyph_cnn.mpk.gz   ← weights (named MessagePack, gzipped,
//                          half precision)
//     class_index.json   ← label → class integer
//     model.json         ← descriptor: format version, network
//                          config (incl. num_classes), and the
//                          GlyphTransform used during training
//
// Loading checks the descriptor against the index and against
// the transform compiled into this binary, and refuses to build
// a classifier when they disagree.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::data::transform::GlyphTransform;
use crate::infra::class_index::ClassifierIndex;
use crate::ml::model::{GlyphCnn, GlyphCnnConfig};

/// Bumped whenever the on-disk layout or descriptor fields change.
pub const FORMAT_VERSION: u32 = 1;

/// Recorder for the weights file. It appends `.mpk.gz` to the stem.
type WeightsRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

const WEIGHTS_STEM: &str = "glyph_cnn";
pub const WEIGHTS_FILE: &str = "glyph_cnn.mpk.gz";
const INDEX_FILE: &str = "class_index.json";
const DESCRIPTOR_FILE: &str = "model.json";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("unsupported checkpoint format version {found} (this build reads {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("class index has {index} labels but the model was trained for {model} classes")]
    ClassCountMismatch { index: usize, model: usize },

    #[error("checkpoint was trained with normalization {found:?}, this build uses {expected:?}")]
    NormalizationMismatch { found: GlyphTransform, expected: GlyphTransform },

    #[error("invalid class index: {0}")]
    InvalidIndex(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub format_version: u32,
    pub model:          GlyphCnnConfig,
    pub transform:      GlyphTransform,
    /// Tag of the training run that produced the weights
    pub run_tag:        String,
}

impl ModelDescriptor {
    pub fn new(model: GlyphCnnConfig, transform: GlyphTransform, run_tag: impl Into<String>) -> Self {
        Self { format_version: FORMAT_VERSION, model, transform, run_tag: run_tag.into() }
    }

    pub fn validate(&self, index: &ClassifierIndex, expected: &GlyphTransform) -> Result<(), CheckpointError> {
        if self.format_version != FORMAT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found:    self.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if self.model.num_classes != index.len() {
            return Err(CheckpointError::ClassCountMismatch {
                index: index.len(),
                model: self.model.num_classes,
            });
        }
        if self.transform != *expected {
            return Err(CheckpointError::NormalizationMismatch {
                found:    self.transform,
                expected: *expected,
            });
        }
        Ok(())
    }
}

/// A validated model + index pair ready for inference.
pub struct LoadedCheckpoint<B: Backend> {
    pub model:      GlyphCnn<B>,
    pub index:      ClassifierIndex,
    pub descriptor: ModelDescriptor,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write weights, index, and descriptor into the directory.
    pub fn save<B: Backend>(
        &self,
        model:      &GlyphCnn<B>,
        index:      &ClassifierIndex,
        descriptor: &ModelDescriptor,
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create model directory '{}'", self.dir.display()))?;

        let weights = self.dir.join(WEIGHTS_STEM);
        WeightsRecorder::new()
            .record(model.clone().into_record(), weights.clone())
            .with_context(|| format!("Failed to save weights to '{}'", weights.display()))?;

        index.save(&self.dir.join(INDEX_FILE))?;

        let json = serde_json::to_string_pretty(descriptor)?;
        let descriptor_path = self.dir.join(DESCRIPTOR_FILE);
        fs::write(&descriptor_path, json)
            .with_context(|| format!("Cannot write descriptor to '{}'", descriptor_path.display()))?;

        tracing::info!("Saved model to '{}'", self.dir.display());
        Ok(())
    }

    pub fn load_descriptor(&self) -> Result<ModelDescriptor> {
        let path = self.dir.join(DESCRIPTOR_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read '{}'. Have you run 'captcha train' first?", path.display())
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed model descriptor '{}'", path.display()))
    }

    /// Load and validate the weights + index pair.
    pub fn load<B: Backend>(&self, expected: &GlyphTransform, device: &B::Device) -> Result<LoadedCheckpoint<B>> {
        let descriptor = self.load_descriptor()?;
        let index = ClassifierIndex::load(&self.dir.join(INDEX_FILE))?;
        descriptor.validate(&index, expected)?;

        tracing::info!("Loading from '{}'", self.dir.display());
        let weights = self.dir.join(WEIGHTS_STEM);
        let record = WeightsRecorder::new()
            .load(weights.clone(), device)
            .with_context(|| format!("Cannot load weights '{}'", weights.display()))?;

        let model = descriptor.model.init::<B>(device).load_record(record);
        Ok(LoadedCheckpoint { model, index, descriptor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn saved(dir: &Path, labels: &[&str]) -> CheckpointManager {
        let device = Default::default();
        let index = ClassifierIndex::from_labels(labels.iter().copied());
        let cfg = GlyphCnnConfig::new(index.len(), 10, 8);
        let model: GlyphCnn<NdArray> = cfg.init(&device);
        let manager = CheckpointManager::new(dir);
        manager
            .save(&model, &index, &ModelDescriptor::new(cfg, GlyphTransform::default(), "test"))
            .unwrap();
        manager
    }

    #[test]
    fn save_then_load_restores_index_and_weights() {
        let dir = tempfile::tempdir().unwrap();
        let manager = saved(dir.path(), &["A", "B", "C"]);
        assert!(dir.path().join(WEIGHTS_FILE).is_file());
        assert!(!dir.path().join("glyph_cnn.mpk").exists());

        let loaded = manager
            .load::<NdArray>(&GlyphTransform::default(), &Default::default())
            .unwrap();
        assert_eq!(loaded.index.labels(), ["A", "B", "C"]);
        assert_eq!(loaded.descriptor.model.num_classes, 3);
    }

    #[test]
    fn index_with_wrong_class_count_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let manager = saved(dir.path(), &["A", "B", "C"]);
        ClassifierIndex::from_labels(["A", "B"]).save(&dir.path().join(INDEX_FILE)).unwrap();

        let err = manager
            .load::<NdArray>(&GlyphTransform::default(), &Default::default())
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<CheckpointError>(),
            Some(CheckpointError::ClassCountMismatch { index: 2, model: 3 })
        ));
    }

    #[test]
    fn different_normalization_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let manager = saved(dir.path(), &["A", "B"]);
        let other = GlyphTransform { mean: 0.1307, std: 0.3081, ..GlyphTransform::default() };

        let err = manager.load::<NdArray>(&other, &Default::default()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CheckpointError>(),
            Some(CheckpointError::NormalizationMismatch { .. })
        ));
    }

    #[test]
    fn missing_checkpoint_names_the_fix() {
        let dir = tempfile::tempdir().unwrap();
        let err = CheckpointManager::new(dir.path().join("empty"))
            .load::<NdArray>(&GlyphTransform::default(), &Default::default())
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("captcha train"));
    }
}
