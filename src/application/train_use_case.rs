// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the glyph folder     (Layer 4 - data)
//   Step 2: Split train/validation    (Layer 4 - data)
//   Step 3: Build datasets            (Layer 4 - data)
//   Step 4: Open the metrics log      (Layer 6 - infra)
//   Step 5: Run training loop         (Layer 5 - ml)
//   Step 6: Save checkpoint twice     (Layer 6 - infra)
//           <model_dir>/          latest, read by the service
//           <model_dir>/<run_tag>/ kept for reproducibility
//
// Reference: Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::application::recognition_service::new_run_tag;
use crate::data::{
    dataset::{load_glyph_folder, GlyphDataset},
    splitter::split_train_val,
    transform::GlyphTransform,
};
use crate::infra::{
    checkpoint::{CheckpointManager, ModelDescriptor},
    metrics::MetricsLogger,
};
use crate::ml::{model::GlyphCnnConfig, trainer::run_training};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// One sub-directory of glyph images per label
    pub data_dir:       PathBuf,
    pub model_dir:      PathBuf,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub learning_rate:  f64,
    pub train_fraction: f64,
    pub seed:           u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       PathBuf::from("data/singleChar"),
            model_dir:      PathBuf::from("models"),
            batch_size:     32,
            epochs:         10,
            learning_rate:  1e-3,
            train_fraction: 0.8,
            seed:           42,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train, save, and return the per-run checkpoint directory.
    pub fn execute(&self) -> Result<PathBuf> {
        let cfg = &self.config;
        if cfg.batch_size == 0 || cfg.epochs == 0 {
            bail!("batch_size and epochs must both be at least 1");
        }
        if !(0.0..=1.0).contains(&cfg.train_fraction) {
            bail!("train_fraction must lie in [0, 1], got {}", cfg.train_fraction);
        }

        let transform = GlyphTransform::default();
        let run_tag   = new_run_tag();
        let run_dir   = cfg.model_dir.join(&run_tag);
        tracing::info!("Training run {}", run_tag);

        // ── Step 1: Load labelled glyphs ──────────────────────────────────────
        let (index, samples) = load_glyph_folder(&cfg.data_dir, &transform)?;
        if index.len() < 2 {
            bail!("Need at least two label directories to train, found {}", index.len());
        }

        // ── Step 2: Seeded shuffle + split ────────────────────────────────────
        let (train_samples, val_samples) = split_train_val(samples, cfg.train_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 3: Burn datasets ─────────────────────────────────────────────
        let train_dataset = GlyphDataset::new(train_samples);
        let val_dataset   = GlyphDataset::new(val_samples);

        // ── Step 4: Metrics CSV next to the per-run checkpoint ───────────────
        let metrics = MetricsLogger::new(&run_dir)?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let model_cfg = GlyphCnnConfig::new(
            index.len(),
            transform.height as usize,
            transform.width as usize,
        );
        let model = run_training(cfg, &model_cfg, &transform, train_dataset, val_dataset, &metrics)?;

        // ── Step 6: Persist ───────────────────────────────────────────────────
        let descriptor = ModelDescriptor::new(model_cfg, transform, run_tag);
        CheckpointManager::new(&cfg.model_dir).save(&model, &index, &descriptor)?;
        CheckpointManager::new(&run_dir).save(&model, &index, &descriptor)?;

        Ok(run_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{config::ServiceConfig, recognition_service::CaptchaService};
    use crate::infra::{checkpoint::WEIGHTS_FILE, temp_tracker::TempTracker};
    use crate::test_support::captcha_from_glyphs;
    use image::{GrayImage, Luma};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::{fs, path::Path};

    const LABELS: [char; 5] = ['3', 'A', 'B', 'D', 'E'];

    /// 8x10 glyph: a dark band whose position depends on the class,
    /// over a lightly noisy white background.
    fn band_glyph(class: usize, rng: &mut StdRng) -> GrayImage {
        GrayImage::from_fn(8, 10, |x, y| {
            let inside = match class {
                0 => x < 2,
                1 => (2..4).contains(&x),
                2 => (4..6).contains(&x),
                3 => x >= 6,
                _ => (4..6).contains(&y),
            };
            let base: i32 = if inside { 20 } else { 235 };
            Luma([(base + rng.gen_range(-15..=15)).clamp(0, 255) as u8])
        })
    }

    fn write_glyph_folder(root: &Path, per_class: usize) {
        let mut rng = StdRng::seed_from_u64(7);
        for (class, label) in LABELS.iter().enumerate() {
            let dir = root.join(label.to_string());
            fs::create_dir_all(&dir).unwrap();
            for n in 0..per_class {
                band_glyph(class, &mut rng).save(dir.join(format!("{n}.png"))).unwrap();
            }
        }
    }

    #[test]
    fn empty_data_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            data_dir:  dir.path().to_path_buf(),
            model_dir: dir.path().join("models"),
            ..Default::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn trained_model_decodes_a_captcha_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir  = dir.path().join("glyphs");
        let model_dir = dir.path().join("models");
        write_glyph_folder(&data_dir, 30);

        let cfg = TrainConfig {
            data_dir,
            model_dir: model_dir.clone(),
            batch_size: 16,
            epochs: 20,
            learning_rate: 5e-3,
            ..Default::default()
        };
        let run_dir = TrainUseCase::new(cfg).execute().unwrap();

        for d in [&model_dir, &run_dir] {
            assert!(d.join(WEIGHTS_FILE).is_file());
            assert!(d.join("class_index.json").is_file());
            assert!(d.join("model.json").is_file());
        }
        let csv = fs::read_to_string(run_dir.join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 1 + 20);

        // Glyphs for "AB3DE", drawn fresh
        let mut rng = StdRng::seed_from_u64(99);
        let glyphs: Vec<GrayImage> = "AB3DE"
            .chars()
            .map(|c| band_glyph(LABELS.iter().position(|&l| l == c).unwrap(), &mut rng))
            .collect();
        let image = dir.path().join("captcha.png");
        captcha_from_glyphs(&glyphs).save(&image).unwrap();

        let config = ServiceConfig {
            model_dir,
            work_dir: dir.path().join("work"),
            ocr_enabled: false,
            ..Default::default()
        };
        let service = CaptchaService::new(&config, TempTracker::new()).unwrap();
        let out = dir.path().join("out.txt");
        let decision = service.decode(&image, &out).unwrap();

        assert_eq!(decision.text, "AB3DE");
        assert_eq!(fs::read_to_string(out).unwrap().trim(), "AB3DE");
    }
}
