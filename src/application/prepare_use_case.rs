// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Turns labelled captcha images into the glyph folder that
// `train` reads. Uses the same Segmenter as recognition, so the
// training glyphs are cut exactly as decode-time glyphs are.
//
//   input/  Input001.jpg
//   labels/ output001.txt      ("AB3DE")
//   out/    A/A_Input001.png, B/B_Input001.png, ...

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::data::segmenter::Segmenter;
use crate::domain::geometry::Geometry;

pub struct PrepareConfig {
    pub input_dir:  PathBuf,
    pub labels_dir: PathBuf,
    pub output_dir: PathBuf,
    pub geometry:   Geometry,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrepareSummary {
    pub images:  usize,
    pub glyphs:  usize,
    pub skipped: usize,
}

/// `Input001.jpg` → `output001.txt`
pub fn label_file_name(image: &Path) -> Option<String> {
    let stem = image.file_stem()?.to_string_lossy().to_lowercase();
    Some(format!("{}.txt", stem.replace("input", "output")))
}

pub struct PrepareUseCase {
    config:    PrepareConfig,
    segmenter: Segmenter,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Result<Self> {
        let segmenter = Segmenter::new(config.geometry.clone())?;
        Ok(Self { config, segmenter })
    }

    pub fn execute(&self) -> Result<PrepareSummary> {
        let cfg = &self.config;
        let mut images: Vec<PathBuf> = fs::read_dir(&cfg.input_dir)
            .with_context(|| format!("Cannot read input directory '{}'", cfg.input_dir.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("jpg")))
            .collect();
        images.sort();

        let mut summary = PrepareSummary::default();
        for path in &images {
            match self.prepare_one(path)? {
                Some(n) => {
                    summary.images += 1;
                    summary.glyphs += n;
                }
                None => summary.skipped += 1,
            }
        }

        tracing::info!(
            "Prepared {} images ({} glyphs), skipped {}",
            summary.images,
            summary.glyphs,
            summary.skipped
        );
        Ok(summary)
    }

    /// Glyphs written for one image, or None if it was skipped.
    fn prepare_one(&self, image_path: &Path) -> Result<Option<usize>> {
        let Some(label_name) = label_file_name(image_path) else { return Ok(None) };
        let label_path = self.config.labels_dir.join(label_name);
        let label = match fs::read_to_string(&label_path) {
            Ok(text) => text.trim().to_string(),
            Err(_) => {
                tracing::warn!("No label file '{}', skipping", label_path.display());
                return Ok(None);
            }
        };

        let image = match image::open(image_path) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("Cannot open '{}': {}", image_path.display(), e);
                return Ok(None);
            }
        };
        let (_, glyphs) = match self.segmenter.segment_image(&image) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!("'{}': {}", image_path.display(), e);
                return Ok(None);
            }
        };

        let chars: Vec<char> = label.chars().collect();
        if chars.len() != glyphs.len() {
            tracing::warn!(
                "Label '{}' has {} characters but {} glyphs were cut from '{}', skipping",
                label,
                chars.len(),
                glyphs.len(),
                image_path.display()
            );
            return Ok(None);
        }

        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        for (c, glyph) in chars.iter().zip(&glyphs) {
            let dir = self.config.output_dir.join(c.to_string());
            fs::create_dir_all(&dir)
                .with_context(|| format!("Cannot create '{}'", dir.display()))?;
            let out = dir.join(format!("{c}_{stem}.png"));
            glyph
                .save(&out)
                .with_context(|| format!("Cannot write glyph '{}'", out.display()))?;
        }
        Ok(Some(glyphs.len()))
    }
}
