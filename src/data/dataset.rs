use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use burn::data::dataset::Dataset;

use crate::data::transform::GlyphTransform;
use crate::infra::class_index::ClassifierIndex;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One normalised glyph and its class.
#[derive(Debug, Clone)]
pub struct GlyphSample {
    /// Row-major [H, W] pixels after `GlyphTransform::apply`
    pub pixels: Vec<f32>,
    pub class:  usize,
}

pub struct GlyphDataset {
    samples: Vec<GlyphSample>,
}

impl GlyphDataset {
    pub fn new(samples: Vec<GlyphSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<GlyphSample> for GlyphDataset {
    fn get(&self, index: usize) -> Option<GlyphSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Image-folder layout: `root/<label>/<any>.{jpg,jpeg,png}`.
///
/// Returns the index built from the sorted label directories and
/// every sample, transformed with `transform`.
pub fn load_glyph_folder(root: &Path, transform: &GlyphTransform) -> Result<(ClassifierIndex, Vec<GlyphSample>)> {
    let mut label_dirs = Vec::new();
    for entry in fs::read_dir(root)
        .with_context(|| format!("Cannot read training data directory '{}'", root.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            label_dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    if label_dirs.is_empty() {
        bail!("No label directories found under '{}'", root.display());
    }

    let index = ClassifierIndex::from_labels(label_dirs.iter().map(|(label, _)| label.clone()));
    tracing::info!("Class index: {:?}", index.labels());

    let mut samples = Vec::new();
    for (label, dir) in &label_dirs {
        let Some(class) = index.class_of(label) else { continue };

        let mut files: Vec<_> = fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| has_image_extension(p))
            .collect();
        files.sort();

        for path in files {
            let image = image::open(&path)
                .with_context(|| format!("Cannot open training image '{}'", path.display()))?;
            samples.push(GlyphSample { pixels: transform.apply(&image), class });
        }
    }

    tracing::info!("Loaded {} glyph samples across {} classes", samples.len(), index.len());
    Ok((index, samples))
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn loads_one_class_per_directory() {
        let dir = tempfile::tempdir().unwrap();
        for (label, count) in [("B", 2), ("A", 3)] {
            let sub = dir.path().join(label);
            fs::create_dir_all(&sub).unwrap();
            for i in 0..count {
                GrayImage::from_pixel(8, 10, Luma([200])).save(sub.join(format!("{i}.png"))).unwrap();
            }
            fs::write(sub.join("notes.txt"), "ignored").unwrap();
        }

        let (index, samples) = load_glyph_folder(dir.path(), &GlyphTransform::default()).unwrap();
        assert_eq!(index.labels(), ["A", "B"]);
        assert_eq!(samples.len(), 5);
        assert_eq!(samples.iter().filter(|s| s.class == 0).count(), 3);
        assert!(samples.iter().all(|s| s.pixels.len() == 80));
    }

    #[test]
    fn empty_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_glyph_folder(dir.path(), &GlyphTransform::default()).is_err());
    }
}
