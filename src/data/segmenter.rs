// ============================================================
// Layer 4 — Segmentation Engine
// ============================================================
// Cuts a captcha into its glyphs using the fixed geometry:
//
//   1. crop  — full image → text region (fails if the image is
//              smaller than the configured rectangle)
//   2. slice — text region → N fixed-stride glyph slices, left
//              to right; the last slice is clipped to the region
//
// `segment_file` additionally writes the region and every glyph
// as PNG artifacts into a working directory and registers each
// with the TempTracker. File names carry a caller-supplied tag
// so concurrent decodes sharing one directory never collide:
//
//   <tag>_<stem>.png        text region
//   <tag>_<i>_<stem>.png    glyph i

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use image::DynamicImage;

use crate::domain::geometry::{glyph_spans, Geometry, GeometryError, Rect};
use crate::infra::temp_tracker::TempTracker;

/// One glyph cut out of the text region.
#[derive(Debug, Clone)]
pub struct GlyphSlice {
    /// Position from the left, starting at 0
    pub index: usize,
    pub image: DynamicImage,
    /// Artifact written for this glyph
    pub path:  PathBuf,
}

/// Everything produced by segmenting one captcha file.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub region_path: PathBuf,
    pub glyphs:      Vec<GlyphSlice>,
}

impl Segmentation {
    pub fn artifact_paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.region_path.as_path())
            .chain(self.glyphs.iter().map(|g| g.path.as_path()))
    }
}

/// Crop `rect` out of `image`.
pub fn crop_region(image: &DynamicImage, rect: Rect) -> Result<DynamicImage, GeometryError> {
    let (width, height) = (image.width(), image.height());
    if !rect.fits_within(width, height) {
        return Err(GeometryError::ImageTooSmall { width, height, region: rect });
    }
    Ok(image.crop_imm(rect.x, rect.y, rect.width, rect.height))
}

/// Cut `count` slices of `width` pixels every `stride` pixels,
/// spanning the full height of `region`. Always returns exactly
/// `count` images; a trailing slice is clipped to the region.
pub fn slice_region(region: &DynamicImage, count: usize, width: u32, stride: u32) -> Vec<DynamicImage> {
    glyph_spans(region.width(), count, width, stride)
        .into_iter()
        .map(|(x, w)| region.crop_imm(x, 0, w, region.height()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    geometry: Geometry,
}

impl Segmenter {
    pub fn new(geometry: Geometry) -> Result<Self, GeometryError> {
        geometry.validate()?;
        Ok(Self { geometry })
    }

    pub fn crop(&self, image: &DynamicImage) -> Result<DynamicImage, GeometryError> {
        crop_region(image, self.geometry.region)
    }

    pub fn slice(&self, region: &DynamicImage) -> Vec<DynamicImage> {
        let g = &self.geometry;
        slice_region(region, g.glyph_count, g.glyph_width, g.stride)
    }

    /// Crop + slice without touching the filesystem.
    pub fn segment_image(&self, image: &DynamicImage) -> Result<(DynamicImage, Vec<DynamicImage>), GeometryError> {
        let region = self.crop(image)?;
        let glyphs = self.slice(&region);
        Ok((region, glyphs))
    }

    /// Segment the captcha at `source`, writing artifacts to `work_dir`.
    ///
    /// Returns `Ok(None)` when `source` does not exist; callers treat
    /// that as "unavailable", not as an error.
    pub fn segment_file(
        &self,
        source:   &Path,
        work_dir: &Path,
        tag:      &str,
        tracker:  &TempTracker,
    ) -> Result<Option<Segmentation>> {
        if !source.is_file() {
            tracing::warn!("'{}' not found", source.display());
            return Ok(None);
        }

        let image = image::open(source)
            .with_context(|| format!("Cannot open image '{}'", source.display()))?;
        let (region, glyphs) = self.segment_image(&image)
            .with_context(|| format!("Cannot segment '{}'", source.display()))?;

        fs::create_dir_all(work_dir)
            .with_context(|| format!("Cannot create working directory '{}'", work_dir.display()))?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "captcha".to_string());

        let region_path = work_dir.join(format!("{tag}_{stem}.png"));
        save_artifact(&region, &region_path, tracker)?;

        let glyphs = glyphs
            .into_iter()
            .enumerate()
            .map(|(index, image)| {
                let path = work_dir.join(format!("{tag}_{index}_{stem}.png"));
                save_artifact(&image, &path, tracker)?;
                Ok(GlyphSlice { index, image, path })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Segmented '{}' into {} glyphs", source.display(), glyphs.len());
        Ok(Some(Segmentation { region_path, glyphs }))
    }
}

fn save_artifact(image: &DynamicImage, path: &Path, tracker: &TempTracker) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("Cannot write artifact '{}'", path.display()))?;
    tracker.register(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::synthetic_captcha;

    fn segmenter() -> Segmenter {
        Segmenter::new(Geometry::default()).unwrap()
    }

    #[test]
    fn slices_default_region_into_five_glyphs() {
        let img = DynamicImage::ImageRgb8(synthetic_captcha(&[10, 60, 110, 160, 210]));
        let (region, glyphs) = segmenter().segment_image(&img).unwrap();
        assert_eq!((region.width(), region.height()), (44, 10));
        assert_eq!(glyphs.len(), 5);
        for (i, glyph) in glyphs.iter().enumerate() {
            assert_eq!((glyph.width(), glyph.height()), (8, 10));
            let level = glyph.to_luma8().get_pixel(3, 4).0[0];
            assert_eq!(level, [10, 60, 110, 160, 210][i]);
        }
    }

    #[test]
    fn slice_count_is_independent_of_region_width() {
        for width in [37u32, 40, 44, 60, 200] {
            let region = DynamicImage::new_luma8(width, 10);
            let glyphs = slice_region(&region, 5, 8, 9);
            assert_eq!(glyphs.len(), 5, "width {width}");
            assert!(glyphs.iter().all(|g| g.width() <= 8));
        }
    }

    #[test]
    fn last_slice_is_clipped_not_rejected() {
        let region = DynamicImage::new_luma8(40, 10);
        let glyphs = slice_region(&region, 5, 8, 9);
        assert_eq!(glyphs[4].width(), 4);
    }

    #[test]
    fn image_smaller_than_region_is_rejected() {
        let tiny = DynamicImage::new_rgb8(30, 15);
        let err = segmenter().crop(&tiny).unwrap_err();
        assert!(matches!(err, GeometryError::ImageTooSmall { width: 30, height: 15, .. }));
    }

    #[test]
    fn missing_source_is_unavailable_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = TempTracker::new();
        let out = segmenter()
            .segment_file(&dir.path().join("nope.jpg"), dir.path(), "t", &tracker)
            .unwrap();
        assert!(out.is_none());
        assert!(tracker.registered().is_empty());
    }

    #[test]
    fn artifacts_are_tagged_and_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("input01.png");
        synthetic_captcha(&[0, 50, 100, 150, 200]).save(&source).unwrap();

        let tracker = TempTracker::new();
        let work = dir.path().join("work");
        let seg = segmenter().segment_file(&source, &work, "ab12-1", &tracker).unwrap().unwrap();

        assert_eq!(seg.region_path, work.join("ab12-1_input01.png"));
        assert_eq!(seg.glyphs[2].path, work.join("ab12-1_2_input01.png"));
        let registered = tracker.registered();
        assert_eq!(registered.len(), 6);
        for path in seg.artifact_paths() {
            assert!(path.is_file());
            assert!(registered.iter().any(|p| p == path));
        }
    }

    #[test]
    fn segmentation_is_byte_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("captcha.png");
        synthetic_captcha(&[30, 80, 130, 180, 230]).save(&source).unwrap();

        let tracker = TempTracker::new();
        let s = segmenter();
        let first = s.segment_file(&source, dir.path(), "one", &tracker).unwrap().unwrap();
        let second = s.segment_file(&source, dir.path(), "two", &tracker).unwrap().unwrap();

        for (a, b) in first.glyphs.iter().zip(&second.glyphs) {
            assert_ne!(a.path, b.path);
            assert_eq!(fs::read(&a.path).unwrap(), fs::read(&b.path).unwrap());
        }
    }
}
