// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between an image on disk and a tensor batch:
//
//   captcha.jpg
//       │
//       ▼
//   Segmenter        → text region → fixed-stride glyph slices
//       │
//       ▼
//   GlyphTransform   → grayscale, resize, normalise (shared by
//       │              training and inference)
//       ▼
//   GlyphDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   GlyphBatcher     → stacks samples into [N, 1, H, W] batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Crops captchas into glyph slices using the fixed geometry
pub mod segmenter;

/// The normalization contract between training and inference
pub mod transform;

/// Image-folder glyph dataset for training
pub mod dataset;

/// Burn Batcher for glyph samples
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
