// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here: the glyph network, its
// training loop, and the classifier used at decode time.
//
//   model.rs      — GlyphCnn: conv+pool ×2, then two linear layers
//   trainer.rs    — Adam + cross-entropy, per-epoch validation
//   inferencer.rs — CnnClassifier: checkpoint → GlyphClassifier
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Small convolutional glyph classifier
pub mod model;

/// Training loop with validation metrics
pub mod trainer;

/// Inference wrapper implementing GlyphClassifier
pub mod inferencer;
