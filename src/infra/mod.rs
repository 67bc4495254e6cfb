// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs   — weights + class index + descriptor, saved
//                     and loaded as one validated unit
//   class_index.rs  — label ↔ class integer bijection (JSON)
//   metrics.rs      — per-epoch training metrics CSV
//   temp_tracker.rs — intermediate files, deleted once at exit
//                     or on Ctrl+C
//   tesseract.rs    — the optional external OCR engine, driven
//                     through its command-line binary

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Label to class-integer mapping
pub mod class_index;

/// Training metrics CSV logger
pub mod metrics;

/// Temp artifact registry and shutdown cleanup
pub mod temp_tracker;

/// Tesseract CLI adapter
pub mod tesseract;
