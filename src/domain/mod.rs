// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits describing captcha decoding:
// the fixed layout of the captcha, how two recognisers are
// reconciled, and the seams the decoder depends on.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only structs, enums, traits, and pure functions

// Pixel layout of the captcha generator
pub mod geometry;

// Engine preference, decode states, and the arbitration rule
pub mod arbitration;

// Collaborator seams (glyph classifier, external OCR)
pub mod traits;
