// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
// decode a captcha, run an interactive session, train the
// classifier, or prepare a glyph folder for training.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing (that's Layer 1)
//   - Only workflow coordination

/// Service configuration (JSON file + defaults)
pub mod config;

/// Segmentation → classification → arbitration for one image
pub mod decoder;

/// Long-lived decode entry point shared by CLI and interactive mode
pub mod recognition_service;

/// Prompt loop over the recognition service
pub mod interactive;

/// The training workflow
pub mod train_use_case;

/// Captcha images + label files → glyph folder
pub mod prepare_use_case;
