// ============================================================
// Layer 2 — Service Configuration
// ============================================================
// Everything a CaptchaService needs to be built. Every field has
// a default, so a JSON config file only has to name what it
// changes:
//
//   { "model_dir": "models/v2", "default_engine": "OCR" }
//
// CLI flags are applied on top of the file (see cli::commands).

use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{arbitration::EnginePreference, geometry::Geometry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding weights, class index, and descriptor
    pub model_dir:        PathBuf,
    /// Where per-decode artifacts are written
    pub work_dir:         PathBuf,
    pub geometry:         Geometry,
    /// Engine that wins when CNN and OCR disagree
    pub default_engine:   EnginePreference,
    /// Probe for and consult the external OCR engine
    pub ocr_enabled:      bool,
    pub tesseract_binary: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir:        PathBuf::from("models"),
            work_dir:         PathBuf::from("output/tmp"),
            geometry:         Geometry::default(),
            default_engine:   EnginePreference::Cnn,
            ocr_enabled:      true,
            tesseract_binary: "tesseract".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }
}
