use std::{path::Path, process::Command};

use anyhow::{anyhow, Context, Result};

use crate::domain::traits::TextRecognizer;

/// Characters the captcha generator can draw.
pub const CAPTCHA_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Tesseract driven through its command-line binary.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary:    String,
    psm:       u32,
    oem:       u32,
    whitelist: String,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractCli {
    /// Single-character page segmentation with the captcha whitelist.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary:    binary.into(),
            psm:       10,
            oem:       3,
            whitelist: CAPTCHA_WHITELIST.to_string(),
        }
    }

    fn args_for(&self, image: &Path) -> Vec<String> {
        vec![
            image.to_string_lossy().into_owned(),
            "stdout".into(),
            "--psm".into(),
            self.psm.to_string(),
            "--oem".into(),
            self.oem.to_string(),
            "-c".into(),
            format!("tessedit_char_whitelist={}", self.whitelist),
        ]
    }
}

impl TextRecognizer for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        match Command::new(&self.binary).arg("--version").output() {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                tracing::warn!(
                    "Tesseract not usable: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Err(e) => {
                tracing::warn!("Tesseract not found: {}", e);
                false
            }
        }
    }

    fn recognize(&self, image: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(self.args_for(image))
            .output()
            .with_context(|| format!("failed to run {} (is it installed?)", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
