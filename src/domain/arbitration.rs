// ============================================================
// Layer 3 — Arbitration
// ============================================================
// Two independent recognisers may read the same captcha:
//
//   CNN  — our own glyph classifier (always present)
//   OCR  — an external text-recognition engine (optional)
//
// When both answered and agree, the shared text wins. When they
// disagree, the engine currently configured as the default wins.
// The default can be changed at runtime, so it lives behind a
// lock in `EngineSettings` and is handed to the decoder at
// construction time rather than read from a global.
//
// Decode lifecycle:
//
//   Start ──► Segmented ──► Classified ──┬─► OcrQueried ──► Resolved
//     │                                  └────────────────► Resolved
//     └──► Failed ("N/A")

use std::{fmt, str::FromStr, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Text returned when an image could not be decoded at all.
pub const SENTINEL: &str = "N/A";

/// Which recogniser wins a disagreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnginePreference {
    #[default]
    #[serde(rename = "CNN")]
    Cnn,
    #[serde(rename = "OCR")]
    Ocr,
}

impl fmt::Display for EnginePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnginePreference::Cnn => f.write_str("CNN"),
            EnginePreference::Ocr => f.write_str("OCR"),
        }
    }
}

impl FromStr for EnginePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CNN" => Ok(EnginePreference::Cnn),
            "OCR" => Ok(EnginePreference::Ocr),
            other => Err(format!("unknown engine '{other}', expected CNN or OCR")),
        }
    }
}

/// Shared, runtime-mutable default-engine preference.
///
/// Cloning shares the same underlying value. Reads are cheap;
/// every write goes through [`EngineSettings::set`].
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    inner: Arc<RwLock<EnginePreference>>,
}

impl EngineSettings {
    pub fn new(preference: EnginePreference) -> Self {
        Self { inner: Arc::new(RwLock::new(preference)) }
    }

    pub fn get(&self) -> EnginePreference {
        *self.inner.read()
    }

    /// Replace the preference, returning the previous value.
    pub fn set(&self, preference: EnginePreference) -> EnginePreference {
        let previous = std::mem::replace(&mut *self.inner.write(), preference);
        tracing::info!("Default engine: {} -> {}", previous, preference);
        previous
    }
}

/// Where a decode ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Start,
    Segmented,
    Classified,
    OcrQueried,
    Resolved,
    Failed,
}

/// The final answer for one captcha plus how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitrationDecision {
    pub text:       String,
    pub state:      DecodeState,
    /// Concatenated classifier predictions, if classification ran
    pub cnn_text:   Option<String>,
    /// OCR output, if the engine was available and answered
    pub ocr_text:   Option<String>,
    /// Both engines answered and produced identical text
    pub agreed:     bool,
    /// Preference in force when the decision was taken
    pub preference: EnginePreference,
}

impl ArbitrationDecision {
    /// Decision for an image that never made it past segmentation.
    pub fn failed(preference: EnginePreference) -> Self {
        Self {
            text: SENTINEL.to_string(),
            state: DecodeState::Failed,
            cnn_text: None,
            ocr_text: None,
            agreed: false,
            preference,
        }
    }
}

/// Reconcile classifier text with optional OCR text.
pub fn arbitrate(
    cnn_text:   String,
    ocr_text:   Option<String>,
    preference: EnginePreference,
) -> ArbitrationDecision {
    let Some(ocr) = ocr_text else {
        tracing::info!("Using CNN result, OCR engine not consulted");
        return ArbitrationDecision {
            text: cnn_text.clone(),
            state: DecodeState::Resolved,
            cnn_text: Some(cnn_text),
            ocr_text: None,
            agreed: false,
            preference,
        };
    };

    let agreed = ocr == cnn_text;
    let text = if agreed {
        tracing::info!("OCR and CNN matched");
        cnn_text.clone()
    } else {
        tracing::info!("OCR and CNN mismatched: {} | {}", ocr, cnn_text);
        tracing::info!("Using {} as default", preference);
        match preference {
            EnginePreference::Ocr => ocr.clone(),
            EnginePreference::Cnn => cnn_text.clone(),
        }
    };

    ArbitrationDecision {
        text,
        state: DecodeState::Resolved,
        cnn_text: Some(cnn_text),
        ocr_text: Some(ocr),
        agreed,
        preference,
    }
}
