// ============================================================
// Layer 2 — Recognition Service
// ============================================================
// Public entry point: image path in, decoded text out (returned
// and written to a file).
//
// Built once per process:
//   - the checkpoint (weights + class index) is loaded here and
//     shared read-only by every later call
//   - the OCR engine is probed here, once
//   - a random run tag is fixed here; each call appends its own
//     sequence number so concurrent calls sharing a working
//     directory never write to the same artifact name

use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};

use crate::application::{config::ServiceConfig, decoder::Decoder};
use crate::data::segmenter::Segmenter;
use crate::domain::{
    arbitration::{ArbitrationDecision, EngineSettings},
    traits::TextRecognizer,
};
use crate::infra::{temp_tracker::TempTracker, tesseract::TesseractCli};
use crate::ml::inferencer::CnnClassifier;

/// Random 8-hex-digit tag identifying this process's outputs.
pub fn new_run_tag() -> String {
    format!("{:08x}", rand::random::<u32>())
}

pub struct CaptchaService {
    decoder: Decoder,
    tracker: Arc<TempTracker>,
    run_tag: String,
    calls:   AtomicU64,
}

impl CaptchaService {
    pub fn new(config: &ServiceConfig, tracker: Arc<TempTracker>) -> Result<Self> {
        let segmenter = Segmenter::new(config.geometry.clone())
            .context("Segmentation geometry is unusable")?;

        tracing::info!("Initializing CNN model...");
        let classifier = CnnClassifier::from_checkpoint_dir(&config.model_dir)?;
        if classifier.index().is_empty() {
            anyhow::bail!("Checkpoint in '{}' has an empty class index", config.model_dir.display());
        }

        let ocr: Option<Arc<dyn TextRecognizer>> = if config.ocr_enabled {
            Some(Arc::new(TesseractCli::new(config.tesseract_binary.clone())))
        } else {
            None
        };

        let decoder = Decoder::new(
            segmenter,
            Arc::new(classifier),
            ocr,
            EngineSettings::new(config.default_engine),
            config.work_dir.clone(),
        );
        tracing::info!("Default: {}", decoder.settings().get());
        Ok(Self::from_decoder(decoder, tracker))
    }

    pub fn from_decoder(decoder: Decoder, tracker: Arc<TempTracker>) -> Self {
        Self { decoder, tracker, run_tag: new_run_tag(), calls: AtomicU64::new(0) }
    }

    pub fn run_tag(&self) -> &str {
        &self.run_tag
    }

    pub fn settings(&self) -> &EngineSettings {
        self.decoder.settings()
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &Arc<TempTracker> {
        &self.tracker
    }

    /// Decode without writing an output file.
    pub fn decode_image(&self, image: &Path) -> ArbitrationDecision {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let tag  = format!("{}-{}", self.run_tag, call);
        self.decoder.decode(image, &tag, &self.tracker)
    }

    /// Decode `image` and write the final text to `output`, creating
    /// parent directories. A missing or undecodable image still
    /// produces an output file containing "N/A"; only a failure to
    /// write `output` is an error.
    pub fn decode(&self, image: &Path, output: &Path) -> Result<ArbitrationDecision> {
        let decision = self.decode_image(image);

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create output directory '{}'", parent.display()))?;
        }
        fs::write(output, format!("{}\n", decision.text))
            .with_context(|| format!("Cannot write result to '{}'", output.display()))?;

        tracing::info!("Final Result: {}", decision.text);
        Ok(decision)
    }
}
