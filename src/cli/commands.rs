// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Subcommands `interactive`, `train`, `prepare`, and the flags
// shared by everything that builds a CaptchaService.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::application::{
    config::ServiceConfig,
    prepare_use_case::PrepareConfig,
    train_use_case::TrainConfig,
};
use crate::domain::arbitration::EnginePreference;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode captchas one path at a time from standard input
    Interactive(InteractiveArgs),

    /// Train the glyph classifier on a folder of labelled glyphs
    Train(TrainArgs),

    /// Cut labelled captchas into a glyph folder for training
    Prepare(PrepareArgs),
}

/// Flags for building the recognition service. Each one, when
/// given, overrides the value from `--config` (or the default).
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// JSON service configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the trained checkpoint
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Directory for intermediate artifacts (removed at exit)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Engine that wins when CNN and OCR disagree: CNN or OCR
    #[arg(long)]
    pub default_engine: Option<EnginePreference>,

    /// Never consult the external OCR engine
    #[arg(long)]
    pub no_ocr: bool,

    /// Tesseract executable
    #[arg(long)]
    pub tesseract: Option<String>,
}

impl ServiceArgs {
    pub fn resolve(&self) -> Result<ServiceConfig> {
        let mut cfg = match &self.config {
            Some(path) => ServiceConfig::load(path)?,
            None => ServiceConfig::default(),
        };
        if let Some(dir) = &self.model_dir {
            cfg.model_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            cfg.work_dir = dir.clone();
        }
        if let Some(engine) = self.default_engine {
            cfg.default_engine = engine;
        }
        if self.no_ocr {
            cfg.ocr_enabled = false;
        }
        if let Some(bin) = &self.tesseract {
            cfg.tesseract_binary = bin.clone();
        }
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct InteractiveArgs {
    /// Predictions are written to <output-dir>/<run tag>/
    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub service: ServiceArgs,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// One sub-directory of glyph images per label
    #[arg(long, default_value = "data/singleChar")]
    pub data_dir: PathBuf,

    /// Where the checkpoint is written (and a copy under <run tag>/)
    #[arg(long, default_value = "models")]
    pub model_dir: PathBuf,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Full passes over the training split
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Share of samples used for training, the rest validates
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Seeds the split, the shuffle, and weight init
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:       a.data_dir,
            model_dir:      a.model_dir,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            learning_rate:  a.lr,
            train_fraction: a.train_fraction,
            seed:           a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory of captcha .jpg files
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Directory of label .txt files
    #[arg(long)]
    pub labels_dir: PathBuf,

    /// Glyph folder to create
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Service config file; only its geometry is used
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl PrepareArgs {
    pub fn into_config(self) -> Result<PrepareConfig> {
        let geometry = match &self.config {
            Some(path) => ServiceConfig::load(path)?.geometry,
            None => ServiceConfig::default().geometry,
        };
        Ok(PrepareConfig {
            input_dir:  self.input_dir,
            labels_dir: self.labels_dir,
            output_dir: self.output_dir,
            geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.json");
        fs::write(&path, r#"{ "model_dir": "from-file", "work_dir": "w", "default_engine": "OCR" }"#).unwrap();

        let args = ServiceArgs {
            config: Some(path),
            model_dir: Some(PathBuf::from("from-flag")),
            no_ocr: true,
            ..Default::default()
        };
        let cfg = args.resolve().unwrap();
        assert_eq!(cfg.model_dir, PathBuf::from("from-flag"));
        assert_eq!(cfg.work_dir, PathBuf::from("w"));
        assert_eq!(cfg.default_engine, EnginePreference::Ocr);
        assert!(!cfg.ocr_enabled);
    }

    #[test]
    fn no_flags_means_defaults() {
        assert_eq!(ServiceArgs::default().resolve().unwrap(), ServiceConfig::default());
    }
}
