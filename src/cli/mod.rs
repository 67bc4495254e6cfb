// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2. Nothing is
// computed here.
//
//   captcha <image_path> <output_path>   decode one image
//   captcha interactive                  prompt loop
//   captcha train                        train the glyph CNN
//   captcha prepare                      build a glyph folder
//
// Every command that decodes owns one TempTracker: its guard
// cleans up on normal return, the interrupt hook on Ctrl+C.
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use std::{io, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{error::ErrorKind, CommandFactory, Parser};
use commands::{Commands, InteractiveArgs, PrepareArgs, ServiceArgs, TrainArgs};

use crate::application::{
    interactive::run_interactive,
    prepare_use_case::PrepareUseCase,
    recognition_service::CaptchaService,
    train_use_case::TrainUseCase,
};
use crate::infra::temp_tracker::{install_interrupt_handler, TempTracker};

#[derive(Parser, Debug)]
#[command(
    name = "captcha",
    version,
    about = "Decode fixed-layout 5-character captchas with a CNN, optionally cross-checked by Tesseract.",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Captcha image to decode
    pub image_path: Option<PathBuf>,

    /// File that receives the decoded text
    pub output_path: Option<PathBuf>,

    #[command(flatten)]
    pub service: ServiceArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Some(Commands::Interactive(args)) => run_interactive_cmd(args),
            Some(Commands::Train(args))       => run_train(args),
            Some(Commands::Prepare(args))     => run_prepare(args),
            None => {
                let (Some(image), Some(output)) = (self.image_path, self.output_path) else {
                    Cli::command()
                        .error(
                            ErrorKind::MissingRequiredArgument,
                            "usage: captcha <image_path> <output_path>",
                        )
                        .exit()
                };
                run_decode(&self.service, image, output)
            }
        }
    }
}

fn start_service(args: &ServiceArgs, tracker: &Arc<TempTracker>) -> Result<CaptchaService> {
    install_interrupt_handler(Arc::clone(tracker))?;
    let config = args.resolve()?;
    CaptchaService::new(&config, Arc::clone(tracker))
}

fn run_decode(args: &ServiceArgs, image: PathBuf, output: PathBuf) -> Result<()> {
    let tracker = TempTracker::new();
    let _guard  = tracker.guard();
    let service = start_service(args, &tracker)?;

    let decision = service.decode(&image, &output)?;
    println!("{}", decision.text);
    Ok(())
}

fn run_interactive_cmd(args: InteractiveArgs) -> Result<()> {
    let tracker = TempTracker::new();
    let _guard  = tracker.guard();
    let service = start_service(&args.service, &tracker)?;

    let stdin = io::stdin();
    run_interactive(&service, &args.output_dir, stdin.lock(), io::stdout())?;
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Training on glyphs in '{}'", args.data_dir.display());
    let run_dir = TrainUseCase::new(args.into()).execute()?;
    println!("Training complete. Checkpoint saved (run copy in '{}').", run_dir.display());
    Ok(())
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    let summary = PrepareUseCase::new(args.into_config()?)?.execute()?;
    println!(
        "Prepared {} images into {} glyphs ({} skipped).",
        summary.images, summary.glyphs, summary.skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_paths_parse() {
        let cli = Cli::try_parse_from(["captcha", "in.jpg", "out.txt", "--no-ocr"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.image_path, Some(PathBuf::from("in.jpg")));
        assert!(cli.service.no_ocr);
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["captcha", "interactive", "--default-engine", "ocr"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Interactive(_))));

        let cli = Cli::try_parse_from(["captcha", "train", "--epochs", "3"]).unwrap();
        match cli.command {
            Some(Commands::Train(args)) => assert_eq!(args.epochs, 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_engine_is_a_usage_error() {
        assert!(Cli::try_parse_from(["captcha", "a.jpg", "b.txt", "--default-engine", "gpt"]).is_err());
    }

    #[test]
    fn clap_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
