// ============================================================
// Layer 2 — Interactive Session
// ============================================================
// A prompt loop for one operator:
//
//   <path>.jpg  decode, write <root>/<run_tag>/prediction_<n>.txt
//   d           change the engine that wins on disagreement
//   0           quit (end of input also quits)
//
// Bad input is logged and the loop carries on.

use std::{
    fs,
    io::{BufRead, Write},
    path::Path,
};

use anyhow::{Context, Result};

use crate::application::recognition_service::CaptchaService;
use crate::domain::arbitration::EnginePreference;

pub const QUIT: &str = "0";
pub const TOGGLE_ENGINE: &str = "d";

/// Run the loop until `0` or end of input. Returns how many
/// predictions were written.
pub fn run_interactive<R: BufRead, W: Write>(
    service:     &CaptchaService,
    output_root: &Path,
    mut input:   R,
    mut out:     W,
) -> Result<usize> {
    let run_dir = output_root.join(service.run_tag());
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("Cannot create '{}'", run_dir.display()))?;
    tracing::info!("Predictions go to '{}'", run_dir.display());

    let mut attempts = 0usize;
    let mut written  = 0usize;
    loop {
        write!(out, "Enter image path ({TOGGLE_ENGINE} to change default engine, {QUIT} to quit): ")?;
        out.flush()?;

        let Some(line) = read_line(&mut input)? else { break };
        match line.as_str() {
            QUIT => break,
            TOGGLE_ENGINE => {
                write!(out, "Enter 1 for OCR, 2 for CNN: ")?;
                out.flush()?;
                match read_line(&mut input)?.as_deref() {
                    Some("1") => { service.settings().set(EnginePreference::Ocr); }
                    Some("2") => { service.settings().set(EnginePreference::Cnn); }
                    Some(other) => tracing::warn!("Unknown engine choice '{}'", other),
                    None => break,
                }
            }
            "" => tracing::warn!("Empty input, enter a path to a .jpg image"),
            path => {
                let path = Path::new(path);
                if !is_decodable(path) {
                    continue;
                }
                attempts += 1;
                let target = run_dir.join(format!("prediction_{attempts}.txt"));
                match service.decode(path, &target) {
                    Ok(decision) => {
                        written += 1;
                        writeln!(out, "{}", decision.text)?;
                    }
                    Err(e) => tracing::warn!("{:#}", e),
                }
            }
        }
    }

    tracing::info!("Interactive session ended after {} predictions", written);
    Ok(written)
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn is_decodable(path: &Path) -> bool {
    if !path.exists() {
        tracing::warn!("'{}' does not exist", path.display());
        return false;
    }
    if path.is_dir() {
        tracing::warn!("'{}' is a directory", path.display());
        return false;
    }
    if !path.extension().is_some_and(|e| e.eq_ignore_ascii_case("jpg")) {
        tracing::warn!("'{}' is not a .jpg image", path.display());
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::decoder::Decoder;
    use crate::data::segmenter::Segmenter;
    use crate::domain::{arbitration::EngineSettings, geometry::Geometry};
    use crate::infra::temp_tracker::TempTracker;
    use crate::test_support::LevelClassifier;
    use std::{io::Cursor, sync::Arc};

    fn service(work: &Path) -> CaptchaService {
        let decoder = Decoder::new(
            Segmenter::new(Geometry::default()).unwrap(),
            Arc::new(LevelClassifier::new("ABCDE")),
            None,
            EngineSettings::default(),
            work,
        );
        CaptchaService::from_decoder(decoder, TempTracker::new())
    }

    #[test]
    fn decodes_valid_paths_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let jpg = dir.path().join("c.jpg");
        LevelClassifier::new("ABCDE").captcha_for("BADCE").save(&jpg).unwrap();
        let png = dir.path().join("c.png");
        LevelClassifier::new("ABCDE").captcha_for("BADCE").save(&png).unwrap();

        let script = format!(
            "\n{}\n{}\n{}\n{}\n0\n{}\n",
            dir.path().join("missing.jpg").display(),
            dir.path().display(),
            png.display(),
            jpg.display(),
            jpg.display(),
        );
        let svc = service(&dir.path().join("work"));
        let root = dir.path().join("out");
        let mut shown = Vec::new();
        let n = run_interactive(&svc, &root, Cursor::new(script), &mut shown).unwrap();

        assert_eq!(n, 1);
        let prediction = root.join(svc.run_tag()).join("prediction_1.txt");
        assert_eq!(fs::read_to_string(prediction).unwrap().trim(), "BADCE");
        assert!(String::from_utf8(shown).unwrap().contains("BADCE"));
    }

    #[test]
    fn toggle_changes_the_engine_preference() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        assert_eq!(svc.settings().get(), EnginePreference::Cnn);

        run_interactive(&svc, dir.path(), Cursor::new("d\n1\n"), Vec::new()).unwrap();
        assert_eq!(svc.settings().get(), EnginePreference::Ocr);

        run_interactive(&svc, dir.path(), Cursor::new("d\n7\nd\n2\n0\n"), Vec::new()).unwrap();
        assert_eq!(svc.settings().get(), EnginePreference::Cnn);
    }

    #[test]
    fn unwritable_prediction_does_not_end_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let jpg = dir.path().join("c.jpg");
        LevelClassifier::new("ABCDE").captcha_for("EDCBA").save(&jpg).unwrap();

        let svc = service(&dir.path().join("work"));
        let root = dir.path().join("out");
        let run_dir = root.join(svc.run_tag());
        // A directory where the first prediction file should go
        fs::create_dir_all(run_dir.join("prediction_1.txt")).unwrap();

        let script = format!("{0}\n{0}\n0\n", jpg.display());
        let n = run_interactive(&svc, &root, Cursor::new(script), Vec::new()).unwrap();

        assert_eq!(n, 1);
        assert_eq!(fs::read_to_string(run_dir.join("prediction_2.txt")).unwrap().trim(), "EDCBA");
    }

    #[test]
    fn end_of_input_quits() {
        let dir = tempfile::tempdir().unwrap();
        let n = run_interactive(&service(dir.path()), dir.path(), Cursor::new(""), Vec::new()).unwrap();
        assert_eq!(n, 0);
    }
}
