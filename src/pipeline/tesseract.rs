//! Tesseract OCR engine, driven through its command line.
//!
//! Each recognition writes the image to a PNG temp file, runs
//!
//! ```text
//! tesseract <image> stdout -l <langs> --oem <mode> --psm <profile>
//! ```
//!
//! and deletes the file again when the call returns, whatever the outcome.

use crate::config::OcrEngineConfig;
use crate::error::OcrError;
use crate::pipeline::encode::encode_png;
use crate::pipeline::language::EffectiveLanguageSet;
use crate::pipeline::recognize::{OcrEngine, RecognitionProfile};
use image::DynamicImage;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::debug;

/// Tesseract command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    config: OcrEngineConfig,
    /// Where page images are written before each call.
    scratch_dir: Option<PathBuf>,
}

impl TesseractEngine {
    pub fn new(config: OcrEngineConfig, scratch_dir: Option<PathBuf>) -> Self {
        Self {
            config,
            scratch_dir,
        }
    }

    fn run(&self, args: &[&OsStr]) -> Result<Output, OcrError> {
        Command::new(&self.config.tesseract_cmd)
            .args(args)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OcrError::NotAvailable(format!(
                        "'{}' not found (install tesseract-ocr or set --tesseract)",
                        self.config.tesseract_cmd.display()
                    ))
                } else {
                    OcrError::Io(e)
                }
            })
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(
        &self,
        image: &DynamicImage,
        languages: &EffectiveLanguageSet,
        profile: RecognitionProfile,
    ) -> Result<String, OcrError> {
        let png = encode_png(image).map_err(|e| OcrError::Image(e.to_string()))?;

        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("ocr-page-").suffix(".png");
            b
        };
        let mut file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(&png)?;
        file.flush()?;

        let langs = languages.as_arg();
        let oem = self.config.engine_mode.to_string();
        let psm = profile.psm().to_string();
        debug!("tesseract -l {} --oem {} --psm {}", langs, oem, psm);

        let output = self.run(&[
            file.path().as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(&langs),
            OsStr::new("--oem"),
            OsStr::new(&oem),
            OsStr::new("--psm"),
            OsStr::new(&psm),
        ])?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(OcrError::Failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }

    fn installed_languages(&self) -> Result<BTreeSet<String>, OcrError> {
        let output = self.run(&[OsStr::new("--list-langs")])?;
        if !output.status.success() {
            return Err(OcrError::Failed(format!(
                "tesseract --list-langs exited with {}",
                output.status
            )));
        }
        // Older releases print the list on stderr.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push('\n');
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_language_list(&listing))
    }
}

/// Parse `tesseract --list-langs` output into a set of codes.
pub fn parse_language_list(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with("List of available languages"))
        .filter(|line| !line.contains(char::is_whitespace))
        .map(str::to_string)
        .collect()
}
