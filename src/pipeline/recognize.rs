//! Recognition cascade: preprocessed page → [`PageOutcome`].
//!
//! The cascade is a priority list of [`Attempt`]s, built once from the
//! configured profiles:
//!
//! ```text
//! processed × general block
//! processed × uniform block
//! processed × sparse text
//! original  × general block      (last resort)
//! ```
//!
//! Attempts run in order and stop at the first one whose output is
//! non-blank. That output is then judged against the minimum character
//! threshold; short output is not retried on later attempts, it embeds the
//! page raster. Engine failures count as blank output.

use crate::error::OcrError;
use crate::pipeline::language::EffectiveLanguageSet;
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::preprocess::PreprocessedPage;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// The OCR engine seam.
///
/// Engine configuration (binary path, engine mode, …) is given to the
/// implementation at construction; nothing here reads process-wide state.
pub trait OcrEngine {
    /// Recognise `image` with `languages` under the layout `profile`.
    fn recognize(
        &self,
        image: &DynamicImage,
        languages: &EffectiveLanguageSet,
        profile: RecognitionProfile,
    ) -> Result<String, OcrError>;

    /// Language codes the engine has data for.
    fn installed_languages(&self) -> Result<BTreeSet<String>, OcrError>;
}

/// Layout assumption handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionProfile {
    /// Fully automatic page segmentation.
    GeneralBlock,
    /// A single uniform block of text.
    UniformBlock,
    /// Sparse text in no particular order.
    SparseText,
}

impl RecognitionProfile {
    /// Tesseract page segmentation mode.
    pub fn psm(self) -> u8 {
        match self {
            RecognitionProfile::GeneralBlock => 3,
            RecognitionProfile::UniformBlock => 6,
            RecognitionProfile::SparseText => 11,
        }
    }

    pub fn default_cascade() -> Vec<Self> {
        vec![
            RecognitionProfile::GeneralBlock,
            RecognitionProfile::UniformBlock,
            RecognitionProfile::SparseText,
        ]
    }
}

impl fmt::Display for RecognitionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "psm {}", self.psm())
    }
}

/// Which image an attempt runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptSource {
    Processed,
    Original,
}

/// One entry of the recognition priority list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub source: AttemptSource,
    pub profile: RecognitionProfile,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            AttemptSource::Processed => "processed",
            AttemptSource::Original => "original",
        };
        write!(f, "{}/{}", source, self.profile)
    }
}

/// Build the priority list: every profile on the processed image, then the
/// original raster with the general-block profile.
pub fn attempt_plan(profiles: &[RecognitionProfile]) -> Vec<Attempt> {
    profiles
        .iter()
        .map(|&profile| Attempt {
            source: AttemptSource::Processed,
            profile,
        })
        .chain(std::iter::once(Attempt {
            source: AttemptSource::Original,
            profile: RecognitionProfile::GeneralBlock,
        }))
        .collect()
}

/// Result of the OCR path for one page. Exactly one variant per page.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    /// Accepted text, one entry per non-blank line, in reading order.
    Recognized { lines: Vec<String>, attempt: Attempt },
    /// Recognition fell short; the original raster is embedded.
    Embedded { image: DynamicImage },
}

impl PageOutcome {
    /// Characters of text carried by the outcome.
    pub fn chars(&self) -> usize {
        match self {
            PageOutcome::Recognized { lines, .. } => lines.iter().map(|l| l.chars().count()).sum(),
            PageOutcome::Embedded { .. } => 0,
        }
    }
}

/// The recognition cascade for one job.
pub struct RecognitionCascade<'a> {
    engine: &'a dyn OcrEngine,
    languages: &'a EffectiveLanguageSet,
    plan: Vec<Attempt>,
    min_chars: usize,
}

impl<'a> RecognitionCascade<'a> {
    pub fn new(
        engine: &'a dyn OcrEngine,
        languages: &'a EffectiveLanguageSet,
        profiles: &[RecognitionProfile],
        min_chars: usize,
    ) -> Self {
        Self {
            engine,
            languages,
            plan: attempt_plan(profiles),
            min_chars,
        }
    }

    /// Run the attempts for one page. Never fails; the worst case is
    /// [`PageOutcome::Embedded`].
    pub fn recognize(&self, page: PreprocessedPage, page_num: usize) -> PageOutcome {
        let PreprocessedPage {
            processed, original, ..
        } = page;

        let mut hit: Option<(Attempt, String)> = None;
        for &attempt in &self.plan {
            let image = match attempt.source {
                AttemptSource::Processed => &processed,
                AttemptSource::Original => &original,
            };
            match self.engine.recognize(image, self.languages, attempt.profile) {
                Ok(text) if !text.trim().is_empty() => {
                    debug!("Page {}: {} produced text", page_num, attempt);
                    hit = Some((attempt, text));
                    break;
                }
                Ok(_) => debug!("Page {}: {} produced nothing", page_num, attempt),
                Err(e) => debug!("Page {}: {} failed: {}", page_num, attempt, e),
            }
        }

        if let Some((attempt, text)) = hit {
            let chars = text.trim().chars().count();
            if chars > self.min_chars {
                let lines: Vec<String> = clean_ocr_text(&text)
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(str::to_string)
                    .collect();
                if !lines.is_empty() {
                    return PageOutcome::Recognized { lines, attempt };
                }
            }
            warn!(
                "Page {}: OCR produced only {} characters (need more than {}); embedding image",
                page_num, chars, self.min_chars
            );
        } else {
            warn!("Page {}: no recognition attempt produced text; embedding image", page_num);
        }

        PageOutcome::Embedded { image: original }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::language::{resolve, LanguageSet};
    use image::{GrayImage, Luma};
    use std::cell::RefCell;

    /// Engine that answers from a script keyed by (source width, psm).
    struct ScriptedEngine {
        answers: Vec<((u32, u8), Result<&'static str, ()>)>,
        calls: RefCell<Vec<(u32, u8)>>,
    }

    impl ScriptedEngine {
        fn new(answers: Vec<((u32, u8), Result<&'static str, ()>)>) -> Self {
            Self {
                answers,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn recognize(
            &self,
            image: &DynamicImage,
            _languages: &EffectiveLanguageSet,
            profile: RecognitionProfile,
        ) -> Result<String, OcrError> {
            let key = (image.width(), profile.psm());
            self.calls.borrow_mut().push(key);
            match self.answers.iter().find(|(k, _)| *k == key) {
                Some((_, Ok(text))) => Ok(text.to_string()),
                Some((_, Err(()))) => Err(OcrError::Failed("exit status 1".into())),
                None => Ok(String::new()),
            }
        }

        fn installed_languages(&self) -> Result<BTreeSet<String>, OcrError> {
            Ok(["eng".to_string()].into_iter().collect())
        }
    }

    // processed image is 20 px wide, original 10 px, so the engine can tell them apart
    fn page() -> PreprocessedPage {
        PreprocessedPage {
            processed: DynamicImage::ImageLuma8(GrayImage::from_pixel(20, 5, Luma([255]))),
            original: DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 5, Luma([200]))),
            applied: vec![],
        }
    }

    fn langs() -> EffectiveLanguageSet {
        resolve(&LanguageSet::parse("eng"), ["eng".to_string()].into_iter().collect()).effective
    }

    #[test]
    fn plan_appends_original_general_block() {
        let plan = attempt_plan(&RecognitionProfile::default_cascade());
        let labels: Vec<String> = plan.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            labels,
            vec!["processed/psm 3", "processed/psm 6", "processed/psm 11", "original/psm 3"]
        );
    }

    #[test]
    fn stops_at_first_non_empty_profile() {
        let engine = ScriptedEngine::new(vec![
            ((20, 6), Ok("Quarterly report\n\n  Revenue up 12%  \n")),
            ((20, 11), Ok("should never be asked")),
        ]);
        let langs = langs();
        let cascade = RecognitionCascade::new(&engine, &langs, &RecognitionProfile::default_cascade(), 10);
        match cascade.recognize(page(), 1) {
            PageOutcome::Recognized { lines, attempt } => {
                assert_eq!(lines, vec!["Quarterly report", "  Revenue up 12%"]);
                assert_eq!(attempt.profile, RecognitionProfile::UniformBlock);
            }
            other => panic!("expected recognized, got {other:?}"),
        }
        assert_eq!(*engine.calls.borrow(), vec![(20, 3), (20, 6)]);
    }

    #[test]
    fn engine_errors_fall_through_to_original() {
        let engine = ScriptedEngine::new(vec![
            ((20, 3), Err(())),
            ((10, 3), Ok("Recovered from the raw raster")),
        ]);
        let langs = langs();
        let cascade = RecognitionCascade::new(&engine, &langs, &RecognitionProfile::default_cascade(), 10);
        match cascade.recognize(page(), 2) {
            PageOutcome::Recognized { attempt, .. } => {
                assert_eq!(attempt.source, AttemptSource::Original);
            }
            other => panic!("expected recognized, got {other:?}"),
        }
        assert_eq!(engine.calls.borrow().len(), 4);
    }

    #[test]
    fn short_text_embeds_original_without_further_attempts() {
        let engine = ScriptedEngine::new(vec![((20, 3), Ok("  0123456789  "))]);
        let langs = langs();
        let cascade = RecognitionCascade::new(&engine, &langs, &RecognitionProfile::default_cascade(), 10);
        match cascade.recognize(page(), 3) {
            PageOutcome::Embedded { image } => assert_eq!(image.width(), 10),
            other => panic!("expected embedded, got {other:?}"),
        }
        assert_eq!(engine.calls.borrow().len(), 1);
    }

    #[test]
    fn eleven_chars_is_accepted() {
        let engine = ScriptedEngine::new(vec![((20, 3), Ok("01234567890"))]);
        let langs = langs();
        let cascade = RecognitionCascade::new(&engine, &langs, &RecognitionProfile::default_cascade(), 10);
        let outcome = cascade.recognize(page(), 1);
        assert!(matches!(outcome, PageOutcome::Recognized { .. }));
        assert_eq!(outcome.chars(), 11);
    }

    #[test]
    fn nothing_recognized_embeds() {
        let engine = ScriptedEngine::new(vec![]);
        let langs = langs();
        let cascade = RecognitionCascade::new(&engine, &langs, &RecognitionProfile::default_cascade(), 10);
        assert!(matches!(cascade.recognize(page(), 1), PageOutcome::Embedded { .. }));
        assert_eq!(engine.calls.borrow().len(), 4);
    }
}
