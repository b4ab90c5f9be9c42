//! Configuration types for PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads and to diff two runs.
//!
//! The OCR engine settings live in [`OcrEngineConfig`] and are handed to the
//! engine and the language negotiator when they are constructed; nothing in
//! this crate reads process-wide OCR state.

use crate::error::ConvertError;
use crate::pipeline::language::LanguageSet;
use crate::pipeline::recognize::RecognitionProfile;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for a conversion, split or table-extraction job.
///
/// # Example
/// ```rust
/// use edgequake_pdfconvert::{ConversionConfig, ExtractionMode};
///
/// let config = ConversionConfig::builder()
///     .mode(ExtractionMode::Ocr)
///     .languages("eng+hin")
///     .dpi(300)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Which extraction strategy to use. Default: [`ExtractionMode::Auto`].
    pub mode: ExtractionMode,

    /// Requested OCR languages. Default: `eng+hin`.
    ///
    /// Negotiated once per job against the installed set; a single missing
    /// code degrades the whole request to one fallback language.
    pub languages: LanguageSet,

    /// Rendering DPI used when rasterising pages for OCR. Range: 72–600. Default: 400.
    ///
    /// Tesseract is tuned for roughly 300 DPI glyphs; 400 leaves headroom for
    /// small print before the 1.5× upscale in preprocessing.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 6000.
    ///
    /// A 400 DPI render of an A3 page is already ~6600 px tall. This caps
    /// either dimension so oversized pages never exhaust memory.
    pub max_rendered_pixels: u32,

    /// Preprocessing cascade parameters.
    pub preprocess: PreprocessConfig,

    /// Minimum number of characters (after trimming) for OCR output to be
    /// accepted. Anything at or below this embeds the page image. Default: 10.
    pub min_text_chars: usize,

    /// Recognition profiles tried in order on the processed image.
    /// Default: general block, single uniform block, sparse text.
    pub profiles: Vec<RecognitionProfile>,

    /// OCR engine settings.
    pub ocr: OcrEngineConfig,

    /// Spreadsheet extraction strategy. Default: [`SheetMode::Tables`].
    pub sheet_mode: SheetMode,

    /// Directory containing libpdfium. If None, the system library is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Parent directory for the per-job working directory. Default: system temp.
    pub work_dir: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress callback for per-document and per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            languages: LanguageSet::default(),
            dpi: 400,
            max_rendered_pixels: 6000,
            preprocess: PreprocessConfig::default(),
            min_text_chars: 10,
            profiles: RecognitionProfile::default_cascade(),
            ocr: OcrEngineConfig::default(),
            sheet_mode: SheetMode::default(),
            pdfium_lib_path: None,
            password: None,
            work_dir: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("mode", &self.mode)
            .field("languages", &self.languages)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("preprocess", &self.preprocess)
            .field("min_text_chars", &self.min_text_chars)
            .field("profiles", &self.profiles)
            .field("ocr", &self.ocr)
            .field("sheet_mode", &self.sheet_mode)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("work_dir", &self.work_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Requested languages as a `+`-joined list, e.g. `"eng+hin"`.
    pub fn languages(mut self, langs: &str) -> Self {
        self.config.languages = LanguageSet::parse(langs);
        self
    }

    pub fn language_set(mut self, langs: LanguageSet) -> Self {
        self.config.languages = langs;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.config.preprocess = preprocess;
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.config.min_text_chars = n;
        self
    }

    pub fn profiles(mut self, profiles: Vec<RecognitionProfile>) -> Self {
        self.config.profiles = profiles;
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.ocr.tesseract_cmd = cmd.into();
        self
    }

    pub fn ocr_engine_mode(mut self, oem: u8) -> Self {
        self.config.ocr.engine_mode = oem;
        self
    }

    pub fn sheet_mode(mut self, mode: SheetMode) -> Self {
        self.config.sheet_mode = mode;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ConvertError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.languages.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "At least one OCR language is required".into(),
            ));
        }
        if c.profiles.is_empty() {
            return Err(ConvertError::InvalidConfig(
                "At least one recognition profile is required".into(),
            ));
        }
        if !(c.preprocess.upscale_factor >= 1.0 && c.preprocess.upscale_factor <= 4.0) {
            return Err(ConvertError::InvalidConfig(format!(
                "Upscale factor must be 1.0–4.0, got {}",
                c.preprocess.upscale_factor
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Requested extraction strategy for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Direct extraction if any page has a text layer, OCR otherwise. (default)
    #[default]
    Auto,
    /// Always use the embedded text layer.
    Direct,
    /// Always rasterise and recognise.
    Ocr,
}

impl std::str::FromStr for ExtractionMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ExtractionMode::Auto),
            "direct" => Ok(ExtractionMode::Direct),
            "ocr" => Ok(ExtractionMode::Ocr),
            other => Err(ConvertError::InvalidConfig(format!(
                "Unknown mode '{other}' (expected auto, direct or ocr)"
            ))),
        }
    }
}

/// How the spreadsheet path lays tables out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SheetMode {
    /// One sheet per detected table, with a line-per-row text fallback. (default)
    #[default]
    Tables,
    /// One sheet per page holding the page's full line layout. Falls back
    /// to [`SheetMode::Tables`] if the layout strategy fails.
    FullStructure,
}

/// Parameters of the preprocessing cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Upscale factor applied after grayscale conversion. Default: 1.5.
    pub upscale_factor: f32,
    /// Median filter radius (1 → 3×3 window). 0 disables. Default: 1.
    pub median_radius: u32,
    /// Adaptive threshold block radius (10 → 21×21 block). Default: 10.
    pub adaptive_block_radius: u32,
    /// Morphological opening radius. 0 disables. Default: 0.
    pub open_radius: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            upscale_factor: 1.5,
            median_radius: 1,
            adaptive_block_radius: 10,
            open_radius: 0,
        }
    }
}

/// Settings handed to the OCR engine at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrEngineConfig {
    /// Path or name of the tesseract executable. Default: `$TESSERACT_CMD`,
    /// else `tesseract` on `PATH`.
    pub tesseract_cmd: PathBuf,
    /// Tesseract `--oem` value. Default: 1 (LSTM only).
    pub engine_mode: u8,
}

impl Default for OcrEngineConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: std::env::var_os("TESSERACT_CMD")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tesseract")),
            engine_mode: 1,
        }
    }
}
