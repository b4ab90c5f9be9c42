//! # edgequake-pdfconvert
//!
//! Convert PDF documents to Word files, extract their tables into
//! spreadsheets, or split them into parts, with an OCR fallback that
//! degrades gracefully on poor scans.
//!
//! ## Why this crate?
//!
//! Plenty of PDFs carry a perfectly good text layer; many others are
//! photocopies with nothing but pixels. This crate decides per document:
//! the text layer is used when any page has one, otherwise every page is
//! rasterised, cleaned up and run through tesseract with a cascade of page
//! segmentation modes. A page where recognition still comes back nearly
//! empty is never silently lost: its image is embedded in the output
//! instead, under a heading that says so.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Strategy   text layer present? direct : OCR
//!  ├─ 3. Languages  negotiate requested OCR languages once per job
//!  ├─ 4. Render     rasterise pages via pdfium (blocking worker thread)
//!  ├─ 5. Clean up   grayscale → upscale → median → adaptive threshold
//!  ├─ 6. Recognise  psm 3 → psm 6 → psm 11 → original image
//!  ├─ 7. Assemble   text paragraphs, or the page image when OCR fell short
//!  └─ 8. Deliver    one .docx, or converted.zip for several documents
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfconvert::{convert, write_artifact, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().languages("eng+hin").build()?;
//!     let output = convert(["scan.pdf", "report.pdf"], &config).await?;
//!     let path = write_artifact(&output.artifact, ".").await?;
//!     eprintln!(
//!         "{} → {} pages recognised, {} embedded",
//!         path.display(),
//!         output.stats.recognized_pages,
//!         output.stats.embedded_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Runtime Requirements
//!
//! | Component | Needed for | Notes |
//! |-----------|-----------|-------|
//! | libpdfium | everything | system library, `./`, or `--pdfium-lib` |
//! | tesseract | OCR path   | plus traineddata for each language |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfconvert` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdfconvert = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ExtractionMode, OcrEngineConfig, PreprocessConfig, SheetMode,
};
pub use convert::{
    convert, convert_from_bytes, convert_sync, extract_tables, extract_tables_sync, inspect, installed_languages,
    negotiate_languages, split, split_sync, write_artifact, Converter,
};
pub use error::{ConvertError, DocumentError, OcrError, RangeError};
pub use output::{DocumentInfo, DocumentReport, JobOutput, JobStats, OutputArtifact, PageKind, PageSummary};
pub use pipeline::language::{LanguageSet, Negotiation};
pub use pipeline::recognize::{OcrEngine, RecognitionProfile};
pub use pipeline::strategy::Strategy;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, DocumentConversion, DocumentStream};
