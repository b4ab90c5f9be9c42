//! Error types for the edgequake-pdfconvert library.
//!
//! Errors are tiered by how far they are allowed to travel:
//!
//! * [`ConvertError`] — **Fatal**: the job cannot produce anything (bad
//!   input file, pdfium not bindable, zero artifacts). Returned as
//!   `Err(ConvertError)` from the top-level entry points.
//!
//! * [`DocumentError`] — **Non-fatal**: one document of a multi-document
//!   job failed on every strategy. It is recorded in
//!   [`crate::output::DocumentReport`] and the job moves on.
//!
//! * [`RangeError`] — **Non-fatal**: one entry of a split range string is
//!   malformed or out of bounds. The entry is skipped, the others still
//!   produce their parts.
//!
//! * [`OcrError`] / [`PreprocessError`] — recovered inside the recognition
//!   and preprocessing cascades; they never leave a page.
//!
//! * [`WriterError`] — raised by the DOCX/XLSX writers and folded into a
//!   [`DocumentError`] by the converter.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfconvert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// No input documents were supplied.
    #[error("No input documents given")]
    NoInputs,

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Every entry of a range string was rejected.
    #[error("No valid page range in '{ranges}' (document has {total} pages)\nFirst error: {first_error}")]
    NoValidRanges {
        ranges: String,
        total: usize,
        first_error: String,
    },

    // ── Job errors ────────────────────────────────────────────────────────
    /// Every document of the job failed; nothing can be delivered.
    #[error("All {total} document(s) failed, no output produced.\nFirst error: {first_error}")]
    NoArtifacts { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not build an office/zip package.
    #[error("Failed to build package '{name}': {detail}")]
    PackageFailed { name: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform, or point --pdfium-lib / \
PDFIUM_LIB_PATH at the directory that contains it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── OCR engine errors ─────────────────────────────────────────────────
    /// The OCR engine could not be queried at all.
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored in [`crate::output::DocumentReport`] when a document is dropped
/// from the result set. The job continues with the remaining documents.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentError {
    /// The renderer could not open the document.
    #[error("{name}: cannot open PDF: {detail}")]
    OpenFailed { name: String, detail: String },

    /// A page could not be rasterised for OCR.
    #[error("{name}: rasterisation failed on page {page}: {detail}")]
    RenderFailed {
        name: String,
        page: usize,
        detail: String,
    },

    /// Embedded-text extraction failed.
    #[error("{name}: direct extraction failed: {detail}")]
    DirectFailed { name: String, detail: String },

    /// Table or text extraction for the spreadsheet path failed.
    #[error("{name}: table extraction failed: {detail}")]
    TablesFailed { name: String, detail: String },

    /// The output document could not be written.
    #[error("{name}: writing output failed: {detail}")]
    WriteFailed { name: String, detail: String },
}

impl DocumentError {
    /// Display name of the document this error belongs to.
    pub fn document(&self) -> &str {
        match self {
            DocumentError::OpenFailed { name, .. }
            | DocumentError::RenderFailed { name, .. }
            | DocumentError::DirectFailed { name, .. }
            | DocumentError::TablesFailed { name, .. }
            | DocumentError::WriteFailed { name, .. } => name,
        }
    }
}

/// A rejected entry of a page-range string.
///
/// `entry` is the 1-based position of the entry in the comma-separated list.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeError {
    /// Entry was empty (e.g. `"1,,3"` or a trailing comma).
    #[error("entry {entry}: empty range")]
    Empty { entry: usize },

    /// A page token is not a non-negative integer.
    #[error("entry {entry}: '{token}' is not a page number")]
    NotANumber { entry: usize, token: String },

    /// More than one `-` in the entry.
    #[error("entry {entry}: malformed range '{text}'")]
    Malformed { entry: usize, text: String },

    /// Interval whose start is after its end.
    #[error("entry {entry}: range {start}-{end} is reversed")]
    Reversed {
        entry: usize,
        start: usize,
        end: usize,
    },

    /// Page index outside `[1, total]`.
    #[error("entry {entry}: page {page} is out of range (document has {total} pages)")]
    OutOfBounds {
        entry: usize,
        page: usize,
        total: usize,
    },
}

impl RangeError {
    /// 1-based position of the offending entry.
    pub fn entry(&self) -> usize {
        match self {
            RangeError::Empty { entry }
            | RangeError::NotANumber { entry, .. }
            | RangeError::Malformed { entry, .. }
            | RangeError::Reversed { entry, .. }
            | RangeError::OutOfBounds { entry, .. } => *entry,
        }
    }
}

/// A renderer failure on one page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("page {page}: {detail}")]
pub struct RenderError {
    /// 1-indexed page number.
    pub page: usize,
    pub detail: String,
}

/// Errors from the OCR engine.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    NotAvailable(String),

    #[error("OCR failed: {0}")]
    Failed(String),

    #[error("OCR image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a document or spreadsheet writer.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("cannot embed image '{path}': {detail}")]
    Image { path: PathBuf, detail: String },

    #[error("zip: {0}")]
    Zip(String),

    #[error("xml: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for WriterError {
    fn from(e: zip::result::ZipError) -> Self {
        WriterError::Zip(e.to_string())
    }
}

impl From<quick_xml::Error> for WriterError {
    fn from(e: quick_xml::Error) -> Self {
        WriterError::Xml(e.to_string())
    }
}

/// A preprocessing step that could not produce an image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("{step}: image too small ({width}x{height})")]
    TooSmall {
        step: &'static str,
        width: u32,
        height: u32,
    },

    #[error("{step}: panicked inside image filter")]
    Panicked { step: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_artifacts_display() {
        let e = ConvertError::NoArtifacts {
            total: 3,
            first_error: "scan.pdf: cannot open PDF: bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 document(s)"), "got: {msg}");
        assert!(msg.contains("bad xref"));
    }

    #[test]
    fn range_error_reports_entry_position() {
        let e = RangeError::OutOfBounds {
            entry: 2,
            page: 12,
            total: 9,
        };
        assert_eq!(e.entry(), 2);
        assert!(e.to_string().contains("page 12"));
        assert!(e.to_string().contains("9 pages"));
    }

    #[test]
    fn reversed_range_display() {
        let e = RangeError::Reversed {
            entry: 1,
            start: 5,
            end: 3,
        };
        assert!(e.to_string().contains("5-3"));
    }

    #[test]
    fn document_error_names_its_document() {
        let e = DocumentError::DirectFailed {
            name: "invoice.pdf".into(),
            detail: "text layer unreadable".into(),
        };
        assert_eq!(e.document(), "invoice.pdf");
        assert!(e.to_string().starts_with("invoice.pdf"));
    }

    #[test]
    fn document_error_serializes() {
        let e = DocumentError::WriteFailed {
            name: "a.pdf".into(),
            detail: "disk full".into(),
        };
        let json = serde_json::to_string(&e).expect("serialize");
        assert!(json.contains("WriteFailed"));
    }
}
