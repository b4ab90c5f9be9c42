//! Pipeline stages for PDF conversion, splitting and table extraction.
//!
//! Each submodule implements exactly one transformation step. Stages talk
//! to the outside world through three seams ([`render::DocumentRenderer`],
//! [`recognize::OcrEngine`], [`assemble::DocumentWriter`]) so every step can
//! be tested without pdfium, tesseract or a real office writer.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ strategy ─┬─ direct ──────────────────────────┬─▶ assemble ──▶ package
//! (URL/path) (pdfium)  (auto?)   └─ preprocess ──▶ recognize ────────┘   (docx)       (zip?)
//!                                   (imageproc)    (tesseract cascade)
//!
//! render ──▶ tables ──▶ xlsx ──▶ package          render ──▶ split ──▶ package
//! ```
//!
//! 1. [`input`]      — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]     — page count, text layer, rasters and page copies
//! 3. [`strategy`]   — direct extraction or OCR, per document
//! 4. [`language`]   — negotiate requested OCR languages once per job
//! 5. [`preprocess`] — grayscale → upscale → denoise → binarise, best effort
//! 6. [`recognize`]  — profile cascade with a min-length acceptance rule
//! 7. [`postprocess`] — deterministic cleanup of OCR output
//! 8. [`assemble`] / [`docx`] — page outcomes into a document
//! 9. [`tables`] / [`xlsx`]   — spreadsheet path
//! 10. [`split`]     — range parsing and part extraction
//! 11. [`package`]   — one artifact or a zip of several

pub mod assemble;
pub mod docx;
pub mod encode;
pub mod input;
pub mod language;
pub mod package;
pub mod postprocess;
pub mod preprocess;
pub mod recognize;
pub mod render;
pub mod split;
pub mod strategy;
pub mod tables;
pub mod tesseract;
pub mod xlsx;
