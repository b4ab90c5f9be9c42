//! Output types: the delivered artifact plus per-document reports.
//!
//! The pipeline owns an [`OutputArtifact`] until it returns it inside
//! [`JobOutput`]; from then on the caller (CLI, HTTP layer, …) owns the bytes
//! and the job's working directory is already gone.

use crate::error::{DocumentError, RangeError};
use crate::pipeline::strategy::Strategy;
use serde::{Deserialize, Serialize};

/// How a page ended up in the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// Text taken from the embedded text layer.
    Direct,
    /// Text produced by OCR and accepted.
    Recognized,
    /// OCR fell short; the page raster was embedded instead.
    Embedded,
}

/// Summary of one page of a converted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-indexed page number.
    pub page_num: usize,
    pub kind: PageKind,
    /// Characters of text written for the page (0 for embedded pages).
    pub chars: usize,
    /// Recognition attempt that produced the text, e.g. `"processed/psm 3"`.
    pub attempt: Option<String>,
}

/// What happened to one input document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Display name (usually the input file name).
    pub name: String,
    /// Strategy that produced the artifact, if any did.
    pub strategy: Option<Strategy>,
    /// True when direct extraction failed and OCR was run as the retry.
    pub retried_with_ocr: bool,
    /// Name of the artifact produced for this document.
    pub artifact_name: Option<String>,
    pub pages: Vec<PageSummary>,
    /// Set when the document was dropped from the result set.
    pub error: Option<DocumentError>,
    pub duration_ms: u64,
}

impl DocumentReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.artifact_name.is_some()
    }
}

/// Aggregate counters for a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub total_documents: usize,
    pub converted_documents: usize,
    pub failed_documents: usize,
    pub total_pages: usize,
    pub direct_pages: usize,
    pub recognized_pages: usize,
    pub embedded_pages: usize,
    /// Artifacts produced before packaging.
    pub artifacts: usize,
    pub total_duration_ms: u64,
}

impl JobStats {
    /// Tally the per-document reports.
    pub fn from_reports(reports: &[DocumentReport], artifacts: usize, duration_ms: u64) -> Self {
        let mut stats = JobStats {
            total_documents: reports.len(),
            artifacts,
            total_duration_ms: duration_ms,
            ..Default::default()
        };
        for report in reports {
            if report.succeeded() {
                stats.converted_documents += 1;
            } else {
                stats.failed_documents += 1;
            }
            for page in &report.pages {
                stats.total_pages += 1;
                match page.kind {
                    PageKind::Direct => stats.direct_pages += 1,
                    PageKind::Recognized => stats.recognized_pages += 1,
                    PageKind::Embedded => stats.embedded_pages += 1,
                }
            }
        }
        stats
    }
}

/// A produced document, spreadsheet, PDF part, or zip of several of them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl OutputArtifact {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// True when the artifact is a zip package of several outputs.
    pub fn is_package(&self) -> bool {
        self.file_name.ends_with(".zip")
    }
}

impl std::fmt::Debug for OutputArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputArtifact")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Result of a whole job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    /// The single deliverable: one file, or a zip holding all of them.
    pub artifact: OutputArtifact,
    pub documents: Vec<DocumentReport>,
    /// Range entries rejected by a split job.
    pub skipped_ranges: Vec<RangeError>,
    pub stats: JobStats,
}

/// What [`crate::convert::inspect`] reports about a PDF without converting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub page_count: usize,
    /// True if at least one page has a non-blank text layer.
    pub has_text: bool,
    /// Strategy `auto` mode would pick.
    pub auto_strategy: Strategy,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, kind: PageKind) -> PageSummary {
        PageSummary {
            page_num: n,
            kind,
            chars: 0,
            attempt: None,
        }
    }

    #[test]
    fn stats_tally_pages_and_documents() {
        let ok = DocumentReport {
            name: "a.pdf".into(),
            strategy: Some(Strategy::Ocr),
            artifact_name: Some("a.docx".into()),
            pages: vec![page(1, PageKind::Recognized), page(2, PageKind::Embedded)],
            ..Default::default()
        };
        let failed = DocumentReport {
            name: "b.pdf".into(),
            error: Some(DocumentError::OpenFailed {
                name: "b.pdf".into(),
                detail: "corrupt".into(),
            }),
            ..Default::default()
        };
        let stats = JobStats::from_reports(&[ok, failed], 1, 42);
        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.converted_documents, 1);
        assert_eq!(stats.failed_documents, 1);
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.recognized_pages, 1);
        assert_eq!(stats.embedded_pages, 1);
        assert_eq!(stats.artifacts, 1);
    }

    #[test]
    fn artifact_debug_hides_bytes() {
        let a = OutputArtifact::new("converted.zip", vec![0u8; 1024]);
        assert!(a.is_package());
        let dbg = format!("{a:?}");
        assert!(dbg.contains("1024"));
        assert!(!dbg.contains("[0, 0"));
    }

    #[test]
    fn artifact_bytes_not_serialized() {
        let a = OutputArtifact::new("a.docx", vec![1, 2, 3]);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, r#"{"file_name":"a.docx"}"#);
    }
}
