//! End-to-end integration tests for edgequake-pdfconvert.
//!
//! These tests use real PDF files in `./test_cases/` and need libpdfium plus
//! a tesseract install with `eng` data. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Expected fixtures:
//!   test_cases/text_report.pdf   — born-digital, has a text layer
//!   test_cases/scanned_page.pdf  — image-only scan, legible English text
//!   test_cases/blank_scan.pdf    — image-only, nothing to read
//!   test_cases/invoice.pdf       — born-digital with a whitespace table
//!
//! Run with:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture

use edgequake_pdfconvert::{
    convert, convert_stream, extract_tables, inspect, installed_languages, split, write_artifact, ConversionConfig,
    ConvertError, ExtractionMode, PageKind, Strategy,
};
use futures::StreamExt;
use std::io::{Cursor, Read};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

fn config() -> ConversionConfig {
    ConversionConfig::builder()
        .languages("eng")
        .build()
        .expect("config")
}

fn docx_text(bytes: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("docx is a zip");
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .expect("document part")
        .read_to_string(&mut xml)
        .expect("utf-8");
    xml
}

// ── Inspect ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_text_report() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("text_report.pdf"));

    let info = inspect(path.to_str().unwrap(), &config())
        .await
        .expect("inspect() should succeed");

    assert!(info.page_count >= 1);
    assert!(info.has_text);
    assert_eq!(info.auto_strategy, Strategy::Direct);
    println!("Info: {:?}", info);
}

#[tokio::test]
async fn test_inspect_nonexistent() {
    let result = inspect("/definitely/not/a/real/file.pdf", &config()).await;
    assert!(matches!(result, Err(ConvertError::FileNotFound { .. })));
}

// ── Conversion ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_text_report_directly() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("text_report.pdf"));

    let out = convert([path.to_str().unwrap()], &config())
        .await
        .expect("convert() should succeed");

    assert_eq!(out.artifact.file_name, "text_report.docx");
    let report = &out.documents[0];
    assert_eq!(report.strategy, Some(Strategy::Direct));
    assert!(report.pages.iter().all(|p| p.kind == PageKind::Direct));
    assert!(report.pages.iter().any(|p| p.chars > 0));

    let written = write_artifact(&out.artifact, output_dir()).await.expect("write");
    println!("Wrote {}", written.display());
}

#[tokio::test]
async fn test_convert_scan_with_ocr() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("scanned_page.pdf"));

    let out = convert([path.to_str().unwrap()], &config())
        .await
        .expect("convert() should succeed");

    let report = &out.documents[0];
    assert_eq!(report.strategy, Some(Strategy::Ocr));
    assert_eq!(report.pages[0].kind, PageKind::Recognized, "{:?}", report.pages[0]);
    assert!(docx_text(&out.artifact.bytes).contains("Page 1"));
}

#[tokio::test]
async fn test_blank_scan_embeds_page_image() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("blank_scan.pdf"));

    let out = convert([path.to_str().unwrap()], &config())
        .await
        .expect("convert() should succeed");

    assert!(out.documents[0].pages.iter().all(|p| p.kind == PageKind::Embedded));
    let mut archive = zip::ZipArchive::new(Cursor::new(&out.artifact.bytes)).unwrap();
    assert!(archive.by_name("word/media/image1.png").is_ok());
}

#[tokio::test]
async fn test_forced_ocr_on_text_pdf() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("text_report.pdf"));

    let config = ConversionConfig::builder()
        .languages("eng")
        .mode(ExtractionMode::Ocr)
        .dpi(300)
        .build()
        .unwrap();
    let out = convert([path.to_str().unwrap()], &config).await.expect("convert");
    assert_eq!(out.documents[0].strategy, Some(Strategy::Ocr));
    assert!(out.stats.recognized_pages >= 1);
}

#[tokio::test]
async fn test_two_documents_are_zipped() {
    let text = e2e_skip_unless_ready!(test_cases_dir().join("text_report.pdf"));
    let scan = e2e_skip_unless_ready!(test_cases_dir().join("scanned_page.pdf"));

    let out = convert([text.to_str().unwrap(), scan.to_str().unwrap()], &config())
        .await
        .expect("convert");
    assert_eq!(out.artifact.file_name, "converted.zip");
    assert_eq!(out.stats.converted_documents, 2);
}

#[tokio::test]
async fn test_stream_yields_documents_in_order() {
    let text = e2e_skip_unless_ready!(test_cases_dir().join("text_report.pdf"));
    let scan = e2e_skip_unless_ready!(test_cases_dir().join("scanned_page.pdf"));

    let mut stream = convert_stream([text.to_str().unwrap(), scan.to_str().unwrap()], &config())
        .await
        .expect("stream");
    let mut names = Vec::new();
    while let Some(item) = stream.next().await {
        let doc = item.expect("no fatal error");
        names.push(doc.report.name.clone());
        assert!(doc.artifact.is_some());
    }
    assert_eq!(names, vec!["text_report.pdf", "scanned_page.pdf"]);
}

// ── Tables and split ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_invoice_tables() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("invoice.pdf"));

    let out = extract_tables([path.to_str().unwrap()], &config())
        .await
        .expect("extract_tables() should succeed");
    assert_eq!(out.artifact.file_name, "invoice.xlsx");

    let mut archive = zip::ZipArchive::new(Cursor::new(&out.artifact.bytes)).unwrap();
    assert!(archive.by_name("xl/worksheets/sheet1.xml").is_ok());
}

#[tokio::test]
async fn test_split_text_report() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("text_report.pdf"));

    let out = split(path.to_str().unwrap(), "1,1,999", &config())
        .await
        .expect("split() should succeed");
    assert_eq!(out.artifact.file_name, "split_pdfs.zip");
    assert_eq!(out.skipped_ranges.len(), 1);

    let mut archive = zip::ZipArchive::new(Cursor::new(&out.artifact.bytes)).unwrap();
    let mut magic = [0u8; 4];
    archive.by_name("part_2.pdf").unwrap().read_exact(&mut magic).unwrap();
    assert_eq!(&magic, b"%PDF");
}

// ── Languages ────────────────────────────────────────────────────────────────

#[test]
fn test_installed_languages_include_english() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }
    let langs = installed_languages(&config()).expect("tesseract --list-langs");
    assert!(langs.contains("eng"), "installed: {langs:?}");
}

#[test]
fn test_missing_tesseract_is_reported() {
    let config = ConversionConfig::builder()
        .tesseract_cmd("/nonexistent/tesseract")
        .build()
        .unwrap();
    let err = installed_languages(&config).unwrap_err();
    assert!(matches!(err, ConvertError::OcrUnavailable(_)));
}
