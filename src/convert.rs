//! Job entry points: convert to DOCX, extract tables to XLSX, split by ranges.
//!
//! ## Layers
//!
//! [`Converter`] is the synchronous core. It owns nothing: the renderer,
//! OCR engine, table extractor and writer factory are borrowed, so tests
//! drive it with in-memory fakes and the async wrappers below drive it with
//! pdfium, tesseract and the DOCX writer on a blocking worker thread.
//!
//! Every job gets its own working directory under
//! [`ConversionConfig::work_dir`] (system temp by default). It is a
//! [`TempDir`], so it disappears when the job returns, on success, on error
//! and on panic alike. Only the returned [`OutputArtifact`] outlives it.

use crate::config::ConversionConfig;
use crate::error::{ConvertError, DocumentError};
use crate::output::{DocumentInfo, DocumentReport, JobOutput, JobStats, OutputArtifact, PageKind, PageSummary};
use crate::pipeline::assemble::{Assembler, DocumentWriter, WriterFactory};
use crate::pipeline::docx::DocxWriter;
use crate::pipeline::input::{self, JobInput, ResolvedInput};
use crate::pipeline::language::{self, Negotiation};
use crate::pipeline::package::{self, ArtifactNamer, CONVERTED_ZIP, SPLIT_ZIP, TABLES_ZIP};
use crate::pipeline::postprocess::text_lines;
use crate::pipeline::preprocess::preprocess;
use crate::pipeline::recognize::{OcrEngine, PageOutcome, RecognitionCascade};
use crate::pipeline::render::{DocumentRenderer, PdfiumRenderer, RenderedDocument};
use crate::pipeline::split;
use crate::pipeline::strategy::{self, Strategy};
use crate::pipeline::tables::{self, TableExtractor, WhitespaceTableExtractor};
use crate::pipeline::tesseract::TesseractEngine;
use crate::progress::ProgressCallback;
use once_cell::unsync::OnceCell;
use std::collections::BTreeSet;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Synchronous pipeline over borrowed collaborators.
pub struct Converter<'a> {
    renderer: &'a dyn DocumentRenderer,
    engine: &'a dyn OcrEngine,
    tables: &'a dyn TableExtractor,
    new_writer: &'a WriterFactory,
    config: &'a ConversionConfig,
}

impl<'a> Converter<'a> {
    pub fn new(
        renderer: &'a dyn DocumentRenderer,
        engine: &'a dyn OcrEngine,
        tables: &'a dyn TableExtractor,
        new_writer: &'a WriterFactory,
        config: &'a ConversionConfig,
    ) -> Self {
        Self {
            renderer,
            engine,
            tables,
            new_writer,
            config,
        }
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.config.progress_callback.as_ref()
    }

    fn job_dir(&self) -> Result<TempDir, ConvertError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdfconvert-");
        let dir = match &self.config.work_dir {
            Some(parent) => std::fs::create_dir_all(parent).and_then(|()| builder.tempdir_in(parent)),
            None => builder.tempdir(),
        };
        dir.map_err(|e| ConvertError::Internal(format!("cannot create working directory: {e}")))
    }

    // ── Document conversion ──────────────────────────────────────────────

    /// Convert every input to a document and deliver one artifact: the
    /// single document, or [`CONVERTED_ZIP`] holding all of them.
    ///
    /// A document that fails on every strategy is reported and dropped;
    /// the job only fails if none is left.
    pub fn convert_documents(&self, inputs: &[JobInput]) -> Result<JobOutput, ConvertError> {
        let start = Instant::now();
        let mut reports = Vec::with_capacity(inputs.len());
        let mut artifacts = Vec::new();

        self.convert_each(inputs, |report, artifact| {
            artifacts.extend(artifact);
            reports.push(report);
            ControlFlow::Continue(())
        })?;

        self.finish(reports, artifacts, Vec::new(), CONVERTED_ZIP, start)
    }

    /// Convert inputs one after another, handing each document's report
    /// (and artifact, if any) to `sink` as soon as it is final.
    ///
    /// `sink` can stop the job early by returning [`ControlFlow::Break`].
    pub fn convert_each<F>(&self, inputs: &[JobInput], mut sink: F) -> Result<(), ConvertError>
    where
        F: FnMut(DocumentReport, Option<OutputArtifact>) -> ControlFlow<()>,
    {
        if inputs.is_empty() {
            return Err(ConvertError::NoInputs);
        }
        let job_dir = self.job_dir()?;
        info!(
            "Converting {} document(s) in {}",
            inputs.len(),
            job_dir.path().display()
        );
        if let Some(cb) = self.progress() {
            cb.on_job_start(inputs.len());
        }

        // Negotiated on the first document that needs OCR, then shared.
        let languages = OnceCell::new();
        let mut namer = ArtifactNamer::new();
        let mut succeeded = 0;
        let mut attempted = 0;

        for (i, input) in inputs.iter().enumerate() {
            attempted += 1;
            if let Some(cb) = self.progress() {
                cb.on_document_start(i + 1, &input.name);
            }
            let doc_start = Instant::now();
            let doc_dir = job_dir.path().join(format!("doc-{}", i + 1));
            let mut report = DocumentReport {
                name: input.name.clone(),
                ..Default::default()
            };

            let artifact = match self.convert_one(input, &doc_dir, &languages, &mut namer, &mut report) {
                Ok(artifact) => {
                    succeeded += 1;
                    report.artifact_name = Some(artifact.file_name.clone());
                    if let (Some(cb), Some(strategy)) = (self.progress(), report.strategy) {
                        cb.on_document_complete(&input.name, strategy);
                    }
                    Some(artifact)
                }
                Err(e) => {
                    warn!("Dropping document: {}", e);
                    if let Some(cb) = self.progress() {
                        cb.on_document_error(&input.name, &e.to_string());
                    }
                    report.strategy = None;
                    report.pages.clear();
                    report.error = Some(e);
                    None
                }
            };
            remove_scratch(&doc_dir);
            report.duration_ms = doc_start.elapsed().as_millis() as u64;

            if sink(report, artifact).is_break() {
                debug!("Job stopped by caller after {} document(s)", attempted);
                break;
            }
        }

        if let Some(cb) = self.progress() {
            cb.on_job_complete(attempted, succeeded);
        }
        Ok(())
    }

    fn convert_one(
        &self,
        input: &JobInput,
        doc_dir: &Path,
        languages: &OnceCell<Negotiation>,
        namer: &mut ArtifactNamer,
        report: &mut DocumentReport,
    ) -> Result<OutputArtifact, DocumentError> {
        let name = input.name.as_str();
        let doc = self.open(input)?;
        std::fs::create_dir_all(doc_dir).map_err(|e| write_failed(name, e))?;

        let total = doc.page_count();
        let chosen = strategy::select(self.config.mode, doc.as_ref());
        info!("{}: {} pages, {} extraction", name, total, chosen);
        if let Some(cb) = self.progress() {
            cb.on_strategy_selected(name, chosen, total);
        }

        let mut writer = (self.new_writer)();
        let file_name = namer.name_for(name, writer.extension());
        let path = doc_dir.join(&file_name);

        let pages = match chosen {
            Strategy::Ocr => {
                let pages = self.run_ocr(name, doc.as_ref(), writer.as_mut(), doc_dir, languages)?;
                save_document(writer.as_mut(), &path, name)?;
                pages
            }
            Strategy::Direct => {
                // A failed save counts as a failed direct pass and is retried too.
                let direct = self
                    .run_direct(name, doc.as_ref(), writer.as_mut(), doc_dir)
                    .and_then(|pages| save_document(writer.as_mut(), &path, name).map(|()| pages));
                match direct {
                    Ok(pages) => pages,
                    Err(e) => {
                        warn!("{}; retrying with OCR", e);
                        report.retried_with_ocr = true;
                        if let Some(cb) = self.progress() {
                            cb.on_strategy_selected(name, Strategy::Ocr, total);
                        }
                        // Discard whatever the direct pass appended.
                        writer = (self.new_writer)();
                        let pages = self.run_ocr(name, doc.as_ref(), writer.as_mut(), doc_dir, languages)?;
                        save_document(writer.as_mut(), &path, name)?;
                        pages
                    }
                }
            }
        };
        report.strategy = Some(if report.retried_with_ocr {
            Strategy::Ocr
        } else {
            chosen
        });
        report.pages = pages;

        let bytes = std::fs::read(&path).map_err(|e| write_failed(name, e))?;
        debug!("{}: {} bytes as {}", name, bytes.len(), file_name);
        Ok(OutputArtifact::new(file_name, bytes))
    }

    fn open(&self, input: &JobInput) -> Result<Box<dyn RenderedDocument + 'a>, DocumentError> {
        let open_failed = |detail: String| DocumentError::OpenFailed {
            name: input.name.clone(),
            detail,
        };
        input::resolve_local(&input.path).map_err(|e| open_failed(e.to_string()))?;
        self.renderer
            .open(&input.path)
            .map_err(|e| open_failed(e.to_string()))
    }

    fn run_direct(
        &self,
        name: &str,
        doc: &dyn RenderedDocument,
        writer: &mut dyn DocumentWriter,
        scratch: &Path,
    ) -> Result<Vec<PageSummary>, DocumentError> {
        let total = doc.page_count();
        let mut assembler = Assembler::new(writer, scratch);
        let mut pages = Vec::with_capacity(total);

        for index in 0..total {
            let page_num = index + 1;
            let text = doc.text_of(index).map_err(|e| DocumentError::DirectFailed {
                name: name.to_string(),
                detail: e.to_string(),
            })?;
            let lines = text_lines(&text);
            assembler.push_text(page_num, &lines);
            pages.push(PageSummary {
                page_num,
                kind: PageKind::Direct,
                chars: lines.iter().map(|l| l.chars().count()).sum(),
                attempt: None,
            });
            self.page_done(name, page_num, total, PageKind::Direct);
        }
        Ok(pages)
    }

    fn run_ocr(
        &self,
        name: &str,
        doc: &dyn RenderedDocument,
        writer: &mut dyn DocumentWriter,
        scratch: &Path,
        languages: &OnceCell<Negotiation>,
    ) -> Result<Vec<PageSummary>, DocumentError> {
        let negotiation = languages.get_or_init(|| language::negotiate(&self.config.languages, self.engine));
        let cascade = RecognitionCascade::new(
            self.engine,
            &negotiation.effective,
            &self.config.profiles,
            self.config.min_text_chars,
        );

        let total = doc.page_count();
        let mut assembler = Assembler::new(writer, scratch);
        let mut pages = Vec::with_capacity(total);

        for index in 0..total {
            let page_num = index + 1;
            let raster = doc
                .raster_of(index, self.config.dpi)
                .map_err(|e| DocumentError::RenderFailed {
                    name: name.to_string(),
                    page: page_num,
                    detail: e.detail,
                })?;
            let prepared = preprocess(raster, &self.config.preprocess);
            debug!("{} page {}: {}", name, page_num, prepared.applied.join(" → "));

            let outcome = cascade.recognize(prepared, page_num);
            let attempt = match &outcome {
                PageOutcome::Recognized { attempt, .. } => Some(attempt.to_string()),
                PageOutcome::Embedded { .. } => None,
            };
            let chars = outcome.chars();
            let kind = assembler
                .push_outcome(page_num, &outcome)
                .map_err(|e| write_failed(name, e))?;
            pages.push(PageSummary {
                page_num,
                kind,
                chars,
                attempt,
            });
            self.page_done(name, page_num, total, kind);
        }
        Ok(pages)
    }

    fn page_done(&self, name: &str, page_num: usize, total: usize, kind: PageKind) {
        if let Some(cb) = self.progress() {
            cb.on_page_complete(name, page_num, total, kind);
        }
    }

    // ── Spreadsheet extraction ───────────────────────────────────────────

    /// Extract every input to a workbook and deliver one artifact: the
    /// single `.xlsx`, or [`TABLES_ZIP`] holding all of them.
    pub fn extract_tables(&self, inputs: &[JobInput]) -> Result<JobOutput, ConvertError> {
        if inputs.is_empty() {
            return Err(ConvertError::NoInputs);
        }
        let start = Instant::now();
        if let Some(cb) = self.progress() {
            cb.on_job_start(inputs.len());
        }

        let mut namer = ArtifactNamer::new();
        let mut reports = Vec::with_capacity(inputs.len());
        let mut artifacts = Vec::new();

        for (i, input) in inputs.iter().enumerate() {
            if let Some(cb) = self.progress() {
                cb.on_document_start(i + 1, &input.name);
            }
            let doc_start = Instant::now();
            let mut report = DocumentReport {
                name: input.name.clone(),
                ..Default::default()
            };
            match self.workbook_for(input, &mut namer) {
                Ok(artifact) => {
                    report.strategy = Some(Strategy::Direct);
                    report.artifact_name = Some(artifact.file_name.clone());
                    if let Some(cb) = self.progress() {
                        cb.on_document_complete(&input.name, Strategy::Direct);
                    }
                    artifacts.push(artifact);
                }
                Err(e) => {
                    warn!("Dropping document: {}", e);
                    if let Some(cb) = self.progress() {
                        cb.on_document_error(&input.name, &e.to_string());
                    }
                    report.error = Some(e);
                }
            }
            report.duration_ms = doc_start.elapsed().as_millis() as u64;
            reports.push(report);
        }

        if let Some(cb) = self.progress() {
            let succeeded = reports.iter().filter(|r| r.succeeded()).count();
            cb.on_job_complete(reports.len(), succeeded);
        }
        self.finish(reports, artifacts, Vec::new(), TABLES_ZIP, start)
    }

    fn workbook_for(&self, input: &JobInput, namer: &mut ArtifactNamer) -> Result<OutputArtifact, DocumentError> {
        let name = input.name.as_str();
        let doc = self.open(input)?;
        let (book, source) = tables::build_workbook(doc.as_ref(), self.tables, self.config.sheet_mode)
            .map_err(|e| DocumentError::TablesFailed {
                name: name.to_string(),
                detail: e.to_string(),
            })?;
        info!("{}: {} sheet(s) from {:?}", name, book.sheets.len(), source);
        let bytes = book.to_xlsx().map_err(|e| write_failed(name, e))?;
        Ok(OutputArtifact::new(namer.name_for(name, "xlsx"), bytes))
    }

    // ── Splitting ────────────────────────────────────────────────────────

    /// Split one PDF into one part per valid entry of `ranges`.
    ///
    /// Rejected entries are listed in [`JobOutput::skipped_ranges`]; the
    /// job fails only when no entry is valid.
    pub fn split(&self, input: &JobInput, ranges: &str) -> Result<JobOutput, ConvertError> {
        let start = Instant::now();
        let name = input.name.as_str();
        input::resolve_local(&input.path)?;
        let doc = self.renderer.open(&input.path)?;
        let total = doc.page_count();
        let job_dir = self.job_dir()?;

        if let Some(cb) = self.progress() {
            cb.on_job_start(1);
            cb.on_document_start(1, name);
        }

        let result = split::split_document(doc.as_ref(), ranges, job_dir.path());
        if result.parts.is_empty() && result.failed.is_empty() {
            let first_error = result
                .skipped
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no entries".to_string());
            return Err(ConvertError::NoValidRanges {
                ranges: ranges.to_string(),
                total,
                first_error,
            });
        }

        let mut artifacts = Vec::with_capacity(result.parts.len());
        for part in &result.parts {
            let bytes = std::fs::read(&part.path).map_err(|e| ConvertError::OutputWriteFailed {
                path: part.path.clone(),
                source: e,
            })?;
            artifacts.push(OutputArtifact::new(split::part_name(part.entry.position), bytes));
        }

        let mut report = DocumentReport {
            name: name.to_string(),
            ..Default::default()
        };
        match artifacts.len() {
            0 => {
                let detail = result
                    .failed
                    .first()
                    .map(|(entry, e)| format!("part {}: {}", entry.position, e))
                    .unwrap_or_default();
                if let Some(cb) = self.progress() {
                    cb.on_document_error(name, &detail);
                }
                report.error = Some(DocumentError::WriteFailed {
                    name: name.to_string(),
                    detail,
                });
            }
            1 => report.artifact_name = Some(artifacts[0].file_name.clone()),
            _ => report.artifact_name = Some(SPLIT_ZIP.to_string()),
        }
        info!(
            "{}: {} part(s), {} range(s) skipped, {} failed",
            name,
            artifacts.len(),
            result.skipped.len(),
            result.failed.len()
        );
        report.duration_ms = start.elapsed().as_millis() as u64;

        if let Some(cb) = self.progress() {
            cb.on_job_complete(1, usize::from(report.succeeded()));
        }
        self.finish(vec![report], artifacts, result.skipped, SPLIT_ZIP, start)
    }

    // ── Inspection ───────────────────────────────────────────────────────

    /// Page count and text-layer probe, without converting anything.
    pub fn inspect(&self, input: &JobInput) -> Result<DocumentInfo, ConvertError> {
        input::resolve_local(&input.path)?;
        let doc = self.renderer.open(&input.path)?;
        let has_text = strategy::has_extractable_text(doc.as_ref());
        Ok(DocumentInfo {
            name: input.name.clone(),
            page_count: doc.page_count(),
            has_text,
            auto_strategy: if has_text { Strategy::Direct } else { Strategy::Ocr },
        })
    }

    fn finish(
        &self,
        reports: Vec<DocumentReport>,
        artifacts: Vec<OutputArtifact>,
        skipped_ranges: Vec<crate::error::RangeError>,
        package_name: &str,
        start: Instant,
    ) -> Result<JobOutput, ConvertError> {
        if artifacts.is_empty() {
            let first_error = reports
                .iter()
                .find_map(|r| r.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ConvertError::NoArtifacts {
                total: reports.len(),
                first_error,
            });
        }

        let count = artifacts.len();
        let artifact = package::deliver(artifacts, package_name)?;
        let stats = JobStats::from_reports(&reports, count, start.elapsed().as_millis() as u64);
        info!(
            "Job complete: {}/{} document(s), delivered {} ({} bytes), {}ms",
            stats.converted_documents,
            stats.total_documents,
            artifact.file_name,
            artifact.bytes.len(),
            stats.total_duration_ms
        );

        Ok(JobOutput {
            artifact,
            documents: reports,
            skipped_ranges,
            stats,
        })
    }
}

fn write_failed(name: &str, e: impl std::fmt::Display) -> DocumentError {
    DocumentError::WriteFailed {
        name: name.to_string(),
        detail: e.to_string(),
    }
}

fn save_document(writer: &mut dyn DocumentWriter, path: &Path, name: &str) -> Result<(), DocumentError> {
    writer.save(path).map_err(|e| write_failed(name, e))
}

fn remove_scratch(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", dir.display(), e);
        }
    }
}

// ── Async entry points ───────────────────────────────────────────────────

/// Convert PDF files or URLs to Word documents.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `inputs` — Local file paths or HTTP/HTTPS URLs to PDFs
/// * `config` — Conversion configuration
///
/// # Returns
/// `Ok(JobOutput)` when at least one document converted; the others are
/// listed with their error in `output.documents`.
///
/// # Errors
/// Returns `Err(ConvertError)` only for fatal errors:
/// - No inputs, or a URL that cannot be downloaded
/// - pdfium cannot be bound
/// - Every document failed and nothing can be delivered
pub async fn convert<I, S>(inputs: I, config: &ConversionConfig) -> Result<JobOutput, ConvertError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (resolved, jobs) = resolve_inputs(inputs, config).await?;
    let output = run_blocking(config, move |converter| converter.convert_documents(&jobs)).await;
    drop(resolved);
    output
}

/// Extract tables from PDF files or URLs into spreadsheets.
pub async fn extract_tables<I, S>(inputs: I, config: &ConversionConfig) -> Result<JobOutput, ConvertError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (resolved, jobs) = resolve_inputs(inputs, config).await?;
    let output = run_blocking(config, move |converter| converter.extract_tables(&jobs)).await;
    drop(resolved);
    output
}

/// Split a PDF file or URL by a range string such as `"1-3,5,7-9"`.
pub async fn split(
    input: impl AsRef<str>,
    ranges: impl Into<String>,
    config: &ConversionConfig,
) -> Result<JobOutput, ConvertError> {
    let resolved =
        input::resolve_input(input.as_ref(), config.download_timeout_secs, config.work_dir.as_deref()).await?;
    let job = resolved.job_input();
    let ranges = ranges.into();
    let output = run_blocking(config, move |converter| converter.split(&job, &ranges)).await;
    drop(resolved);
    output
}

/// Read page count and text-layer presence without converting.
pub async fn inspect(input: impl AsRef<str>, config: &ConversionConfig) -> Result<DocumentInfo, ConvertError> {
    let resolved =
        input::resolve_input(input.as_ref(), config.download_timeout_secs, config.work_dir.as_deref()).await?;
    let job = resolved.job_input();
    let info = run_blocking(config, move |converter| converter.inspect(&job)).await;
    drop(resolved);
    info
}

/// Convert in-memory PDF bytes named `name`.
///
/// The bytes are written to a managed temp file that is removed on return.
pub async fn convert_from_bytes(
    name: &str,
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<JobOutput, ConvertError> {
    let dir = TempDir::new().map_err(|e| ConvertError::Internal(format!("tempfile: {e}")))?;
    let file_name = Path::new(name)
        .file_name()
        .map(|n| n.to_owned())
        .unwrap_or_else(|| "upload.pdf".into());
    let path = dir.path().join(file_name);
    let mut file = std::fs::File::create(&path)
        .map_err(|e| ConvertError::Internal(format!("tempfile create: {e}")))?;
    file.write_all(bytes)
        .map_err(|e| ConvertError::Internal(format!("tempfile write: {e}")))?;
    drop(file);

    let jobs = vec![JobInput::from_path(&path)];
    // `dir` is dropped (and the file deleted) when the job returns
    run_blocking(config, move |converter| converter.convert_documents(&jobs)).await
}

/// Codes the OCR engine reports as installed.
pub fn installed_languages(config: &ConversionConfig) -> Result<BTreeSet<String>, ConvertError> {
    TesseractEngine::new(config.ocr.clone(), config.work_dir.clone())
        .installed_languages()
        .map_err(|e| ConvertError::OcrUnavailable(e.to_string()))
}

/// Negotiate the configured languages against the installed set.
pub fn negotiate_languages(config: &ConversionConfig) -> Result<Negotiation, ConvertError> {
    let installed = installed_languages(config)?;
    Ok(language::resolve(&config.languages, installed))
}

/// Write an artifact to `dest` atomically (temp file + rename).
///
/// If `dest` is an existing directory the artifact's own file name is used
/// inside it. Returns the final path.
pub async fn write_artifact(artifact: &OutputArtifact, dest: impl AsRef<Path>) -> Result<PathBuf, ConvertError> {
    let dest = dest.as_ref();
    let path = if tokio::fs::metadata(dest).await.map(|m| m.is_dir()).unwrap_or(false) {
        dest.join(&artifact.file_name)
    } else {
        dest.to_path_buf()
    };
    let write_err = |source| ConvertError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);
    tokio::fs::write(&tmp_path, &artifact.bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(path)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<I, S>(inputs: I, config: &ConversionConfig) -> Result<JobOutput, ConvertError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    runtime()?.block_on(convert(inputs, config))
}

/// Synchronous wrapper around [`extract_tables`].
pub fn extract_tables_sync<I, S>(inputs: I, config: &ConversionConfig) -> Result<JobOutput, ConvertError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    runtime()?.block_on(extract_tables(inputs, config))
}

/// Synchronous wrapper around [`split`].
pub fn split_sync(
    input: impl AsRef<str>,
    ranges: impl Into<String>,
    config: &ConversionConfig,
) -> Result<JobOutput, ConvertError> {
    runtime()?.block_on(split(input, ranges, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn runtime() -> Result<tokio::runtime::Runtime, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))
}

/// Download URL inputs; local paths pass through and are validated per
/// document so one bad file does not sink the job.
pub(crate) async fn resolve_inputs<I, S>(
    inputs: I,
    config: &ConversionConfig,
) -> Result<(Vec<ResolvedInput>, Vec<JobInput>), ConvertError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut resolved = Vec::new();
    for raw in inputs {
        let raw = raw.as_ref();
        if input::is_url(raw) {
            let download = input::resolve_input(raw, config.download_timeout_secs, config.work_dir.as_deref());
            resolved.push(download.await?);
        } else {
            resolved.push(ResolvedInput::Local(PathBuf::from(raw)));
        }
    }
    if resolved.is_empty() {
        return Err(ConvertError::NoInputs);
    }
    let jobs = resolved.iter().map(ResolvedInput::job_input).collect();
    Ok((resolved, jobs))
}

/// Run `job` against the production stack on a blocking worker thread.
///
/// pdfium and tesseract are both blocking; nothing here may run on the
/// async executor.
pub(crate) async fn run_blocking<T, F>(config: &ConversionConfig, job: F) -> Result<T, ConvertError>
where
    T: Send + 'static,
    F: FnOnce(&Converter<'_>) -> Result<T, ConvertError> + Send + 'static,
{
    let config = config.clone();
    tokio::task::spawn_blocking(move || with_default_stack(&config, job))
        .await
        .map_err(|e| ConvertError::Internal(format!("conversion task failed: {e}")))?
}

fn with_default_stack<T>(
    config: &ConversionConfig,
    job: impl FnOnce(&Converter<'_>) -> Result<T, ConvertError>,
) -> Result<T, ConvertError> {
    let renderer = PdfiumRenderer::new(
        config.pdfium_lib_path.as_deref(),
        config.password.clone(),
        config.max_rendered_pixels,
    )?;
    let engine = TesseractEngine::new(config.ocr.clone(), config.work_dir.clone());
    let tables = WhitespaceTableExtractor;
    let new_writer = || Box::new(DocxWriter::new()) as Box<dyn DocumentWriter>;
    let converter = Converter::new(&renderer, &engine, &tables, &new_writer, config);
    job(&converter)
}
