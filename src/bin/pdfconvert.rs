//! CLI binary for edgequake-pdfconvert.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and writes the delivered artifact.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdfconvert::{
    convert, extract_tables, inspect, installed_languages, split, write_artifact, ConversionConfig,
    ConversionProgressCallback, ExtractionMode, JobOutput, PageKind, ProgressCallback, SheetMode, Strategy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar per document, reset when the next
/// document starts, plus a log line per finished document and per page
/// whose image had to be embedded.
struct CliProgressCallback {
    bar: ProgressBar,
    embedded: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            embedded: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize, strategy: Strategy) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(progress_style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message(strategy.to_string());
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_job_start(&self, total_documents: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, index: usize, name: &str) {
        self.bar.set_prefix(format!("[{index}] {name}"));
    }

    fn on_strategy_selected(&self, _name: &str, strategy: Strategy, total_pages: usize) {
        self.activate_bar(total_pages, strategy);
    }

    fn on_page_complete(&self, document: &str, page: usize, total: usize, kind: PageKind) {
        if kind == PageKind::Embedded {
            self.embedded.fetch_add(1, Ordering::SeqCst);
            self.bar.println(format!(
                "  {} {} page {:>3}/{:<3}  {}",
                yellow("⚠"),
                document,
                page,
                total,
                dim("little or no text recognised, image embedded"),
            ));
        }
        self.bar.inc(1);
    }

    fn on_document_complete(&self, name: &str, strategy: Strategy) {
        self.bar.println(format!("  {} {}  {}", green("✓"), name, dim(&strategy.to_string())));
    }

    fn on_document_error(&self, name: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!("  {} {}  {}", red("✗"), name, red(&msg)));
    }

    fn on_job_complete(&self, total_documents: usize, succeeded: usize) {
        let failed = total_documents.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        let embedded = self.embedded.load(Ordering::SeqCst);
        let embedded_note = if embedded > 0 {
            format!("  ({embedded} page(s) embedded as images)")
        } else {
            String::new()
        };
        if failed == 0 {
            eprintln!(
                "{} {} document(s) processed{}",
                green("✔"),
                bold(&succeeded.to_string()),
                dim(&embedded_note)
            );
        } else {
            eprintln!(
                "{} {}/{} document(s) processed  ({} failed){}",
                if failed == total_documents {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&succeeded.to_string()),
                total_documents,
                red(&failed.to_string()),
                dim(&embedded_note),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a scan to Word (OCR chosen automatically)
  pdfconvert convert scan.pdf

  # Several documents → converted.zip, Hindi + English OCR
  pdfconvert convert a.pdf b.pdf --lang eng+hin -o out/

  # Force OCR on a PDF with a broken text layer
  pdfconvert convert --mode ocr broken.pdf -o fixed.docx

  # Tables to Excel, one sheet per page layout
  pdfconvert tables --full-structure invoice.pdf

  # Split into three parts → split_pdfs.zip
  pdfconvert split book.pdf --ranges "1-3,5,7-9"

  # What would auto mode do?
  pdfconvert inspect scan.pdf

  # Which OCR languages are installed?
  pdfconvert langs --lang eng+tam

ENVIRONMENT VARIABLES:
  PDFCONVERT_LANG         OCR languages, '+'-joined (default eng+hin)
  PDFCONVERT_MODE         auto, direct or ocr
  PDFCONVERT_TESSERACT    tesseract executable
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Log filter, e.g. edgequake_pdfconvert=debug

RUNTIME REQUIREMENTS:
  libpdfium               https://github.com/bblanchon/pdfium-binaries
  tesseract-ocr           plus tesseract-ocr-<lang> for every language used
"#;

/// Convert PDFs to Word or Excel, or split them, with OCR fallback.
#[derive(Parser, Debug)]
#[command(
    name = "pdfconvert",
    version,
    about = "Convert PDFs to Word or Excel, or split them, with OCR fallback",
    long_about = "Convert PDF documents (local files or URLs) to DOCX using the embedded text layer \
when there is one and tesseract OCR when there is not. Pages OCR cannot read are embedded as images \
rather than dropped. Also extracts tables to XLSX and splits PDFs by page ranges.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Tesseract executable [default: $TESSERACT_CMD or `tesseract`].
    #[arg(long, global = true, env = "PDFCONVERT_TESSERACT")]
    tesseract: Option<PathBuf>,

    /// Directory containing libpdfium.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDFCONVERT_PASSWORD")]
    password: Option<String>,

    /// Parent directory for per-job working directories.
    #[arg(long, global = true, env = "PDFCONVERT_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "PDFCONVERT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the job report as JSON on stdout.
    #[arg(long, global = true, env = "PDFCONVERT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFCONVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFCONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFCONVERT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert PDFs to Word documents.
    Convert {
        /// Local PDF file paths or HTTP/HTTPS URLs.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output file, or directory to write the artifact into.
        #[arg(short, long, env = "PDFCONVERT_OUTPUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        ocr: OcrArgs,
    },

    /// Extract tables into Excel workbooks.
    Tables {
        /// Local PDF file paths or HTTP/HTTPS URLs.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output file, or directory to write the artifact into.
        #[arg(short, long, env = "PDFCONVERT_OUTPUT")]
        output: Option<PathBuf>,

        /// One sheet per page holding its full line layout.
        #[arg(long)]
        full_structure: bool,
    },

    /// Split a PDF into parts by page ranges.
    Split {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Comma-separated 1-based pages or ranges, e.g. "1-3,5,7-9".
        #[arg(short, long)]
        ranges: String,

        /// Output file, or directory to write the artifact into.
        #[arg(short, long, env = "PDFCONVERT_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Print page count and text-layer presence, no conversion.
    Inspect {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,
    },

    /// List installed OCR languages and negotiate a request against them.
    Langs {
        /// Languages to check, '+'-joined.
        #[arg(long, env = "PDFCONVERT_LANG", default_value = "eng+hin")]
        lang: String,
    },
}

#[derive(Args, Debug)]
struct OcrArgs {
    /// Extraction strategy.
    #[arg(long, env = "PDFCONVERT_MODE", value_enum, default_value = "auto")]
    mode: ModeArg,

    /// OCR languages, '+'-joined.
    #[arg(long, env = "PDFCONVERT_LANG", default_value = "eng+hin")]
    lang: String,

    /// Rendering DPI for OCR (72–600).
    #[arg(long, env = "PDFCONVERT_DPI", default_value_t = 400,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// OCR text at or below this many characters embeds the page image.
    #[arg(long, env = "PDFCONVERT_MIN_CHARS", default_value_t = 10)]
    min_chars: usize,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Auto,
    Direct,
    Ocr,
}

impl From<ModeArg> for ExtractionMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Auto => ExtractionMode::Auto,
            ModeArg::Direct => ExtractionMode::Direct,
            ModeArg::Ocr => ExtractionMode::Ocr,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let runs_job = matches!(
        cli.command,
        Command::Convert { .. } | Command::Tables { .. } | Command::Split { .. }
    );
    let show_progress = runs_job && !g.quiet && !g.no_progress && !g.json;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    match &cli.command {
        Command::Convert { inputs, output, ocr } => {
            let config = build_config(g, Some(ocr), SheetMode::Tables, progress_cb)?;
            let job = convert(inputs, &config).await.context("Conversion failed")?;
            deliver(g, &job, output.clone()).await?;
        }
        Command::Tables {
            inputs,
            output,
            full_structure,
        } => {
            let sheet_mode = if *full_structure {
                SheetMode::FullStructure
            } else {
                SheetMode::Tables
            };
            let config = build_config(g, None, sheet_mode, progress_cb)?;
            let job = extract_tables(inputs, &config)
                .await
                .context("Table extraction failed")?;
            deliver(g, &job, output.clone()).await?;
        }
        Command::Split { input, ranges, output } => {
            let config = build_config(g, None, SheetMode::Tables, progress_cb)?;
            let job = split(input, ranges.as_str(), &config)
                .await
                .context("Split failed")?;
            for skipped in &job.skipped_ranges {
                if !g.quiet {
                    eprintln!("  {} skipped {}", yellow("⚠"), skipped);
                }
            }
            deliver(g, &job, output.clone()).await?;
        }
        Command::Inspect { input } => {
            let config = build_config(g, None, SheetMode::Tables, None)?;
            let info = inspect(input, &config).await.context("Failed to inspect PDF")?;
            if g.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
                );
            } else {
                println!("File:         {}", info.name);
                println!("Pages:        {}", info.page_count);
                println!("Text layer:   {}", if info.has_text { "yes" } else { "no" });
                println!("Auto mode:    {}", info.auto_strategy);
            }
        }
        Command::Langs { lang } => {
            let mut config = build_config(g, None, SheetMode::Tables, None)?;
            config.languages = edgequake_pdfconvert::LanguageSet::parse(lang);
            let installed = installed_languages(&config).context("Failed to query tesseract")?;
            let negotiation = edgequake_pdfconvert::pipeline::language::resolve(&config.languages, installed);
            if g.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&negotiation).context("Failed to serialize languages")?
                );
            } else {
                println!(
                    "Installed:    {}",
                    negotiation.installed.iter().cloned().collect::<Vec<_>>().join(", ")
                );
                println!("Requested:    {}", config.languages);
                if negotiation.degraded() {
                    println!("Missing:      {}", red(&negotiation.missing.join(", ")));
                }
                println!("Effective:    {}", bold(&negotiation.effective.to_string()));
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    g: &GlobalArgs,
    ocr: Option<&OcrArgs>,
    sheet_mode: SheetMode,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .sheet_mode(sheet_mode)
        .download_timeout_secs(g.download_timeout);

    if let Some(ocr) = ocr {
        builder = builder
            .mode(ocr.mode.into())
            .languages(&ocr.lang)
            .dpi(ocr.dpi)
            .min_text_chars(ocr.min_chars);
    }
    if let Some(ref cmd) = g.tesseract {
        builder = builder.tesseract_cmd(cmd.clone());
    }
    if let Some(ref dir) = g.pdfium_lib {
        builder = builder.pdfium_lib_path(dir.clone());
    }
    if let Some(ref pwd) = g.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref dir) = g.work_dir {
        builder = builder.work_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write the artifact and print a summary (or the JSON report).
async fn deliver(g: &GlobalArgs, job: &JobOutput, output: Option<PathBuf>) -> Result<()> {
    let dest = output.unwrap_or_else(|| PathBuf::from("."));
    let path = write_artifact(&job.artifact, &dest)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;

    if g.json {
        let json = serde_json::to_string_pretty(job).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }

    if !g.quiet {
        for doc in job.documents.iter().filter(|d| !d.succeeded()) {
            if let Some(ref e) = doc.error {
                eprintln!("  {} {}", red("✗"), e);
            }
        }
        eprintln!(
            "{}  {}/{} document(s)  {} pages ({} embedded)  {}ms  →  {}",
            if job.stats.failed_documents == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            job.stats.converted_documents,
            job.stats.total_documents,
            job.stats.total_pages,
            job.stats.embedded_pages,
            job.stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
    }
    Ok(())
}
