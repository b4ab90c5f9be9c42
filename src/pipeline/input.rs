//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! ## Why download to a temp file?
//!
//! pdfium requires a file-system path; it cannot stream from a byte buffer.
//! Downloading to a `TempDir` gives us a path pdfium can open while ensuring
//! cleanup happens automatically when `ResolvedInput` is dropped, even if
//! the process panics. We validate the PDF magic bytes (`%PDF`) before
//! returning so callers get a meaningful error rather than a pdfium crash.

use crate::error::ConvertError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A document handed to the synchronous pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInput {
    /// Display name, used for reports and output naming.
    pub name: String,
    pub path: PathBuf,
}

impl JobInput {
    /// Input named after the file name of `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = display_name(&path);
        Self { name, path }
    }
}

/// The resolved input: a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL. The `TempDir` holding the download lives as long as
    /// this value, so the file survives until the job is done with it.
    Downloaded { input: JobInput, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { input, .. } => &input.path,
        }
    }

    pub fn job_input(&self) -> JobInput {
        match self {
            ResolvedInput::Local(p) => JobInput::from_path(p),
            ResolvedInput::Downloaded { input, .. } => input.clone(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file path.
///
/// URLs are downloaded into a temp directory under `work_dir` (system temp
/// when `None`); local files are validated in place.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
    work_dir: Option<&Path>,
) -> Result<ResolvedInput, ConvertError> {
    if is_url(input) {
        let body = fetch(input, timeout_secs).await?;
        store_download(input, &body, work_dir)
    } else {
        resolve_local(Path::new(input)).map(ResolvedInput::Local)
    }
}

/// Validate a local file: it exists, is readable and starts with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<PathBuf, ConvertError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(ConvertError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut head = [0u8; 4];
            if f.read_exact(&mut head).is_ok() {
                check_magic(&head).map_err(|magic| ConvertError::NotAPdf { path: path.clone(), magic })?;
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ConvertError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ConvertError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// `Err` carries the first four bytes when they are not `%PDF`. Shorter
/// input passes; pdfium reports it as corrupt.
fn check_magic(head: &[u8]) -> Result<(), [u8; 4]> {
    match head.get(..4) {
        Some(magic) if magic != b"%PDF" => {
            let mut found = [0u8; 4];
            found.copy_from_slice(magic);
            Err(found)
        }
        _ => Ok(()),
    }
}

/// GET `url` and return the body of a successful response.
async fn fetch(url: &str, timeout_secs: u64) -> Result<Vec<u8>, ConvertError> {
    info!("Downloading PDF from: {}", url);
    let failed = |reason: String| ConvertError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| match e.status() {
            _ if e.is_timeout() => ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            },
            Some(status) => failed(format!("HTTP {status}")),
            None => failed(e.to_string()),
        })?;

    let body = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    Ok(body.to_vec())
}

/// Write a downloaded body into a fresh temp directory, named after the
/// last segment of `url`.
fn store_download(url: &str, body: &[u8], work_dir: Option<&Path>) -> Result<ResolvedInput, ConvertError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("pdfconvert-download-");
    let temp_dir = match work_dir {
        Some(dir) => std::fs::create_dir_all(dir).and_then(|()| builder.tempdir_in(dir)),
        None => builder.tempdir(),
    }
    .map_err(|e| ConvertError::Internal(format!("cannot create download directory: {e}")))?;

    let input = JobInput {
        name: filename_from_url(url),
        path: temp_dir.path().join(filename_from_url(url)),
    };
    check_magic(body).map_err(|magic| ConvertError::NotAPdf {
        path: input.path.clone(),
        magic,
    })?;
    std::fs::write(&input.path, body)
        .map_err(|e| ConvertError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", body.len(), input.path.display());
    Ok(ResolvedInput::Downloaded {
        input,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
