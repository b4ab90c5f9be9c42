//! Delivery packaging: one artifact goes out as-is, several go into a zip.

use crate::error::ConvertError;
use crate::output::OutputArtifact;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Package name for converted documents.
pub const CONVERTED_ZIP: &str = "converted.zip";
/// Package name for spreadsheets.
pub const TABLES_ZIP: &str = "tables.zip";
/// Package name for split parts.
pub const SPLIT_ZIP: &str = "split_pdfs.zip";

/// Deliver `artifacts`: the single artifact itself, or a zip named
/// `package_name` holding all of them in order.
pub fn deliver(
    mut artifacts: Vec<OutputArtifact>,
    package_name: &str,
) -> Result<OutputArtifact, ConvertError> {
    match artifacts.len() {
        0 => Err(ConvertError::Internal("nothing to package".into())),
        1 => Ok(artifacts.remove(0)),
        n => {
            info!("Packaging {} artifacts into {}", n, package_name);
            let bytes = zip_artifacts(&artifacts).map_err(|e| ConvertError::PackageFailed {
                name: package_name.to_string(),
                detail: e.to_string(),
            })?;
            Ok(OutputArtifact::new(package_name, bytes))
        }
    }
}

fn zip_artifacts(artifacts: &[OutputArtifact]) -> zip::result::ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    for artifact in artifacts {
        zip.start_file(artifact.file_name.as_str(), options)?;
        zip.write_all(&artifact.bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Hands out artifact names derived from input names, unique within a job.
///
/// `report.pdf` → `report.docx`; a second `report.pdf` → `report_2.docx`.
#[derive(Debug, Default)]
pub struct ArtifactNamer {
    taken: HashSet<String>,
}

impl ArtifactNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_for(&mut self, input_name: &str, extension: &str) -> String {
        let stem = Path::new(input_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "document".to_string());
        let stem = sanitize_stem(&stem);

        let mut candidate = format!("{stem}.{extension}");
        let mut n = 2;
        while !self.taken.insert(candidate.to_lowercase()) {
            candidate = format!("{stem}_{n}.{extension}");
            n += 1;
        }
        candidate
    }
}

// Keep names safe inside a zip and on every filesystem.
fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn single_artifact_is_delivered_directly() {
        let a = OutputArtifact::new("report.docx", vec![1, 2, 3]);
        let out = deliver(vec![a.clone()], CONVERTED_ZIP).unwrap();
        assert_eq!(out, a);
    }

    #[test]
    fn several_artifacts_are_zipped_in_order() {
        let parts = vec![
            OutputArtifact::new("part_1.pdf", b"%PDF-1".to_vec()),
            OutputArtifact::new("part_3.pdf", b"%PDF-3".to_vec()),
        ];
        let out = deliver(parts, SPLIT_ZIP).unwrap();
        assert_eq!(out.file_name, "split_pdfs.zip");

        let mut archive = zip::ZipArchive::new(Cursor::new(out.bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        // file_names() order is not guaranteed; check by index instead
        assert_eq!(names.len(), 2);
        let mut first = String::new();
        archive.by_index(0).unwrap().read_to_string(&mut first).unwrap();
        assert_eq!(first, "%PDF-1");
        assert_eq!(archive.by_index(1).unwrap().name(), "part_3.pdf");
    }

    #[test]
    fn zip_is_deterministic() {
        let build = || {
            deliver(
                vec![
                    OutputArtifact::new("a.docx", vec![0; 64]),
                    OutputArtifact::new("b.docx", vec![1; 64]),
                ],
                CONVERTED_ZIP,
            )
            .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn empty_is_an_error() {
        assert!(deliver(Vec::new(), TABLES_ZIP).is_err());
    }

    #[test]
    fn namer_dedupes_stems() {
        let mut namer = ArtifactNamer::new();
        assert_eq!(namer.name_for("report.pdf", "docx"), "report.docx");
        assert_eq!(namer.name_for("Report.PDF", "docx"), "Report_2.docx");
        assert_eq!(namer.name_for("report.pdf", "docx"), "report_3.docx");
        assert_eq!(namer.name_for("", "xlsx"), "document.xlsx");
        assert_eq!(namer.name_for("a:b.pdf", "docx"), "a_b.docx");
    }
}
