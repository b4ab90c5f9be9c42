//! Document assembly: page outcomes → writer calls.
//!
//! Pages are appended strictly in order and every page, whatever its
//! outcome, is followed by a page break. An embedded page's raster is
//! written to a scratch PNG for the writer and the file is removed before
//! the next page starts.

use crate::error::WriterError;
use crate::output::PageKind;
use crate::pipeline::encode::write_png;
use crate::pipeline::recognize::PageOutcome;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Heading level used for every page heading.
pub const PAGE_HEADING_LEVEL: u8 = 2;
/// Heading level for pages whose image was embedded.
pub const EMBEDDED_HEADING_LEVEL: u8 = 3;
/// Paragraph placed above an embedded page image.
pub const EMBEDDED_WARNING: &str =
    "Warning: text recognition produced too little text on this page, so the page image is embedded instead.";

/// Output document sink.
pub trait DocumentWriter {
    fn add_heading(&mut self, text: &str, level: u8);
    fn add_paragraph(&mut self, text: &str);
    /// Embed the image at `path`. The file may be deleted once this returns.
    fn add_image(&mut self, path: &Path) -> Result<(), WriterError>;
    fn add_page_break(&mut self);
    fn save(&mut self, path: &Path) -> Result<(), WriterError>;
    /// File extension of saved documents, without the dot.
    fn extension(&self) -> &'static str;
}

/// Creates a fresh writer per document.
pub type WriterFactory = dyn Fn() -> Box<dyn DocumentWriter>;

/// Heading for a recognised page.
pub fn page_heading(page_num: usize) -> String {
    format!("Page {page_num}")
}

/// Heading for a page whose raster was embedded.
pub fn embedded_heading(page_num: usize) -> String {
    format!("Page {page_num} (image embedded: OCR produced little or no text)")
}

/// Appends pages to a writer in order.
pub struct Assembler<'w> {
    writer: &'w mut dyn DocumentWriter,
    scratch_dir: PathBuf,
    pages: usize,
}

impl<'w> Assembler<'w> {
    pub fn new(writer: &'w mut dyn DocumentWriter, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            scratch_dir: scratch_dir.into(),
            pages: 0,
        }
    }

    /// Append one OCR page.
    pub fn push_outcome(&mut self, page_num: usize, outcome: &PageOutcome) -> Result<PageKind, WriterError> {
        let kind = match outcome {
            PageOutcome::Recognized { lines, .. } => {
                self.writer.add_heading(&page_heading(page_num), PAGE_HEADING_LEVEL);
                for line in lines.iter().filter(|l| !l.trim().is_empty()) {
                    self.writer.add_paragraph(line);
                }
                PageKind::Recognized
            }
            PageOutcome::Embedded { image } => {
                self.writer
                    .add_heading(&embedded_heading(page_num), EMBEDDED_HEADING_LEVEL);
                self.writer.add_paragraph(EMBEDDED_WARNING);

                let path = self.scratch_dir.join(format!("page-{page_num}.png"));
                let written = write_png(image, &path)
                    .map_err(|e| WriterError::Image {
                        path: path.clone(),
                        detail: e.to_string(),
                    })
                    .and_then(|()| self.writer.add_image(&path));
                if let Err(e) = std::fs::remove_file(&path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove {}: {}", path.display(), e);
                    }
                }
                written?;
                PageKind::Embedded
            }
        };
        self.finish_page(page_num);
        Ok(kind)
    }

    /// Append one page of embedded text, one paragraph per line.
    pub fn push_text(&mut self, page_num: usize, lines: &[String]) {
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            self.writer.add_paragraph(line);
        }
        self.finish_page(page_num);
    }

    fn finish_page(&mut self, page_num: usize) {
        self.writer.add_page_break();
        self.pages += 1;
        debug!("Assembled page {}", page_num);
    }

    /// Pages appended so far.
    pub fn pages(&self) -> usize {
        self.pages
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::recognize::{Attempt, AttemptSource, RecognitionProfile};
    use image::{DynamicImage, GrayImage, Luma};

    /// Writer that records every call.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingWriter {
        pub calls: Vec<String>,
    }

    impl DocumentWriter for RecordingWriter {
        fn add_heading(&mut self, text: &str, level: u8) {
            self.calls.push(format!("h{level}:{text}"));
        }
        fn add_paragraph(&mut self, text: &str) {
            self.calls.push(format!("p:{text}"));
        }
        fn add_image(&mut self, path: &Path) -> Result<(), WriterError> {
            assert!(path.exists(), "image must exist while being embedded");
            self.calls.push("img".into());
            Ok(())
        }
        fn add_page_break(&mut self) {
            self.calls.push("break".into());
        }
        fn save(&mut self, _path: &Path) -> Result<(), WriterError> {
            Ok(())
        }
        fn extension(&self) -> &'static str {
            "rec"
        }
    }

    fn recognized(lines: &[&str]) -> PageOutcome {
        PageOutcome::Recognized {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            attempt: Attempt {
                source: AttemptSource::Processed,
                profile: RecognitionProfile::GeneralBlock,
            },
        }
    }

    #[test]
    fn pages_keep_order_and_each_ends_with_break() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RecordingWriter::default();
        let mut asm = Assembler::new(&mut writer, dir.path());

        asm.push_outcome(1, &recognized(&["Line one", "Line two"])).unwrap();
        let kind = asm
            .push_outcome(
                2,
                &PageOutcome::Embedded {
                    image: DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([0]))),
                },
            )
            .unwrap();
        assert_eq!(kind, PageKind::Embedded);
        asm.push_outcome(3, &recognized(&["Three"])).unwrap();
        assert_eq!(asm.pages(), 3);

        assert_eq!(
            writer.calls,
            vec![
                "h2:Page 1".to_string(),
                "p:Line one".into(),
                "p:Line two".into(),
                "break".into(),
                format!("h3:{}", embedded_heading(2)),
                format!("p:{EMBEDDED_WARNING}"),
                "img".into(),
                "break".into(),
                "h2:Page 3".into(),
                "p:Three".into(),
                "break".into(),
            ]
        );
        // scratch image removed after embedding
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn direct_text_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RecordingWriter::default();
        let mut asm = Assembler::new(&mut writer, dir.path());
        asm.push_text(1, &["a".to_string(), "  ".to_string(), "b".to_string()]);
        asm.push_text(2, &[]);
        assert_eq!(writer.calls, vec!["p:a", "p:b", "break", "break"]);
    }
}
