//! Extraction strategy selection.
//!
//! The decision is made once per document, never per page: in `auto` mode a
//! single page with a text layer sends the whole document down the direct
//! path, even if every other page is a scan.

use crate::config::ExtractionMode;
use crate::pipeline::render::RenderedDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// The path a document takes through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Use the embedded text layer.
    Direct,
    /// Rasterise, preprocess and recognise.
    Ocr,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => f.write_str("direct"),
            Strategy::Ocr => f.write_str("ocr"),
        }
    }
}

/// Choose a strategy from the mode and a "page has text" predicate.
///
/// The predicate is only consulted in [`ExtractionMode::Auto`], and stops at
/// the first page that has text.
pub fn classify<F>(mode: ExtractionMode, page_count: usize, mut page_has_text: F) -> Strategy
where
    F: FnMut(usize) -> bool,
{
    match mode {
        ExtractionMode::Direct => Strategy::Direct,
        ExtractionMode::Ocr => Strategy::Ocr,
        ExtractionMode::Auto => {
            if (0..page_count).any(&mut page_has_text) {
                Strategy::Direct
            } else {
                Strategy::Ocr
            }
        }
    }
}

/// Choose a strategy for an opened document.
pub fn select(mode: ExtractionMode, doc: &dyn RenderedDocument) -> Strategy {
    classify(mode, doc.page_count(), |index| page_has_text(doc, index))
}

/// True if any page yields non-blank embedded text.
pub fn has_extractable_text(doc: &dyn RenderedDocument) -> bool {
    (0..doc.page_count()).any(|index| page_has_text(doc, index))
}

// A page whose text layer cannot be read counts as image-only.
fn page_has_text(doc: &dyn RenderedDocument, index: usize) -> bool {
    match doc.text_of(index) {
        Ok(text) => {
            let found = !text.trim().is_empty();
            debug!("Page {}: text layer {}", index + 1, if found { "present" } else { "empty" });
            found
        }
        Err(e) => {
            warn!("Text probe failed on {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use image::DynamicImage;
    use std::cell::Cell;
    use std::path::Path;

    struct TextPages {
        texts: Vec<Option<&'static str>>,
        probes: Cell<usize>,
    }

    impl RenderedDocument for TextPages {
        fn page_count(&self) -> usize {
            self.texts.len()
        }

        fn text_of(&self, index: usize) -> Result<String, RenderError> {
            self.probes.set(self.probes.get() + 1);
            self.texts[index].map(str::to_string).ok_or(RenderError {
                page: index + 1,
                detail: "broken text layer".into(),
            })
        }

        fn raster_of(&self, index: usize, _dpi: u32) -> Result<DynamicImage, RenderError> {
            Err(RenderError {
                page: index + 1,
                detail: "not used".into(),
            })
        }

        fn copy_pages(&self, _indices: &[usize], _dest: &Path) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn doc(texts: Vec<Option<&'static str>>) -> TextPages {
        TextPages {
            texts,
            probes: Cell::new(0),
        }
    }

    #[test]
    fn forced_modes_ignore_content() {
        let d = doc(vec![Some("")]);
        assert_eq!(select(ExtractionMode::Direct, &d), Strategy::Direct);
        assert_eq!(select(ExtractionMode::Ocr, &doc(vec![Some("text")])), Strategy::Ocr);
        assert_eq!(d.probes.get(), 0);
    }

    #[test]
    fn auto_one_text_page_selects_direct_for_whole_document() {
        let d = doc(vec![Some(""), Some("  \n"), Some("Invoice 2024"), Some("")]);
        assert_eq!(select(ExtractionMode::Auto, &d), Strategy::Direct);
        // stops probing at the first page with text
        assert_eq!(d.probes.get(), 3);
    }

    #[test]
    fn auto_image_only_selects_ocr() {
        let d = doc(vec![Some(""), Some(" \t\n")]);
        assert_eq!(select(ExtractionMode::Auto, &d), Strategy::Ocr);
    }

    #[test]
    fn unreadable_text_layer_counts_as_empty() {
        let d = doc(vec![None, Some("")]);
        assert_eq!(select(ExtractionMode::Auto, &d), Strategy::Ocr);
        let d = doc(vec![None, Some("body")]);
        assert!(has_extractable_text(&d));
    }

    #[test]
    fn empty_document_goes_to_ocr() {
        assert_eq!(classify(ExtractionMode::Auto, 0, |_| true), Strategy::Ocr);
    }
}
