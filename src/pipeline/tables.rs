//! Spreadsheet path: tables (or text) → [`Workbook`].
//!
//! Strategy order:
//!
//! 1. [`SheetMode::FullStructure`]: one sheet per page from the extractor's
//!    page layout. Any failure abandons this strategy for the whole
//!    document and continues with step 2.
//! 2. Table extraction: one sheet per detected table.
//! 3. No tables: one sheet per page holding the page text, one line per
//!    row in column A, blank lines dropped.

use crate::config::SheetMode;
use crate::error::RenderError;
use crate::pipeline::postprocess::text_lines;
use crate::pipeline::render::RenderedDocument;
use crate::pipeline::xlsx::{Sheet, Workbook};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A detected table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// 1-indexed page the table was found on.
    pub page: usize,
    pub rows: Vec<Vec<String>>,
}

/// Table extraction seam.
pub trait TableExtractor {
    /// All tables in the document, in page order. May be empty.
    fn extract_tables(&self, doc: &dyn RenderedDocument) -> Result<Vec<Table>, RenderError>;

    /// Full line layout of page `index` (0-based) as rows of cells.
    fn page_layout(&self, doc: &dyn RenderedDocument, index: usize) -> Result<Vec<Vec<String>>, RenderError>;
}

/// Which strategy produced the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSource {
    FullStructure,
    Tables,
    TextLines,
}

static RE_CELL_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t+| {2,}").unwrap());

/// Split one line into cells on tabs or runs of two or more spaces.
pub fn split_cells(line: &str) -> Vec<String> {
    RE_CELL_GAP
        .split(line.trim())
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Text-layout table detector: consecutive lines with at least two cells
/// form a table when there are at least two of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTableExtractor;

impl WhitespaceTableExtractor {
    fn tables_in_page(page: usize, text: &str) -> Vec<Table> {
        let mut tables = Vec::new();
        let mut run: Vec<Vec<String>> = Vec::new();

        let mut flush = |run: &mut Vec<Vec<String>>| {
            if run.len() >= 2 {
                tables.push(Table {
                    page,
                    rows: std::mem::take(run),
                });
            } else {
                run.clear();
            }
        };

        for line in text_lines(text) {
            let cells = split_cells(&line);
            if cells.len() >= 2 {
                run.push(cells);
            } else {
                flush(&mut run);
            }
        }
        flush(&mut run);
        tables
    }
}

impl TableExtractor for WhitespaceTableExtractor {
    fn extract_tables(&self, doc: &dyn RenderedDocument) -> Result<Vec<Table>, RenderError> {
        let mut tables = Vec::new();
        for index in 0..doc.page_count() {
            let text = doc.text_of(index)?;
            tables.extend(Self::tables_in_page(index + 1, &text));
        }
        Ok(tables)
    }

    fn page_layout(&self, doc: &dyn RenderedDocument, index: usize) -> Result<Vec<Vec<String>>, RenderError> {
        let text = doc.text_of(index)?;
        Ok(text_lines(&text).iter().map(|line| split_cells(line)).collect())
    }
}

/// Build the workbook for one document.
///
/// Only the final text-line fallback can fail; its error means the
/// document's text layer is unreadable.
pub fn build_workbook(
    doc: &dyn RenderedDocument,
    extractor: &dyn TableExtractor,
    mode: SheetMode,
) -> Result<(Workbook, SheetSource), RenderError> {
    if mode == SheetMode::FullStructure {
        match full_structure(doc, extractor) {
            Ok(book) => return Ok((book, SheetSource::FullStructure)),
            Err(e) => warn!("Full-structure extraction failed ({}); falling back to tables", e),
        }
    }

    let tables = extractor.extract_tables(doc).unwrap_or_else(|e| {
        warn!("Table extraction failed ({}); falling back to text lines", e);
        Vec::new()
    });

    if !tables.is_empty() {
        info!("Detected {} table(s)", tables.len());
        let mut book = Workbook::default();
        for (i, table) in tables.into_iter().enumerate() {
            book.push(Sheet::new(
                format!("Table {} (p{})", i + 1, table.page),
                table.rows,
            ));
        }
        return Ok((book, SheetSource::Tables));
    }

    debug!("No tables found; writing text lines");
    let mut book = Workbook::default();
    for index in 0..doc.page_count() {
        let rows: Vec<Vec<String>> = text_lines(&doc.text_of(index)?)
            .into_iter()
            .map(|line| vec![line])
            .collect();
        if !rows.is_empty() {
            book.push(Sheet::new(format!("Page {}", index + 1), rows));
        }
    }
    Ok((book, SheetSource::TextLines))
}

fn full_structure(doc: &dyn RenderedDocument, extractor: &dyn TableExtractor) -> Result<Workbook, RenderError> {
    let mut book = Workbook::default();
    for index in 0..doc.page_count() {
        let rows = extractor.page_layout(doc, index)?;
        book.push(Sheet::new(format!("Page {}", index + 1), rows));
    }
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::path::Path;

    struct TextDoc(Vec<Result<&'static str, ()>>);

    impl RenderedDocument for TextDoc {
        fn page_count(&self) -> usize {
            self.0.len()
        }
        fn text_of(&self, index: usize) -> Result<String, RenderError> {
            self.0[index].map(str::to_string).map_err(|()| RenderError {
                page: index + 1,
                detail: "no text layer".into(),
            })
        }
        fn raster_of(&self, index: usize, _dpi: u32) -> Result<DynamicImage, RenderError> {
            Err(RenderError {
                page: index + 1,
                detail: "unused".into(),
            })
        }
        fn copy_pages(&self, _indices: &[usize], _dest: &Path) -> Result<(), RenderError> {
            Ok(())
        }
    }

    const INVOICE: &str = "ACME Corp\n\nItem      Qty   Price\nBolts     10    2.50\nNuts\t4\t0.10\n\nThank you";

    #[test]
    fn split_cells_on_wide_gaps_only() {
        assert_eq!(split_cells("Item      Qty   Price"), vec!["Item", "Qty", "Price"]);
        assert_eq!(split_cells("Net total due"), vec!["Net total due"]);
        assert_eq!(split_cells("a\tb"), vec!["a", "b"]);
    }

    #[test]
    fn detects_table_runs() {
        let tables = WhitespaceTableExtractor::tables_in_page(1, INVOICE);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].rows[2], vec!["Nuts", "4", "0.10"]);
    }

    #[test]
    fn single_multi_cell_row_is_not_a_table() {
        assert!(WhitespaceTableExtractor::tables_in_page(1, "Name   Value\nplain text").is_empty());
    }

    #[test]
    fn tables_mode_writes_one_sheet_per_table() {
        let doc = TextDoc(vec![Ok(INVOICE)]);
        let (book, source) = build_workbook(&doc, &WhitespaceTableExtractor, SheetMode::Tables).unwrap();
        assert_eq!(source, SheetSource::Tables);
        assert_eq!(book.sheets.len(), 1);
        assert_eq!(book.sheets[0].name, "Table 1 (p1)");
    }

    #[test]
    fn no_tables_falls_back_to_lines() {
        let doc = TextDoc(vec![Ok("Dear reader,\n\n  thanks.\n"), Ok("")]);
        let (book, source) = build_workbook(&doc, &WhitespaceTableExtractor, SheetMode::Tables).unwrap();
        assert_eq!(source, SheetSource::TextLines);
        assert_eq!(book.sheets.len(), 1);
        assert_eq!(
            book.sheets[0].rows,
            vec![vec!["Dear reader,".to_string()], vec!["  thanks.".to_string()]]
        );
    }

    #[test]
    fn full_structure_one_sheet_per_page() {
        let doc = TextDoc(vec![Ok(INVOICE), Ok("second page")]);
        let (book, source) =
            build_workbook(&doc, &WhitespaceTableExtractor, SheetMode::FullStructure).unwrap();
        assert_eq!(source, SheetSource::FullStructure);
        assert_eq!(book.sheets.len(), 2);
        assert_eq!(book.sheets[0].rows[0], vec!["ACME Corp"]);
        assert_eq!(book.sheets[1].name, "Page 2");
    }

    struct BrokenLayout;

    impl TableExtractor for BrokenLayout {
        fn extract_tables(&self, doc: &dyn RenderedDocument) -> Result<Vec<Table>, RenderError> {
            WhitespaceTableExtractor.extract_tables(doc)
        }
        fn page_layout(&self, _doc: &dyn RenderedDocument, index: usize) -> Result<Vec<Vec<String>>, RenderError> {
            Err(RenderError {
                page: index + 1,
                detail: "layout engine crashed".into(),
            })
        }
    }

    #[test]
    fn full_structure_failure_falls_back_to_tables() {
        let doc = TextDoc(vec![Ok(INVOICE)]);
        let (_, source) = build_workbook(&doc, &BrokenLayout, SheetMode::FullStructure).unwrap();
        assert_eq!(source, SheetSource::Tables);
    }

    #[test]
    fn unreadable_text_fails_the_fallback() {
        let doc = TextDoc(vec![Err(())]);
        assert!(build_workbook(&doc, &WhitespaceTableExtractor, SheetMode::Tables).is_err());
    }
}
