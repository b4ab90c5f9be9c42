//! Minimal SpreadsheetML (`.xlsx`) writer.
//!
//! Every cell is written as an inline string, so no shared-string table is
//! needed. Sheet names are sanitised to Excel's rules (at most 31 chars,
//! none of `[]:*?/\`, unique ignoring case).

use crate::error::WriterError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const MAX_SHEET_NAME: usize = 31;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

/// A named grid of text cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// An ordered list of sheets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Serialise as an `.xlsx` package. An empty workbook gets one blank
    /// sheet, since a workbook without sheets does not open.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, WriterError> {
        let blank = [Sheet::new("Sheet1", Vec::new())];
        let sheets: &[Sheet] = if self.sheets.is_empty() {
            &blank
        } else {
            &self.sheets
        };
        let names = unique_sheet_names(sheets.iter().map(|s| s.name.as_str()));

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(&content_types(sheets.len())?)?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(&relationships(&[(
            "rId1".to_string(),
            REL_DOCUMENT,
            "xl/workbook.xml".to_string(),
        )])?)?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(&workbook_xml(&names)?)?;

        let mut rels: Vec<(String, &str, String)> = (0..sheets.len())
            .map(|i| {
                (
                    format!("rId{}", i + 1),
                    REL_WORKSHEET,
                    format!("worksheets/sheet{}.xml", i + 1),
                )
            })
            .collect();
        rels.push((
            format!("rId{}", sheets.len() + 1),
            REL_STYLES,
            "styles.xml".to_string(),
        ));
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(&relationships(&rels)?)?;

        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(STYLES.as_bytes())?;

        for (i, sheet) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
            zip.write_all(&sheet_xml(sheet)?)?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

/// Excel column letters for a 0-based index: 0 → A, 25 → Z, 26 → AA.
pub fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Sanitise one sheet name: forbidden characters become `_`, blank names
/// become `Sheet`, length is capped at 31 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('\'');
    let base = if trimmed.is_empty() { "Sheet" } else { trimmed };
    base.chars().take(MAX_SHEET_NAME).collect()
}

fn unique_sheet_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let base = sanitize_sheet_name(name);
        let mut candidate = base.clone();
        let mut n = 2;
        while out.iter().any(|o| o.eq_ignore_ascii_case(&candidate)) {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME - suffix.chars().count();
            candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn xml_writer() -> Result<XmlWriter, WriterError> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(w)
}

fn open_tag(w: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<(), WriterError> {
    let mut el = BytesStart::new(name);
    for &attr in attrs {
        el.push_attribute(attr);
    }
    w.write_event(Event::Start(el))?;
    Ok(())
}

fn empty_tag(w: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<(), WriterError> {
    let mut el = BytesStart::new(name);
    for &attr in attrs {
        el.push_attribute(attr);
    }
    w.write_event(Event::Empty(el))?;
    Ok(())
}

fn close_tag(w: &mut XmlWriter, name: &str) -> Result<(), WriterError> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn content_types(sheet_count: usize) -> Result<Vec<u8>, WriterError> {
    let mut w = xml_writer()?;
    open_tag(
        &mut w,
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    )?;
    empty_tag(
        &mut w,
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    empty_tag(
        &mut w,
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    empty_tag(
        &mut w,
        "Override",
        &[
            ("PartName", "/xl/workbook.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
            ),
        ],
    )?;
    empty_tag(
        &mut w,
        "Override",
        &[
            ("PartName", "/xl/styles.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml",
            ),
        ],
    )?;
    for i in 1..=sheet_count {
        let part = format!("/xl/worksheets/sheet{i}.xml");
        empty_tag(
            &mut w,
            "Override",
            &[
                ("PartName", part.as_str()),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
                ),
            ],
        )?;
    }
    close_tag(&mut w, "Types")?;
    Ok(w.into_inner().into_inner())
}

fn relationships(rels: &[(String, &str, String)]) -> Result<Vec<u8>, WriterError> {
    let mut w = xml_writer()?;
    open_tag(&mut w, "Relationships", &[("xmlns", NS_RELS)])?;
    for (id, kind, target) in rels {
        empty_tag(
            &mut w,
            "Relationship",
            &[("Id", id.as_str()), ("Type", *kind), ("Target", target.as_str())],
        )?;
    }
    close_tag(&mut w, "Relationships")?;
    Ok(w.into_inner().into_inner())
}

fn workbook_xml(names: &[String]) -> Result<Vec<u8>, WriterError> {
    let mut w = xml_writer()?;
    open_tag(&mut w, "workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_R)])?;
    open_tag(&mut w, "sheets", &[])?;
    for (i, name) in names.iter().enumerate() {
        let id = (i + 1).to_string();
        let rel = format!("rId{}", i + 1);
        empty_tag(
            &mut w,
            "sheet",
            &[("name", name.as_str()), ("sheetId", id.as_str()), ("r:id", rel.as_str())],
        )?;
    }
    close_tag(&mut w, "sheets")?;
    close_tag(&mut w, "workbook")?;
    Ok(w.into_inner().into_inner())
}

fn sheet_xml(sheet: &Sheet) -> Result<Vec<u8>, WriterError> {
    let mut w = xml_writer()?;
    open_tag(&mut w, "worksheet", &[("xmlns", NS_MAIN)])?;
    open_tag(&mut w, "sheetData", &[])?;
    for (r, row) in sheet.rows.iter().enumerate() {
        let row_ref = (r + 1).to_string();
        open_tag(&mut w, "row", &[("r", row_ref.as_str())])?;
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let cell_ref = format!("{}{}", column_letters(c), r + 1);
            open_tag(&mut w, "c", &[("r", cell_ref.as_str()), ("t", "inlineStr")])?;
            open_tag(&mut w, "is", &[])?;
            open_tag(&mut w, "t", &[("xml:space", "preserve")])?;
            let text: String = value
                .chars()
                .filter(|&c| c == '\t' || c == '\n' || c >= ' ')
                .collect();
            w.write_event(Event::Text(BytesText::new(&text)))?;
            close_tag(&mut w, "t")?;
            close_tag(&mut w, "is")?;
            close_tag(&mut w, "c")?;
        }
        close_tag(&mut w, "row")?;
    }
    close_tag(&mut w, "sheetData")?;
    close_tag(&mut w, "worksheet")?;
    Ok(w.into_inner().into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn column_letters_roll_over() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn sheet_names_are_sanitized_and_unique() {
        assert_eq!(sanitize_sheet_name("Q1/Q2 [draft]"), "Q1_Q2 _draft_");
        assert_eq!(sanitize_sheet_name("   "), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 31);

        let names = unique_sheet_names(["Table 1", "table 1", "Table 1"].into_iter());
        assert_eq!(names, vec!["Table 1", "table 1 (2)", "Table 1 (3)"]);
    }

    #[test]
    fn workbook_writes_inline_strings() {
        let mut book = Workbook::default();
        book.push(Sheet::new(
            "Table 1",
            vec![
                vec!["Item".into(), "Qty".into()],
                vec!["Bolts & nuts".into(), "".into()],
            ],
        ));
        let bytes = book.to_xlsx().unwrap();

        let sheet = entry(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<c r="B1" t="inlineStr">"#));
        assert!(sheet.contains("Bolts &amp; nuts"));
        assert!(!sheet.contains(r#"r="B2""#));

        let workbook = entry(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Table 1""#));
    }

    #[test]
    fn empty_workbook_still_has_a_sheet() {
        let bytes = Workbook::default().to_xlsx().unwrap();
        let workbook = entry(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Sheet1""#));
    }

    #[test]
    fn output_is_deterministic() {
        let mut book = Workbook::default();
        book.push(Sheet::new("Page 1", vec![vec!["a".into()]]));
        assert_eq!(book.to_xlsx().unwrap(), book.to_xlsx().unwrap());
    }
}
