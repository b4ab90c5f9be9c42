//! Minimal WordprocessingML (`.docx`) writer.
//!
//! Content is buffered as a flat list of blocks and serialised on
//! [`DocumentWriter::save`]. The package holds exactly what is needed for
//! Word and LibreOffice to open it:
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! word/document.xml
//! word/styles.xml            Heading1..3
//! word/_rels/document.xml.rels
//! word/media/imageN.png
//! ```
//!
//! Output is byte-deterministic: entries are written in a fixed order with
//! the zip epoch timestamp, and nothing depends on wall-clock time.

use crate::error::WriterError;
use crate::pipeline::assemble::DocumentWriter;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const EMU_PER_PX: u64 = 9525;
const EMU_PER_INCH: u64 = 914_400;
const MAX_IMAGE_WIDTH_EMU: u64 = 6 * EMU_PER_INCH;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

#[derive(Debug, Clone)]
enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Image { index: usize, cx: u64, cy: u64 },
    PageBreak,
}

/// Buffered `.docx` document.
#[derive(Debug, Default)]
pub struct DocxWriter {
    blocks: Vec<Block>,
    /// PNG payloads, `word/media/image{i+1}.png`.
    media: Vec<Vec<u8>>,
}

impl DocxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialise the package into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriterError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(&relationships(&[("rId1", REL_DOCUMENT, "word/document.xml")])?)?;

        zip.start_file("word/document.xml", options)?;
        zip.write_all(&self.document_xml()?)?;

        zip.start_file("word/styles.xml", options)?;
        zip.write_all(&styles_xml()?)?;

        let targets: Vec<(String, String)> = (0..self.media.len())
            .map(|i| (image_rel_id(i), format!("media/image{}.png", i + 1)))
            .collect();
        let mut rels: Vec<(&str, &str, &str)> = vec![("rId1", REL_STYLES, "styles.xml")];
        rels.extend(
            targets
                .iter()
                .map(|(id, target)| (id.as_str(), REL_IMAGE, target.as_str())),
        );
        zip.start_file("word/_rels/document.xml.rels", options)?;
        zip.write_all(&relationships(&rels)?)?;

        // PNG is already compressed
        let stored = options.compression_method(CompressionMethod::Stored);
        for (i, png) in self.media.iter().enumerate() {
            zip.start_file(format!("word/media/image{}.png", i + 1), stored)?;
            zip.write_all(png)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    fn document_xml(&self) -> Result<Vec<u8>, WriterError> {
        let mut w = Writer::new(Cursor::new(Vec::new()));
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

        let mut root = BytesStart::new("w:document");
        root.push_attribute(("xmlns:w", NS_W));
        root.push_attribute(("xmlns:r", NS_R));
        root.push_attribute(("xmlns:wp", NS_WP));
        root.push_attribute(("xmlns:a", NS_A));
        root.push_attribute(("xmlns:pic", NS_PIC));
        w.write_event(Event::Start(root))?;
        start(&mut w, "w:body", &[])?;

        for block in &self.blocks {
            match block {
                Block::Heading { level, text } => {
                    start(&mut w, "w:p", &[])?;
                    start(&mut w, "w:pPr", &[])?;
                    empty(&mut w, "w:pStyle", &[("w:val", format!("Heading{level}").as_str())])?;
                    end(&mut w, "w:pPr")?;
                    text_run(&mut w, text)?;
                    end(&mut w, "w:p")?;
                }
                Block::Paragraph(text) => {
                    start(&mut w, "w:p", &[])?;
                    text_run(&mut w, text)?;
                    end(&mut w, "w:p")?;
                }
                Block::Image { index, cx, cy } => write_drawing(&mut w, *index, *cx, *cy)?,
                Block::PageBreak => {
                    start(&mut w, "w:p", &[])?;
                    start(&mut w, "w:r", &[])?;
                    empty(&mut w, "w:br", &[("w:type", "page")])?;
                    end(&mut w, "w:r")?;
                    end(&mut w, "w:p")?;
                }
            }
        }

        // A4 portrait, 1 in margins
        start(&mut w, "w:sectPr", &[])?;
        empty(&mut w, "w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
        empty(
            &mut w,
            "w:pgMar",
            &[
                ("w:top", "1440"),
                ("w:right", "1440"),
                ("w:bottom", "1440"),
                ("w:left", "1440"),
                ("w:header", "708"),
                ("w:footer", "708"),
                ("w:gutter", "0"),
            ],
        )?;
        end(&mut w, "w:sectPr")?;

        end(&mut w, "w:body")?;
        end(&mut w, "w:document")?;
        Ok(w.into_inner().into_inner())
    }
}

impl DocumentWriter for DocxWriter {
    fn add_heading(&mut self, text: &str, level: u8) {
        self.blocks.push(Block::Heading {
            level: level.clamp(1, 3),
            text: xml_safe(text),
        });
    }

    fn add_paragraph(&mut self, text: &str) {
        self.blocks.push(Block::Paragraph(xml_safe(text)));
    }

    fn add_image(&mut self, path: &Path) -> Result<(), WriterError> {
        let image_error = |detail: String| WriterError::Image {
            path: path.to_path_buf(),
            detail,
        };
        let (width, height) =
            image::image_dimensions(path).map_err(|e| image_error(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(image_error(format!("empty image {width}x{height}")));
        }
        let png = std::fs::read(path)?;
        let (cx, cy) = fit_width(width, height);

        let index = self.media.len();
        self.media.push(png);
        self.blocks.push(Block::Image { index, cx, cy });
        debug!("Embedded image {} ({}x{} px)", index + 1, width, height);
        Ok(())
    }

    fn add_page_break(&mut self) {
        self.blocks.push(Block::PageBreak);
    }

    fn save(&mut self, path: &Path) -> Result<(), WriterError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "docx"
    }
}

/// Image extent in EMU at 96 px/in, scaled down to at most 6 in wide.
fn fit_width(width: u32, height: u32) -> (u64, u64) {
    let cx = width as u64 * EMU_PER_PX;
    let cy = height as u64 * EMU_PER_PX;
    if cx <= MAX_IMAGE_WIDTH_EMU {
        (cx, cy)
    } else {
        (MAX_IMAGE_WIDTH_EMU, cy * MAX_IMAGE_WIDTH_EMU / cx)
    }
}

fn image_rel_id(index: usize) -> String {
    format!("rId{}", index + 2)
}

// Characters outside the XML 1.0 range make the package unreadable.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\t' || c == '\n' || c >= ' ')
        .collect()
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn start(w: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<(), WriterError> {
    let mut el = BytesStart::new(name);
    for &attr in attrs {
        el.push_attribute(attr);
    }
    w.write_event(Event::Start(el))?;
    Ok(())
}

fn empty(w: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<(), WriterError> {
    let mut el = BytesStart::new(name);
    for &attr in attrs {
        el.push_attribute(attr);
    }
    w.write_event(Event::Empty(el))?;
    Ok(())
}

fn end(w: &mut XmlWriter, name: &str) -> Result<(), WriterError> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn text_run(w: &mut XmlWriter, text: &str) -> Result<(), WriterError> {
    start(w, "w:r", &[])?;
    start(w, "w:t", &[("xml:space", "preserve")])?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    end(w, "w:t")?;
    end(w, "w:r")
}

fn write_drawing(w: &mut XmlWriter, index: usize, cx: u64, cy: u64) -> Result<(), WriterError> {
    let id = (index + 1).to_string();
    let cx = cx.to_string();
    let cy = cy.to_string();
    let name = format!("image{id}.png");
    let rel = image_rel_id(index);

    start(w, "w:p", &[])?;
    start(w, "w:r", &[])?;
    start(w, "w:drawing", &[])?;
    start(
        w,
        "wp:inline",
        &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
    )?;
    empty(w, "wp:extent", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    empty(w, "wp:docPr", &[("id", id.as_str()), ("name", format!("Picture {id}").as_str())])?;
    start(w, "a:graphic", &[])?;
    start(w, "a:graphicData", &[("uri", NS_PIC)])?;
    start(w, "pic:pic", &[])?;

    start(w, "pic:nvPicPr", &[])?;
    empty(w, "pic:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
    empty(w, "pic:cNvPicPr", &[])?;
    end(w, "pic:nvPicPr")?;

    start(w, "pic:blipFill", &[])?;
    empty(w, "a:blip", &[("r:embed", rel.as_str())])?;
    start(w, "a:stretch", &[])?;
    empty(w, "a:fillRect", &[])?;
    end(w, "a:stretch")?;
    end(w, "pic:blipFill")?;

    start(w, "pic:spPr", &[])?;
    start(w, "a:xfrm", &[])?;
    empty(w, "a:off", &[("x", "0"), ("y", "0")])?;
    empty(w, "a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    end(w, "a:xfrm")?;
    start(w, "a:prstGeom", &[("prst", "rect")])?;
    empty(w, "a:avLst", &[])?;
    end(w, "a:prstGeom")?;
    end(w, "pic:spPr")?;

    end(w, "pic:pic")?;
    end(w, "a:graphicData")?;
    end(w, "a:graphic")?;
    end(w, "wp:inline")?;
    end(w, "w:drawing")?;
    end(w, "w:r")?;
    end(w, "w:p")
}

fn relationships(rels: &[(&str, &str, &str)]) -> Result<Vec<u8>, WriterError> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    start(
        &mut w,
        "Relationships",
        &[(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/relationships",
        )],
    )?;
    for &(id, kind, target) in rels {
        empty(
            &mut w,
            "Relationship",
            &[("Id", id), ("Type", kind), ("Target", target)],
        )?;
    }
    end(&mut w, "Relationships")?;
    Ok(w.into_inner().into_inner())
}

fn styles_xml() -> Result<Vec<u8>, WriterError> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    start(&mut w, "w:styles", &[("xmlns:w", NS_W)])?;

    start(
        &mut w,
        "w:style",
        &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")],
    )?;
    empty(&mut w, "w:name", &[("w:val", "Normal")])?;
    end(&mut w, "w:style")?;

    // half-points
    for (level, size) in [(1u8, "32"), (2, "28"), (3, "24")] {
        let id = format!("Heading{level}");
        let outline = (level - 1).to_string();
        start(
            &mut w,
            "w:style",
            &[("w:type", "paragraph"), ("w:styleId", id.as_str())],
        )?;
        empty(&mut w, "w:name", &[("w:val", format!("heading {level}").as_str())])?;
        empty(&mut w, "w:basedOn", &[("w:val", "Normal")])?;
        empty(&mut w, "w:next", &[("w:val", "Normal")])?;
        start(&mut w, "w:pPr", &[])?;
        empty(&mut w, "w:keepNext", &[])?;
        empty(&mut w, "w:spacing", &[("w:before", "240"), ("w:after", "120")])?;
        empty(&mut w, "w:outlineLvl", &[("w:val", outline.as_str())])?;
        end(&mut w, "w:pPr")?;
        start(&mut w, "w:rPr", &[])?;
        empty(&mut w, "w:b", &[])?;
        empty(&mut w, "w:sz", &[("w:val", size)])?;
        end(&mut w, "w:rPr")?;
        end(&mut w, "w:style")?;
    }

    end(&mut w, "w:styles")?;
    Ok(w.into_inner().into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};
    use std::io::Read;

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn package_has_required_parts() {
        let mut doc = DocxWriter::new();
        doc.add_heading("Page 1", 2);
        doc.add_paragraph("Net total: 4 & 5 < 6");
        doc.add_page_break();
        let bytes = doc.to_bytes().unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert!(names.contains(&part), "missing {part}");
        }

        let xml = read_entry(&bytes, "word/document.xml");
        assert!(xml.contains(r#"<w:pStyle w:val="Heading2"/>"#));
        assert!(xml.contains("Net total: 4 &amp; 5 &lt; 6"));
        assert!(xml.contains(r#"<w:br w:type="page"/>"#));
    }

    #[test]
    fn image_is_embedded_and_capped_at_six_inches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        DynamicImage::ImageLuma8(GrayImage::from_pixel(3000, 1500, Luma([200])))
            .save(&path)
            .unwrap();

        let mut doc = DocxWriter::new();
        doc.add_image(&path).unwrap();
        let bytes = doc.to_bytes().unwrap();

        let xml = read_entry(&bytes, "word/document.xml");
        assert!(xml.contains(r#"<wp:extent cx="5486400" cy="2743200"/>"#), "{xml}");
        let rels = read_entry(&bytes, "word/_rels/document.xml.rels");
        assert!(rels.contains("media/image1.png"));
    }

    #[test]
    fn small_image_keeps_size() {
        assert_eq!(fit_width(96, 48), (EMU_PER_INCH, EMU_PER_INCH / 2));
    }

    #[test]
    fn missing_image_is_an_error() {
        let mut doc = DocxWriter::new();
        assert!(doc.add_image(Path::new("/nonexistent/page.png")).is_err());
    }

    #[test]
    fn output_is_deterministic() {
        let build = || {
            let mut doc = DocxWriter::new();
            doc.add_heading("Page 1", 2);
            doc.add_paragraph("same content");
            doc.add_page_break();
            doc.to_bytes().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(xml_safe("a\u{0}b\u{c}c\td"), "abc\td");
    }
}
