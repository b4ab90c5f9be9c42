//! Image encoding: `DynamicImage` → PNG bytes or a PNG file.
//!
//! PNG is used everywhere an image leaves memory (tesseract input files,
//! embedded page images) because it is lossless. JPEG artefacts around
//! rendered glyphs hurt recognition, and an embedded fallback page should
//! look exactly like the scan.

use image::DynamicImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Encode an image as PNG in memory.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}x{} image → {} bytes PNG", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Encode an image as PNG and write it to `path`.
pub fn write_png(img: &DynamicImage, path: &Path) -> Result<(), image::ImageError> {
    let bytes = encode_png(img)?;
    std::fs::write(path, bytes).map_err(image::ImageError::IoError)
}
