//! Page-range parsing and PDF splitting.
//!
//! Grammar (1-based, whitespace around entries ignored):
//!
//! ```text
//! ranges := entry (',' entry)*
//! entry  := INT | INT '-' INT
//! ```
//!
//! Entries are independent: each valid entry becomes one part, numbered by
//! its position in the list, and an invalid entry is reported without
//! affecting the others. Entries are neither sorted nor deduplicated, so
//! `"1-3,2"` yields two parts that both contain page 2.

use crate::error::{RangeError, RenderError};
use crate::pipeline::render::RenderedDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One parsed entry. Pages are 1-based and within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageRange {
    Single(usize),
    Interval { start: usize, end: usize },
}

impl PageRange {
    /// Pages selected by this entry, ascending, 1-based.
    pub fn pages(&self) -> Vec<usize> {
        match *self {
            PageRange::Single(p) => vec![p],
            PageRange::Interval { start, end } => (start..=end).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match *self {
            PageRange::Single(_) => 1,
            PageRange::Interval { start, end } => end - start + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRange::Single(p) => write!(f, "{p}"),
            PageRange::Interval { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

/// A valid entry and its 1-based position in the range string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeEntry {
    pub position: usize,
    pub range: PageRange,
}

/// Parse a range string against a document of `total` pages.
///
/// Returns one result per comma-separated entry, in input order.
pub fn parse_ranges(spec: &str, total: usize) -> Vec<Result<RangeEntry, RangeError>> {
    spec.split(',')
        .enumerate()
        .map(|(i, raw)| {
            let position = i + 1;
            parse_entry(raw.trim(), position, total).map(|range| RangeEntry { position, range })
        })
        .collect()
}

fn parse_entry(entry: &str, position: usize, total: usize) -> Result<PageRange, RangeError> {
    if entry.is_empty() {
        return Err(RangeError::Empty { entry: position });
    }

    let parts: Vec<&str> = entry.split('-').map(str::trim).collect();
    let range = match parts.as_slice() {
        [page] => PageRange::Single(parse_page(page, position)?),
        [start, end] => {
            let start = parse_page(start, position)?;
            let end = parse_page(end, position)?;
            if start > end {
                return Err(RangeError::Reversed {
                    entry: position,
                    start,
                    end,
                });
            }
            PageRange::Interval { start, end }
        }
        _ => {
            return Err(RangeError::Malformed {
                entry: position,
                text: entry.to_string(),
            })
        }
    };

    let (first, last) = match range {
        PageRange::Single(p) => (p, p),
        PageRange::Interval { start, end } => (start, end),
    };
    for page in [first, last] {
        if page == 0 || page > total {
            return Err(RangeError::OutOfBounds {
                entry: position,
                page,
                total,
            });
        }
    }
    Ok(range)
}

fn parse_page(token: &str, position: usize) -> Result<usize, RangeError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::NotANumber {
            entry: position,
            token: token.to_string(),
        });
    }
    // All digits, so the only parse failure is overflow: far past any document.
    Ok(token.parse::<usize>().unwrap_or(usize::MAX))
}

/// File name of the part produced for entry `position`.
pub fn part_name(position: usize) -> String {
    format!("part_{position}.pdf")
}

/// A part written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPart {
    pub entry: RangeEntry,
    pub path: PathBuf,
}

/// Outcome of splitting one document.
#[derive(Debug, Default)]
pub struct SplitResult {
    pub parts: Vec<SplitPart>,
    pub skipped: Vec<RangeError>,
    /// Valid entries whose part could not be written.
    pub failed: Vec<(RangeEntry, RenderError)>,
}

/// Write one PDF per valid entry of `spec` into `out_dir`.
pub fn split_document(doc: &dyn RenderedDocument, spec: &str, out_dir: &Path) -> SplitResult {
    let mut result = SplitResult::default();

    for parsed in parse_ranges(spec, doc.page_count()) {
        let entry = match parsed {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping range {}", e);
                result.skipped.push(e);
                continue;
            }
        };
        let indices: Vec<usize> = entry.range.pages().iter().map(|p| p - 1).collect();
        let path = out_dir.join(part_name(entry.position));
        match doc.copy_pages(&indices, &path) {
            Ok(()) => {
                debug!("Part {} = pages {} → {}", entry.position, entry.range, path.display());
                result.parts.push(SplitPart { entry, path });
            }
            Err(e) => {
                warn!("Part {} ({}) failed: {}", entry.position, entry.range, e);
                result.failed.push((entry, e));
            }
        }
    }
    result
}
