//! OCR language negotiation.
//!
//! The caller asks for a set of language codes (`eng+hin`); the engine
//! reports what is installed. If anything requested is missing, the whole
//! request is replaced by a single fallback language: `eng` when installed,
//! otherwise the first installed code, otherwise the literal `eng` so the
//! engine fails cleanly on its own. The rest of the request is never kept
//! alongside a partial drop.
//!
//! Negotiation runs once per job and the result is shared read-only by
//! every document in it.

use crate::pipeline::recognize::OcrEngine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};

/// Language used when the requested set cannot be honoured.
pub const FALLBACK_LANGUAGE: &str = "eng";

/// Orientation/script detection data; installed everywhere, useless as a
/// recognition language.
const OSD: &str = "osd";

/// An ordered, duplicate-free list of language codes.
///
/// Order is preserved because tesseract treats the first code as primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSet(Vec<String>);

impl LanguageSet {
    /// Parse a `+`-joined list such as `"eng+hin+tam"`. Commas are accepted too.
    pub fn parse(s: &str) -> Self {
        let mut codes: Vec<String> = Vec::new();
        for code in s.split(['+', ',']).map(str::trim).filter(|c| !c.is_empty()) {
            if !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        }
        Self(codes)
    }

    pub fn single(code: impl Into<String>) -> Self {
        Self(vec![code.into()])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self::parse("eng+hin")
    }
}

impl fmt::Display for LanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("+"))
    }
}

/// Languages actually passed to the OCR engine. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveLanguageSet(LanguageSet);

impl EffectiveLanguageSet {
    pub fn languages(&self) -> &LanguageSet {
        &self.0
    }

    /// The `-l` argument for tesseract.
    pub fn as_arg(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for EffectiveLanguageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outcome of negotiating a request against the installed languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Negotiation {
    pub effective: EffectiveLanguageSet,
    pub installed: BTreeSet<String>,
    /// Requested codes that are not installed, in request order.
    pub missing: Vec<String>,
}

impl Negotiation {
    /// True when the request was replaced by a fallback.
    pub fn degraded(&self) -> bool {
        !self.missing.is_empty()
    }
}

/// Query the engine once and negotiate. A failing query counts as "nothing
/// installed".
pub fn negotiate(requested: &LanguageSet, engine: &dyn OcrEngine) -> Negotiation {
    let installed = match engine.installed_languages() {
        Ok(langs) => langs,
        Err(e) => {
            warn!("Could not list installed OCR languages: {}", e);
            BTreeSet::new()
        }
    };
    info!(
        "Installed OCR languages: {}",
        installed.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    resolve(requested, installed)
}

/// Pure negotiation over a known installed set.
pub fn resolve(requested: &LanguageSet, installed: BTreeSet<String>) -> Negotiation {
    let missing: Vec<String> = requested
        .iter()
        .filter(|code| !installed.contains(*code))
        .map(str::to_string)
        .collect();

    let effective = if missing.is_empty() && !requested.is_empty() {
        requested.clone()
    } else {
        let fallback = fallback_language(&installed);
        warn!(
            "Requested OCR languages '{}' not installed (missing: {}); falling back to '{}'",
            requested,
            missing.join(", "),
            fallback
        );
        LanguageSet::single(fallback)
    };

    Negotiation {
        effective: EffectiveLanguageSet(effective),
        installed,
        missing,
    }
}

fn fallback_language(installed: &BTreeSet<String>) -> String {
    if installed.contains(FALLBACK_LANGUAGE) {
        return FALLBACK_LANGUAGE.to_string();
    }
    installed
        .iter()
        .find(|code| code.as_str() != OSD)
        .or_else(|| installed.iter().next())
        .cloned()
        .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn parse_keeps_order_and_dedups() {
        let set = LanguageSet::parse(" hin + eng+hin ,tam");
        assert_eq!(set.to_string(), "hin+eng+tam");
        assert_eq!(set.len(), 3);
        assert!(LanguageSet::parse("+").is_empty());
    }

    #[test]
    fn all_installed_keeps_request() {
        let n = resolve(&LanguageSet::parse("eng+hin"), installed(&["eng", "hin", "osd"]));
        assert!(!n.degraded());
        assert_eq!(n.effective.as_arg(), "eng+hin");
    }

    #[test]
    fn fallback_is_all_or_nothing() {
        let n = resolve(&LanguageSet::parse("eng+hin"), installed(&["eng"]));
        assert!(n.degraded());
        assert_eq!(n.missing, vec!["hin".to_string()]);
        assert_eq!(n.effective.languages(), &LanguageSet::single("eng"));
    }

    #[test]
    fn request_without_eng_still_falls_back_to_eng() {
        let n = resolve(&LanguageSet::parse("hin+tam"), installed(&["eng", "tam"]));
        assert_eq!(n.effective.as_arg(), "eng");
    }

    #[test]
    fn falls_back_to_first_installed_when_eng_missing() {
        let n = resolve(&LanguageSet::parse("hin"), installed(&["osd", "fra", "deu"]));
        assert_eq!(n.effective.as_arg(), "deu");
    }

    #[test]
    fn only_osd_installed_uses_osd() {
        let n = resolve(&LanguageSet::parse("hin"), installed(&["osd"]));
        assert_eq!(n.effective.as_arg(), "osd");
    }

    #[test]
    fn nothing_installed_uses_literal_eng() {
        let n = resolve(&LanguageSet::parse("eng+hin"), BTreeSet::new());
        assert_eq!(n.effective.as_arg(), "eng");
        assert_eq!(n.missing.len(), 2);
    }

    #[test]
    fn effective_set_is_never_empty() {
        let n = resolve(&LanguageSet::parse(""), installed(&["fra"]));
        assert_eq!(n.effective.as_arg(), "fra");
    }
}
