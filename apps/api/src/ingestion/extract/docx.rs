//! DOCX engine.
//!
//! The package is opened with `zip` and the WordprocessingML parts are scanned
//! as text. When the archive can't be read, the same strategies run over the
//! raw bytes instead:
//! 1. `<w:t>` run contents, XML entities unescaped;
//! 2. any text between `>` and `<` that isn't numeric or package plumbing;
//! 3. printable ASCII runs of 10+ characters.

use std::io::{Cursor, Read};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::ingestion::extract::text::{collapse_whitespace, latin1, printable_ascii_runs, unescape_xml};
use crate::ingestion::extract::ExtractedText;

const MIN_FALLBACK_RUN: usize = 10;
const MAIN_DOCUMENT_PART: &str = "word/document.xml";
/// Per-part cap on decompressed XML.
const MAX_PART_BYTES: u64 = 32 * 1024 * 1024;
/// Cap on decompressed XML across every part of one package.
const MAX_PACKAGE_XML_BYTES: u64 = 64 * 1024 * 1024;

/// Substrings that identify package internals rather than document text.
const PACKAGE_MARKERS: &[&str] = &[
    "xml",
    "word/",
    "rels",
    "docprops",
    "content_types",
    "schemas",
    "http://",
    "https://",
    "urn:",
    "w:",
];

static TEXT_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("text run pattern is valid")
});

static BETWEEN_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r">([^<>]+)<").expect("between-tags pattern is valid"));

pub fn extract(bytes: &[u8]) -> ExtractedText {
    let source = match package_xml(bytes, MAX_PACKAGE_XML_BYTES) {
        Some(xml) => xml,
        None => {
            warn!("DOCX archive could not be opened; scanning raw bytes");
            latin1(bytes)
        }
    };

    let fragments = Some(text_runs(&source))
        .filter(|f| !f.is_empty())
        .or_else(|| Some(between_tags(&source)).filter(|f| !f.is_empty()))
        .unwrap_or_else(|| printable_ascii_runs(&source, MIN_FALLBACK_RUN));

    ExtractedText::new(collapse_whitespace(&fragments.join(" ")))
}

/// Reads the main document part followed by headers, footers and footnotes,
/// decompressing at most `budget` bytes in total.
/// Returns `None` when the bytes aren't a readable package with a main part.
fn package_xml(bytes: &[u8], budget: u64) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| debug!("Not a readable zip archive: {e}"))
        .ok()?;

    let mut parts: Vec<String> = archive
        .file_names()
        .filter(|name| {
            name.starts_with("word/header")
                || name.starts_with("word/footer")
                || *name == "word/footnotes.xml"
        })
        .map(String::from)
        .collect();
    parts.sort();
    parts.insert(0, MAIN_DOCUMENT_PART.to_string());

    let mut xml = String::new();
    let mut remaining = budget;
    for (idx, name) in parts.iter().enumerate() {
        if remaining == 0 {
            debug!("DOCX budget of {budget} bytes spent; skipping {} parts", parts.len() - idx);
            break;
        }
        let mut raw = Vec::new();
        let read = archive
            .by_name(name)
            .map_err(|e| e.to_string())
            .and_then(|part| {
                part.take(MAX_PART_BYTES.min(remaining))
                    .read_to_end(&mut raw)
                    .map_err(|e| e.to_string())
            });
        match read {
            Ok(n) => {
                remaining = remaining.saturating_sub(n as u64);
                xml.push_str(&String::from_utf8_lossy(&raw));
                xml.push('\n');
            }
            // Without the main part there is nothing worth scanning.
            Err(e) if idx == 0 => {
                debug!("DOCX package has no readable {MAIN_DOCUMENT_PART}: {e}");
                return None;
            }
            Err(e) => debug!("Skipping DOCX part {name}: {e}"),
        }
    }
    Some(xml)
}

/// Strategy 1: text runs, concatenated per paragraph so split runs rejoin.
fn text_runs(xml: &str) -> Vec<String> {
    xml.split("</w:p>")
        .map(|paragraph| {
            TEXT_RUN
                .captures_iter(paragraph)
                .filter_map(|c| c.get(1))
                .map(|m| unescape_xml(m.as_str()))
                .collect::<String>()
        })
        .filter(|p| !p.trim().is_empty())
        .collect()
}

/// Strategy 2: bare text nodes, skipping numbers and package internals.
fn between_tags(xml: &str) -> Vec<String> {
    BETWEEN_TAGS
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| unescape_xml(m.as_str().trim()))
        .filter(|t| !t.is_empty())
        .filter(|t| !is_numeric_only(t))
        .filter(|t| {
            let lower = t.to_lowercase();
            !PACKAGE_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .collect()
}

fn is_numeric_only(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '.' | ',' | '-' | '+'))
}
