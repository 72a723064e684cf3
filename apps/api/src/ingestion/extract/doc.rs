//! Legacy `.doc` engine. The binary has no markers worth anchoring on, so the
//! buffer is decoded under several 8-bit charsets and the longest clean
//! printable runs are kept.

use std::collections::HashSet;

use encoding_rs::{Encoding, ISO_8859_15, UTF_8, WINDOWS_1252};

use crate::ingestion::extract::text::split_runs;
use crate::ingestion::extract::ExtractedText;

const MIN_RUN_CHARS: usize = 8;
const MAX_NON_LETTER_RATIO: f64 = 0.3;
const MAX_FRAGMENTS: usize = 100;

pub fn extract(bytes: &[u8]) -> ExtractedText {
    let mut seen = HashSet::new();
    let mut fragments: Vec<String> = Vec::new();

    let charsets: [&'static Encoding; 3] = [UTF_8, WINDOWS_1252, ISO_8859_15];

    for charset in charsets {
        let (decoded, _had_errors) = charset.decode_without_bom_handling(bytes);
        for run in split_runs(&decoded, is_text_char) {
            let run = run.trim();
            if is_clean_run(run) && seen.insert(run.to_string()) {
                fragments.push(run.to_string());
            }
        }
    }

    // Longest runs first.
    fragments.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    fragments.truncate(MAX_FRAGMENTS);

    ExtractedText::new(fragments.join(" "))
}

/// Printable ASCII plus non-ASCII letters. Nulls, C1 controls and U+FFFD
/// replacement characters all end a run.
fn is_text_char(c: char) -> bool {
    (' '..='~').contains(&c) || (!c.is_ascii() && c.is_alphabetic())
}

fn is_clean_run(run: &str) -> bool {
    let total = run.chars().count();
    if total < MIN_RUN_CHARS {
        return false;
    }
    let non_letters = run
        .chars()
        .filter(|c| !c.is_alphabetic() && !c.is_whitespace())
        .count();
    (non_letters as f64 / total as f64) <= MAX_NON_LETTER_RATIO
}
