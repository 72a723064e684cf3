//! PDF engine: literal-string scanning over the raw file plus any
//! Flate-compressed content streams.
//!
//! Strategies, first one producing text wins:
//! 1. every `( ... )` literal string that reads as a word or more;
//! 2. literal strings inside `BT ... ET` text objects, with `TJ` arrays
//!    reassembled so per-glyph fragments become words again;
//! 3. printable ASCII runs of 4+ characters across the whole buffer.

use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::debug;

use crate::ingestion::extract::text::{
    collapse_whitespace, has_alphanumeric, latin1, printable_ascii_runs, separate_run_together,
};
use crate::ingestion::extract::ExtractedText;

const MIN_FALLBACK_RUN: usize = 4;
/// Upper bound on inflated bytes per stream.
const MAX_INFLATED_STREAM: u64 = 16 * 1024 * 1024;
/// Upper bound on inflated bytes across all streams of one document.
const MAX_INFLATED_TOTAL: u64 = 64 * 1024 * 1024;
/// How far before a `stream` keyword to look for its `/Filter` entry.
const STREAM_DICT_LOOKBACK: usize = 512;

pub fn extract(bytes: &[u8]) -> ExtractedText {
    let buffer = with_inflated_streams(bytes, MAX_INFLATED_TOTAL);

    let strategies: [fn(&[u8]) -> Vec<String>; 3] =
        [literal_fragments, text_object_fragments, fallback_runs];

    let fragments = strategies
        .iter()
        .enumerate()
        .find_map(|(idx, strategy)| {
            let fragments = strategy(&buffer);
            if fragments.iter().any(|f| has_alphanumeric(f)) {
                debug!("PDF strategy {} produced {} fragments", idx + 1, fragments.len());
                Some(fragments)
            } else {
                None
            }
        })
        .unwrap_or_default();

    ExtractedText::new(post_process(&fragments))
}

fn post_process(fragments: &[String]) -> String {
    collapse_whitespace(&separate_run_together(&fragments.join(" ")))
}

/// Appends the inflated payload of every `/FlateDecode` stream to the raw bytes,
/// stopping once `budget` inflated bytes have been produced.
fn with_inflated_streams(bytes: &[u8], budget: u64) -> Vec<u8> {
    let mut buffer = bytes.to_vec();
    let mut remaining = budget;
    let mut cursor = 0;

    while let Some(pos) = find(&bytes[cursor..], b"stream") {
        if remaining == 0 {
            debug!("PDF inflation budget of {budget} bytes spent; remaining streams left compressed");
            break;
        }

        let keyword = cursor + pos;
        cursor = keyword + b"stream".len();

        // `endstream` also contains `stream`.
        if keyword >= 3 && &bytes[keyword - 3..keyword] == b"end" {
            continue;
        }

        let mut data_start = cursor;
        if bytes.get(data_start) == Some(&b'\r') {
            data_start += 1;
        }
        if bytes.get(data_start) == Some(&b'\n') {
            data_start += 1;
        }
        let Some(len) = find(&bytes[data_start..], b"endstream") else {
            break;
        };
        let data = &bytes[data_start..data_start + len];
        cursor = data_start + len + b"endstream".len();

        let dict = &bytes[keyword.saturating_sub(STREAM_DICT_LOOKBACK)..keyword];
        let dict = match rfind(dict, b"obj") {
            Some(obj) => &dict[obj..],
            None => dict,
        };
        if find(dict, b"/FlateDecode").is_none() {
            continue;
        }

        let mut inflated = Vec::new();
        match ZlibDecoder::new(data)
            .take(MAX_INFLATED_STREAM.min(remaining))
            .read_to_end(&mut inflated)
        {
            Ok(n) => {
                remaining = remaining.saturating_sub(n as u64);
                buffer.push(b'\n');
                buffer.extend_from_slice(&inflated);
            }
            Err(e) => debug!("Skipping undecodable PDF stream at byte {keyword}: {e}"),
        }
    }

    buffer
}

/// Strategy 1: literal strings anywhere in the buffer.
fn literal_fragments(buffer: &[u8]) -> Vec<String> {
    literal_spans(buffer)
        .into_iter()
        .filter_map(|(start, end)| parse_literal(&buffer[start..end], 0))
        .map(|(literal, _)| literal)
        .filter(|literal| is_word_like(literal))
        .collect()
}

/// Strategy 2: literal strings inside `BT ... ET` blocks.
fn text_object_fragments(buffer: &[u8]) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut cursor = 0;

    while let Some(begin) = find_operator(buffer, cursor, b"BT") {
        let body_start = begin + 2;
        let body_end = find_operator(buffer, body_start, b"ET").unwrap_or(buffer.len());
        fragments.extend(block_strings(&buffer[body_start..body_end]));
        cursor = body_end + 2;
    }
    fragments
}

/// Collects the strings of one text object; strings inside a `[...]` array
/// are concatenated into one fragment.
fn block_strings(block: &[u8]) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut array: Option<String> = None;
    let mut spans = literal_spans(block).into_iter().peekable();
    let mut i = 0;

    while i < block.len() {
        if let Some((start, end)) = spans.next_if(|&(start, _)| start == i) {
            if let Some((literal, _)) = parse_literal(&block[start..end], 0) {
                match array.as_mut() {
                    Some(acc) => acc.push_str(&literal),
                    None => fragments.push(literal),
                }
            }
            i = end;
            continue;
        }
        match block[i] {
            b'[' => array = Some(String::new()),
            b']' => {
                if let Some(acc) = array.take() {
                    fragments.push(acc);
                }
            }
            _ => {}
        }
        i += 1;
    }
    if let Some(acc) = array {
        fragments.push(acc);
    }

    fragments
        .into_iter()
        .filter(|f| is_printable(f) && has_alphanumeric(f))
        .collect()
}

/// Strategy 3: printable runs across the whole buffer, minus `%` comment
/// lines such as the `%PDF-1.x` header.
fn fallback_runs(buffer: &[u8]) -> Vec<String> {
    printable_ascii_runs(&latin1(buffer), MIN_FALLBACK_RUN)
        .into_iter()
        .filter(|run| !run.starts_with('%'))
        .collect()
}

/// Outermost balanced `( ... )` spans in one left-to-right pass, as
/// `(open index, index past the close)`. Escaped parens don't count and an
/// unclosed `(` never hides a balanced literal that follows it.
fn literal_spans(buf: &[u8]) -> Vec<(usize, usize)> {
    let mut open = Vec::new();
    let mut pairs = Vec::new();
    let mut i = 0;

    while i < buf.len() {
        match buf[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'(' => open.push(i),
            b')' => {
                if let Some(start) = open.pop() {
                    pairs.push((start, i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }

    pairs.sort_unstable();
    let mut outermost = Vec::with_capacity(pairs.len());
    let mut next_free = 0;
    for (start, end) in pairs {
        if start >= next_free {
            outermost.push((start, end));
            next_free = end;
        }
    }
    outermost
}

/// Parses a literal string starting at `start` (which must be `(`).
/// Returns the unescaped text and the index just past the closing paren.
fn parse_literal(buf: &[u8], start: usize) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut depth = 1usize;
    let mut i = start + 1;

    while i < buf.len() {
        let b = buf[i];
        match b {
            b'\\' => {
                let next = *buf.get(i + 1)?;
                i += 2;
                match next {
                    b'n' => out.push('\n'),
                    b'r' => out.push('\r'),
                    b't' => out.push('\t'),
                    b'b' => out.push('\u{8}'),
                    b'f' => out.push('\u{c}'),
                    b'(' | b')' | b'\\' => out.push(next as char),
                    b'0'..=b'7' => {
                        let mut value = u32::from(next - b'0');
                        let mut digits = 1;
                        while digits < 3 {
                            match buf.get(i) {
                                Some(d @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(d - b'0');
                                    i += 1;
                                    digits += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push(char::from_u32(value & 0xFF).unwrap_or(' '));
                    }
                    // Line continuation.
                    b'\r' => {
                        if buf.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'\n' => {}
                    other => out.push(other as char),
                }
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((out, i + 1));
                }
            }
            _ => {}
        }
        out.push(b as char);
        i += 1;
    }
    None
}

/// Locates a content-stream operator delimited by whitespace or buffer edges.
fn find_operator(buf: &[u8], from: usize, op: &[u8]) -> Option<usize> {
    let mut cursor = from;
    while cursor < buf.len() {
        let pos = cursor + find(&buf[cursor..], op)?;
        let before_ok = pos == 0 || buf[pos - 1].is_ascii_whitespace();
        let after_ok = buf
            .get(pos + op.len())
            .map_or(true, |b| b.is_ascii_whitespace());
        if before_ok && after_ok {
            return Some(pos);
        }
        cursor = pos + 1;
    }
    None
}

fn is_printable(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || (!c.is_control() && (c as u32) < 0x100))
}

/// At least two alphanumerics and nothing that looks like binary.
fn is_word_like(text: &str) -> bool {
    is_printable(text) && text.chars().filter(|c| c.is_alphanumeric()).count() >= 2
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
