//! Text heuristics shared by the extraction engines.

/// Tokens that mark a printable run as PDF/markup syntax rather than prose.
const SYNTAX_TOKENS: &[&str] = &["obj", "<<", ">>"];

/// Decodes bytes as ISO-8859-1: every byte maps to the code point of the same value.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Collapses every whitespace run into a single space and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Runs of at least `min_len` printable ASCII characters that contain a letter
/// or digit, minus runs that are only digits/whitespace or that contain syntax
/// tokens.
pub fn printable_ascii_runs(text: &str, min_len: usize) -> Vec<String> {
    split_runs(text, |c| (' '..='~').contains(&c))
        .into_iter()
        .filter(|run| run.chars().count() >= min_len)
        .filter(|run| !is_syntax_noise(run))
        .filter(|run| has_alphanumeric(run))
        .map(|run| run.trim().to_string())
        .filter(|run| !run.is_empty())
        .collect()
}

/// True for runs that carry no prose: pure digits/whitespace or syntax tokens.
pub fn is_syntax_noise(run: &str) -> bool {
    run.chars().all(|c| c.is_ascii_digit() || c.is_whitespace())
        || SYNTAX_TOKENS.iter().any(|token| run.contains(token))
}

/// Splits `text` into maximal runs of characters accepted by `keep`.
pub fn split_runs(text: &str, keep: impl Fn(char) -> bool) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        match (keep(c), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                runs.push(&text[s..idx]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(&text[s..]);
    }
    runs
}

/// Inserts spaces at lower→upper case and letter↔digit boundaries, undoing
/// run-together fragments such as `SoftwareEngineer2019`.
pub fn separate_run_together(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if let Some(p) = prev {
            let case_boundary = p.is_lowercase() && c.is_uppercase();
            let letter_digit = (p.is_alphabetic() && c.is_ascii_digit())
                || (p.is_ascii_digit() && c.is_alphabetic());
            if case_boundary || letter_digit {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Replaces the five predefined XML entities.
pub fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn has_alphanumeric(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}
