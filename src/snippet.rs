//! Presentation helpers the engine exposes but does not own: extracting a
//! single matching line from a file, and wrapping matched terms in ANSI
//! color. Callers (a CLI, a UI) decide whether and how to use these.

use crate::error::Result;
use std::path::Path;

/// Finds the earliest (lowercase) occurrence of any of `terms` in the file
/// at `path`, returning its 1-based line number and the (possibly trimmed)
/// line text. Falls back to the first line if no term is found; returns
/// `(None, "")` if the file can't be read as text.
pub fn snippet_with_line(path: &Path, terms: &[String], max_len: usize) -> Result<(Option<usize>, String)> {
    let text = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => return Ok((None, String::new())),
    };
    if text.is_empty() {
        return Ok((None, String::new()));
    }
    let lower = text.to_lowercase();

    let mut pos = None;
    for term in terms {
        if let Some(p) = lower.find(term.as_str()) {
            pos = Some(match pos {
                Some(existing) if existing <= p => existing,
                _ => p,
            });
        }
    }

    let pos = match pos {
        // `lower`'s case-folding can shift byte offsets relative to `text`
        // for a handful of Unicode codepoints; clamp to a real boundary.
        Some(p) => floor_char_boundary(&text, p),
        None => {
            let line = text.lines().next().unwrap_or("");
            return Ok((Some(1), truncate_chars(line, max_len)));
        }
    };

    let line_start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = text[pos..]
        .find('\n')
        .map(|i| pos + i)
        .unwrap_or(text.len());
    let full_line = &text[line_start..line_end];
    let trimmed = full_line.trim();
    let line_no = text[..line_start].matches('\n').count() + 1;

    // Work in chars throughout so slicing never lands mid-codepoint.
    let line = if trimmed.chars().count() > max_len {
        let leading_trim_bytes = full_line.len() - full_line.trim_start().len();
        let match_byte_in_trimmed = (pos - line_start).saturating_sub(leading_trim_bytes);
        let match_byte_in_trimmed = floor_char_boundary(trimmed, match_byte_in_trimmed.min(trimmed.len()));
        let rel_chars = trimmed[..match_byte_in_trimmed].chars().count();

        let chars: Vec<char> = trimmed.chars().collect();
        let start_chars = rel_chars.saturating_sub(max_len / 3).min(chars.len());
        let end_chars = (start_chars + max_len).min(chars.len());
        chars[start_chars..end_chars]
            .iter()
            .collect::<String>()
            .trim()
            .to_string()
    } else {
        trimmed.to_string()
    };

    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok((Some(line_no), collapsed))
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// Rounds `idx` down to the nearest valid `char` boundary in `s`.
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Wraps each occurrence of `terms` (case-insensitive, longest term first so
/// overlapping terms don't clobber each other) in bold-red ANSI escapes.
/// Returns `s` unchanged when `color` is false or `terms` is empty.
pub fn highlight(s: &str, terms: &[String], color: bool) -> String {
    if !color || terms.is_empty() {
        return s.to_string();
    }
    let mut uniq: Vec<String> = terms
        .iter()
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() >= 2)
        .collect();
    uniq.sort_by(|a, b| b.len().cmp(&a.len()));
    uniq.dedup();

    let mut out = s.to_string();
    for term in uniq {
        out = replace_case_insensitive(&out, &term, |m| format!("\x1b[1;31m{}\x1b[0m", m));
    }
    out
}

fn replace_case_insensitive(haystack: &str, needle: &str, wrap: impl Fn(&str) -> String) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    let lower_hay = haystack.to_lowercase();
    let lower_needle = needle.to_lowercase();
    let mut result = String::with_capacity(haystack.len());
    let mut last = 0;
    let mut search_from = 0;
    while let Some(found) = lower_hay[search_from..].find(&lower_needle) {
        let start = search_from + found;
        let end = start + needle.len();
        result.push_str(&haystack[last..start]);
        result.push_str(&wrap(&haystack[start..end]));
        last = end;
        search_from = end;
    }
    result.push_str(&haystack[last..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_earliest_matching_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "first line\nsecond line has redis\nthird").unwrap();

        let (line_no, line) =
            snippet_with_line(&path, &["redis".to_string()], 220).unwrap();
        assert_eq!(line_no, Some(2));
        assert!(line.contains("redis"));
    }

    #[test]
    fn falls_back_to_first_line_when_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "alpha\nbeta").unwrap();

        let (line_no, line) = snippet_with_line(&path, &["zzz".to_string()], 220).unwrap();
        assert_eq!(line_no, Some(1));
        assert_eq!(line, "alpha");
    }

    #[test]
    fn highlight_wraps_case_insensitive_matches() {
        let out = highlight("Hello World", &["world".to_string()], true);
        assert!(out.contains("\x1b[1;31mWorld\x1b[0m"));
    }

    #[test]
    fn highlight_noop_when_color_disabled() {
        let out = highlight("Hello World", &["world".to_string()], false);
        assert_eq!(out, "Hello World");
    }

    #[test]
    fn truncates_long_line_with_multibyte_chars_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        // Multibyte filler on both sides of the match so naive byte-offset
        // slicing would land mid-codepoint.
        let filler: String = "café日本語".repeat(30);
        let content = format!("{} needle {}", filler, filler);
        fs::write(&path, &content).unwrap();

        let (line_no, line) =
            snippet_with_line(&path, &["needle".to_string()], 40).unwrap();
        assert_eq!(line_no, Some(1));
        assert!(line.contains("needle"));
    }
}
