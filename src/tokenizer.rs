//! Code-aware tokenizer: splits identifiers on case/digit boundaries and
//! underscores, lowercases, and optionally stems and drops stopwords.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9_]{2,}").unwrap());

/// Suffixes tried in order; first match wins. The remainder after stripping
/// must stay at least 3 characters or the suffix is not applied.
const STEM_SUFFIXES: &[&str] = &["'s", "ing", "ers", "er", "edly", "ed", "ly", "es", "s"];

pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "i", "if", "in", "into", "is", "it", "its", "me", "not", "of", "on", "or",
    "our", "s", "she", "so", "t", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "to", "was", "we", "were", "what", "when", "where", "which", "who", "will",
    "with", "you", "your",
];

fn stopword_set() -> &'static HashSet<&'static str> {
    static SET: Lazy<HashSet<&'static str>> =
        Lazy::new(|| DEFAULT_STOPWORDS.iter().copied().collect());
    &SET
}

/// Splits an identifier at lowercase→uppercase, letter→digit, and
/// digit→letter boundaries, and on `_`. Does not lowercase.
fn split_identifier(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for chunk in word.split('_') {
        if chunk.is_empty() {
            continue;
        }
        let chars: Vec<char> = chunk.chars().collect();
        let mut start = 0;
        for i in 1..chars.len() {
            let prev = chars[i - 1];
            let cur = chars[i];
            let boundary = (prev.is_lowercase() && cur.is_uppercase())
                || (prev.is_alphabetic() && cur.is_ascii_digit())
                || (prev.is_ascii_digit() && cur.is_alphabetic());
            if boundary {
                parts.push(chars[start..i].iter().collect());
                start = i;
            }
        }
        parts.push(chars[start..].iter().collect());
    }
    parts
}

/// Applies the weakest-acceptable stemmer: tries each suffix in
/// `STEM_SUFFIXES` in order, strips the first one that matches and leaves at
/// least 3 characters behind.
fn simple_stem(word: &str) -> String {
    for suffix in STEM_SUFFIXES {
        if let Some(stripped) = word.strip_suffix(suffix) {
            if stripped.len() >= 3 {
                return stripped.to_string();
            }
        }
    }
    word.to_string()
}

/// Tokenizes `text` into lowercase, sub-word tokens. `stem` applies
/// [`simple_stem`] to each token; `stopwords` drops tokens found in
/// [`DEFAULT_STOPWORDS`]. Tokens shorter than 2 characters after splitting
/// are discarded.
pub fn tokenize(text: &str, stem: bool, stopwords: bool) -> Vec<String> {
    let mut out = Vec::new();
    for raw in WORD_RE.find_iter(text) {
        for part in split_identifier(raw.as_str()) {
            if part.len() < 2 {
                continue;
            }
            let mut tok = part.to_lowercase();
            if stem {
                tok = simple_stem(&tok);
            }
            if tok.len() < 2 {
                continue;
            }
            if stopwords && stopword_set().contains(tok.as_str()) {
                continue;
            }
            out.push(tok);
        }
    }
    out
}

/// Tokenizes a file path into search terms: splits on path separators and
/// dots in addition to the usual identifier boundaries, never stems or
/// drops stopwords (path terms are matched for path-boost purposes, not
/// ranked on their own).
pub fn tokenize_path(path: &str) -> HashSet<String> {
    let normalized: String = path
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '.' { ' ' } else { c })
        .collect();
    tokenize(&normalized, false, false).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_case_underscore_and_digits() {
        assert_eq!(
            tokenize("FooBar_baz x86", false, false),
            vec!["foo", "bar", "baz", "x", "86"]
        );
    }

    #[test]
    fn discards_single_char_tokens() {
        assert_eq!(tokenize("a bb c", false, false), vec!["bb"]);
    }

    #[test]
    fn stemmer_strips_known_suffixes_in_order() {
        assert_eq!(simple_stem("running"), "runn");
        assert_eq!(simple_stem("fixes"), "fix");
        assert_eq!(simple_stem("cars"), "car");
        // too short after stripping: suffix not applied
        assert_eq!(simple_stem("as"), "as");
    }

    #[test]
    fn stopwords_are_dropped_when_enabled() {
        let toks = tokenize("the quick fox and the lazy dog", false, true);
        assert_eq!(toks, vec!["quick", "fox", "lazy", "dog"]);
    }

    #[test]
    fn stopwords_kept_when_disabled() {
        let toks = tokenize("the fox", false, false);
        assert_eq!(toks, vec!["the", "fox"]);
    }

    #[test]
    fn path_tokens_split_on_separators_and_dots() {
        let toks = tokenize_path("src/sx_search/engine.py");
        assert!(toks.contains("src"));
        assert!(toks.contains("sx"));
        assert!(toks.contains("search"));
        assert!(toks.contains("engine"));
        assert!(toks.contains("py"));
    }
}
