//! Minimal, deterministic text normalization helpers.
//!
//! `normalize` is the display-safe form used for titles, links and ids. The other helpers are
//! lossy matching keys and must never be shown to users.

use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

/// Trim, map ideographic spaces to ASCII spaces, and collapse whitespace runs to one space.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(s: &str) -> String {
    s.replace('\u{3000}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `normalize` followed by lowercase folding. Used as the comparison key for similarity.
pub fn fold(s: &str) -> String {
    normalize(s).to_lowercase()
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_lowercase()
        || ch.is_ascii_digit()
        || ('\u{3040}'..='\u{30ff}').contains(&ch)
        || ('\u{4e00}'..='\u{9fff}').contains(&ch)
}

/// Maximal runs of ASCII alphanumerics, kana or CJK ideographs, after lowercase folding.
pub fn tokens(s: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut cur = String::new();
    for ch in s.to_lowercase().chars() {
        if is_token_char(ch) {
            cur.push(ch);
        } else if !cur.is_empty() {
            out.insert(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.insert(cur);
    }
    out
}

/// Matching key for joining ranking exports to the index.
///
/// Lowercase, NFKC, then drop every character that is not a letter, number or whitespace and
/// collapse the remaining whitespace. Punctuation is removed rather than split on, so
/// `COVID-19` and `COVID19` share a key while `COVID 19` does not.
pub fn join_key(s: &str) -> String {
    let kept: String = s
        .to_lowercase()
        .nfkc()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
