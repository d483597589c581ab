//! Title similarity measures.

use crate::textprep;
use std::collections::BTreeSet;

/// Score for titles equal after folding.
pub const EXACT: f64 = 1.0;
/// Score when one folded title contains the other.
pub const CONTAINMENT: f64 = 0.9;

/// Prefix length (chars) used by the ranking join bonus.
const JOIN_PREFIX_CHARS: usize = 20;
const JOIN_PREFIX_BONUS: f64 = 0.1;

/// Intersection over union. Zero when either side is empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f64;
    let uni = a.union(b).count() as f64;
    inter / uni
}

/// Bibliographic title similarity in `[0, 1]`.
///
/// 1.0 when equal after `textprep::fold`, 0.9 when one contains the other, otherwise token Jaccard.
/// Either side empty gives 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = textprep::fold(a);
    let b = textprep::fold(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return EXACT;
    }
    if a.contains(&b) || b.contains(&a) {
        return CONTAINMENT;
    }
    jaccard(&textprep::tokens(&a), &textprep::tokens(&b))
}

fn word_set(key: &str) -> BTreeSet<String> {
    key.split(' ').filter(|w| !w.is_empty()).map(str::to_string).collect()
}

/// Loose score between a ranking-export title and an index title.
///
/// Word Jaccard over `textprep::join_key` forms, plus a small bonus when the index title starts with the
/// first characters of the ranking title.
pub fn join_score(ranking_title: &str, index_title: &str) -> f64 {
    let r = textprep::join_key(ranking_title);
    let i = textprep::join_key(index_title);
    let prefix: String = r.chars().take(JOIN_PREFIX_CHARS).collect();
    let bonus = if i.starts_with(&prefix) {
        JOIN_PREFIX_BONUS
    } else {
        0.0
    };
    bonus + jaccard(&word_set(&r), &word_set(&i))
}
