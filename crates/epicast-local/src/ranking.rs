//! Streaming-ranking export ingestion.
//!
//! The hosting dashboard exports a CSV whose headers are localized and whose encoding depends on
//! how it was saved. Headers are matched loosely and the encoding is sniffed. Any problem with the
//! file degrades to an empty ranking rather than failing the run.

use crate::compare;
use epicast_core::IndexRow;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};

pub const RANKING_FILE: &str = "ranking.json";
/// Rank given to rows whose rank cell is empty or not an integer.
pub const RANK_MISSING: i64 = 1_000_000_000;
/// Minimum join score for attaching an index slug.
pub const JOIN_THRESHOLD: f64 = 0.2;

const TITLE_KEYS: &[&str] = &["タイトル", "title"];
const PLAYS_KEYS: &[&str] = &["ストリーミング", "再生", "plays", "streams"];
const RANK_KEYS: &[&str] = &["ランク", "順位", "rank"];
const URI_KEYS: &[&str] = &["uri", "url"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRow {
    pub title: String,
    pub plays: i64,
    pub rank: i64,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum RankingError {
    #[error("ranking file not found: {0}")]
    Missing(PathBuf),
    #[error("ranking file unreadable: {0}")]
    Io(String),
    #[error("ranking file is not UTF-8, EUC-JP or Shift_JIS")]
    Undecodable,
    #[error("ranking file has no {0} column")]
    MissingColumn(&'static str),
    #[error("ranking csv: {0}")]
    Csv(String),
}

/// Decode with a BOM-declared encoding, else the first of UTF-8, EUC-JP, Shift_JIS that decodes
/// without errors. Returns the text and the encoding name.
pub fn decode_bytes(bytes: &[u8]) -> Option<(String, &'static str)> {
    if let Some((enc, bom_len)) = encoding_rs::Encoding::for_bom(bytes) {
        return enc
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .map(|s| (s.into_owned(), enc.name()));
    }
    [
        encoding_rs::UTF_8,
        encoding_rs::EUC_JP,
        encoding_rs::SHIFT_JIS,
    ]
    .into_iter()
    .find_map(|enc| {
        enc.decode_without_bom_handling_and_without_replacement(bytes)
            .map(|s| (s.into_owned(), enc.name()))
    })
}

fn header_key(h: &str) -> String {
    h.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_column(headers: &[String], keys: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| keys.iter().any(|k| h.contains(k)))
}

fn parse_plays(cell: &str) -> i64 {
    cell.replace(',', "").trim().parse().unwrap_or(0)
}

fn parse_rank(cell: &str) -> i64 {
    cell.trim().parse().unwrap_or(RANK_MISSING)
}

/// Rank ascending, then plays descending. Stable.
pub fn sort_rows(rows: &mut [RankingRow]) {
    rows.sort_by_key(|r| (r.rank, Reverse(r.plays)));
}

/// Parse decoded CSV text into sorted rows.
pub fn parse_csv(text: &str) -> Result<Vec<RankingRow>, RankingError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| RankingError::Csv(e.to_string()))?
        .iter()
        .map(header_key)
        .collect();

    let title_col =
        find_column(&headers, TITLE_KEYS).ok_or(RankingError::MissingColumn("title"))?;
    let plays_col =
        find_column(&headers, PLAYS_KEYS).ok_or(RankingError::MissingColumn("plays"))?;
    let rank_col = find_column(&headers, RANK_KEYS);
    let uri_col = find_column(&headers, URI_KEYS);

    let mut rows = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = match rec {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line = i + 2, error = %e, "skipping unreadable ranking row");
                continue;
            }
        };
        let cell = |col: Option<usize>| col.and_then(|c| rec.get(c)).unwrap_or("").trim();
        rows.push(RankingRow {
            title: cell(Some(title_col)).to_string(),
            plays: parse_plays(cell(Some(plays_col))),
            rank: parse_rank(cell(rank_col)),
            uri: cell(uri_col).to_string(),
            slug: None,
        });
    }
    sort_rows(&mut rows);
    Ok(rows)
}

pub fn read_ranking(path: &Path) -> Result<Vec<RankingRow>, RankingError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RankingError::Missing(path.to_path_buf()))
        }
        Err(e) => return Err(RankingError::Io(e.to_string())),
    };
    let (text, encoding) = decode_bytes(&bytes).ok_or(RankingError::Undecodable)?;
    tracing::debug!(path = %path.display(), encoding, "ranking file decoded");
    parse_csv(&text)
}

/// `read_ranking`, degrading every failure to an empty ranking (logged at warn).
pub fn ingest(path: &Path) -> Vec<RankingRow> {
    match read_ranking(path) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, "ranking input unusable; writing empty ranking");
            Vec::new()
        }
    }
}

/// Attach the slug of the best-matching index title to each row (first best wins ties).
pub fn link_to_index(rows: &mut [RankingRow], index: &[IndexRow]) {
    for row in rows.iter_mut() {
        let mut best: Option<&str> = None;
        let mut best_score = 0.0_f64;
        for ep in index {
            let score = compare::join_score(&row.title, &ep.title);
            if score > best_score {
                best_score = score;
                best = Some(ep.slug.as_str());
            }
        }
        row.slug = best
            .filter(|_| best_score >= JOIN_THRESHOLD)
            .map(str::to_string);
    }
}
