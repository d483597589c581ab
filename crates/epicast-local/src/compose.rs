//! Two-tier output: `index.json` plus one `episodes/<slug>.json` per episode.

use crate::summary;
use epicast_core::{EpisodeRecord, Error, IndexRow, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.json";
pub const EPISODES_DIR: &str = "episodes";

/// How the index is ordered by `pubDate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrder {
    /// Descending by the raw date string.
    #[default]
    Raw,
    /// Newest first by RFC 2822 date; unparsable dates follow in feed order.
    Calendar,
}

impl std::str::FromStr for DateOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "calendar" => Ok(Self::Calendar),
            other => Err(Error::Config(format!(
                "unknown date order {other:?} (expected raw|calendar)"
            ))),
        }
    }
}

fn timestamp(pub_date: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc2822(pub_date.trim())
        .ok()
        .map(|d| d.timestamp())
}

/// Stable in-place sort of index rows.
pub fn sort_index(rows: &mut [IndexRow], order: DateOrder) {
    match order {
        DateOrder::Raw => rows.sort_by(|a, b| b.pub_date.cmp(&a.pub_date)),
        DateOrder::Calendar => rows.sort_by_key(|r| match timestamp(&r.pub_date) {
            Some(t) => (false, Reverse(t)),
            None => (true, Reverse(0)),
        }),
    }
}

/// Index rows for `records`, sorted.
pub fn build_index(records: &[EpisodeRecord], order: DateOrder) -> Vec<IndexRow> {
    let mut rows: Vec<IndexRow> = records
        .iter()
        .map(|r| IndexRow::from_record(r, summary::short_summary(&r.summary)))
        .collect();
    sort_index(&mut rows, order);
    rows
}

fn io_err(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Output(format!("{}: {e}", path.display()))
}

/// Write pretty JSON next to `path` and rename it into place.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_err(dir, e))?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(|e| io_err(path, e))?;
    tmp.write_all(b"\n").map_err(|e| io_err(path, e))?;
    tmp.persist(path).map_err(|e| io_err(path, e.error))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSummary {
    pub index_path: PathBuf,
    pub episodes_written: usize,
    pub orphans_removed: Vec<PathBuf>,
}

/// Write every detail document, then the index. Each file is replaced atomically.
pub fn write_outputs(
    out_dir: &Path,
    records: &[EpisodeRecord],
    order: DateOrder,
    prune: bool,
) -> Result<OutputSummary> {
    let episodes_dir = out_dir.join(EPISODES_DIR);
    for rec in records {
        write_json_atomic(&episodes_dir.join(format!("{}.json", rec.slug)), rec)?;
    }
    let index = build_index(records, order);
    let index_path = out_dir.join(INDEX_FILE);
    write_json_atomic(&index_path, &index)?;

    let orphans_removed = if prune {
        let keep: BTreeSet<String> = records.iter().map(|r| r.slug.clone()).collect();
        prune_orphans(&episodes_dir, &keep)?
    } else {
        Vec::new()
    };

    tracing::info!(
        dir = %out_dir.display(),
        episodes = records.len(),
        pruned = orphans_removed.len(),
        "outputs written"
    );
    Ok(OutputSummary {
        index_path,
        episodes_written: records.len(),
        orphans_removed,
    })
}

/// Delete `*.json` files in `episodes_dir` whose stem is not in `keep`. Returns deleted paths.
pub fn prune_orphans(episodes_dir: &Path, keep: &BTreeSet<String>) -> Result<Vec<PathBuf>> {
    let rd = match std::fs::read_dir(episodes_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(episodes_dir, e)),
    };
    let mut removed = Vec::new();
    for entry in rd.flatten() {
        let p = entry.path();
        if p.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = p.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if keep.contains(stem) {
            continue;
        }
        std::fs::remove_file(&p).map_err(|e| io_err(&p, e))?;
        tracing::debug!(path = %p.display(), "removed orphaned episode document");
        removed.push(p);
    }
    removed.sort();
    Ok(removed)
}
