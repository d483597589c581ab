use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("feed parse failed: {0}")]
    Feed(String),
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("output failed: {0}")]
    Output(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Primary category used when no pathogen label matched.
pub const UNCLASSIFIED: &str = "その他";

/// Study design used when no rule matched.
pub const UNDETERMINED: &str = "不明";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the operation (network + body read).
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            max_bytes: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub truncated: bool,
    pub timings_ms: BTreeMap<String, u128>,
}

impl FetchResponse {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// One `<item>` of a syndication feed, as found in the document (no normalization applied).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
    pub guid: Option<String>,
    pub description: Option<String>,
    /// Vendor `*:summary` extension (e.g. `itunes:summary`).
    pub summary_ext: Option<String>,
    /// Vendor `*:encoded` extension (e.g. `content:encoded`).
    pub encoded_ext: Option<String>,
}

/// Full per-episode document (detail tier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    pub journal: String,
    pub infection_type: String,
    pub pathogens: Vec<String>,
    pub topics: Vec<String>,
    pub tags: Vec<String>,
    pub study_design: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubmed_url: Option<String>,
}

/// Lightweight listing row (index tier): the record with `summary` replaced by `summary_short`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRow {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
    pub journal: String,
    pub infection_type: String,
    pub pathogens: Vec<String>,
    pub topics: Vec<String>,
    pub tags: Vec<String>,
    pub study_design: String,
    pub summary_short: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubmed_url: Option<String>,
}

impl IndexRow {
    pub fn from_record(rec: &EpisodeRecord, summary_short: String) -> Self {
        Self {
            id: rec.id.clone(),
            slug: rec.slug.clone(),
            title: rec.title.clone(),
            url: rec.url.clone(),
            pub_date: rec.pub_date.clone(),
            journal: rec.journal.clone(),
            infection_type: rec.infection_type.clone(),
            pathogens: rec.pathogens.clone(),
            topics: rec.topics.clone(),
            tags: rec.tags.clone(),
            study_design: rec.study_design.clone(),
            summary_short,
            paper_url: rec.paper_url.clone(),
            pubmed_url: rec.pubmed_url.clone(),
        }
    }
}

/// A bibliographic link accepted by a resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLink {
    /// Canonical public link (e.g. `https://doi.org/<doi>`).
    pub url: String,
    /// Upstream identifier (DOI, PMID, ...).
    pub identifier: String,
    /// Similarity score, for resolvers that rank candidates.
    pub score: Option<f64>,
}

/// Best-effort title → link lookup against one external service.
///
/// `Ok(None)` means the service answered but nothing acceptable matched; `Err` means the call
/// itself failed. Callers treat both as "no link".
#[async_trait::async_trait]
pub trait LinkResolver: Send + Sync {
    fn name(&self) -> &'static str;
    /// Upper bound for a single `resolve` call.
    fn timeout(&self) -> Duration;
    async fn resolve(&self, title: &str) -> Result<Option<ResolvedLink>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EpisodeRecord {
        EpisodeRecord {
            id: "guid-1".to_string(),
            slug: "0123456789abcdef".to_string(),
            title: "t".to_string(),
            url: "https://example.com/e/1".to_string(),
            pub_date: "Mon, 01 Jan 2024 00:00:00 GMT".to_string(),
            journal: String::new(),
            infection_type: UNCLASSIFIED.to_string(),
            pathogens: vec![],
            topics: vec![],
            tags: vec![],
            study_design: UNDETERMINED.to_string(),
            summary: "line one\nline two".to_string(),
            paper_url: None,
            pubmed_url: Some("https://pubmed.ncbi.nlm.nih.gov/1/".to_string()),
        }
    }

    #[test]
    fn record_uses_pub_date_key_and_omits_missing_links() {
        let v = serde_json::to_value(record()).unwrap();
        assert_eq!(v["pubDate"], "Mon, 01 Jan 2024 00:00:00 GMT");
        assert!(v.get("pub_date").is_none());
        assert!(v.get("paper_url").is_none());
        assert_eq!(v["pubmed_url"], "https://pubmed.ncbi.nlm.nih.gov/1/");
    }

    #[test]
    fn index_row_swaps_summary_for_short_form() {
        let rec = record();
        let row = IndexRow::from_record(&rec, "line one".to_string());
        let v = serde_json::to_value(&row).unwrap();
        assert!(v.get("summary").is_none());
        assert_eq!(v["summary_short"], "line one");
        assert_eq!(row.slug, rec.slug);
    }
}
