//! Bibliographic link lookups (Crossref works search, PubMed esearch).
//!
//! Both lookups are best-effort: callers treat `Ok(None)` and `Err` alike as "no link", but the
//! distinction is kept so failures can be logged differently from plain misses.
//!
//! Endpoints are overridable so fixtures can stand in for the public APIs.

use crate::classify::Classifier;
use crate::compare;
use crate::textprep;
use epicast_core::{Error, LinkResolver, ResolvedLink, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CROSSREF_ENDPOINT: &str = "https://api.crossref.org/works";
pub const DEFAULT_PUBMED_ENDPOINT: &str =
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 8_000;

/// Minimum score for accepting a Crossref candidate.
pub const ACCEPT_THRESHOLD: f64 = 0.5;
/// Added when a candidate's container title is a known journal.
pub const KNOWN_JOURNAL_BONUS: f64 = 0.05;
const CROSSREF_ROWS: &str = "5";

fn parse_endpoint(s: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse(s.trim()).map_err(|e| Error::InvalidUrl(format!("{s}: {e}")))
}

async fn get_json<T: serde::de::DeserializeOwned>(
    http: &reqwest::Client,
    service: &str,
    url: reqwest::Url,
    timeout: Duration,
) -> Result<T> {
    let resp = http
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::Lookup(format!("{service}: {e}")))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Lookup(format!(
            "{service}: HTTP {}",
            status.as_u16()
        )));
    }
    resp.json::<T>()
        .await
        .map_err(|e| Error::Lookup(format!("{service}: bad json: {e}")))
}

/// Scored candidate from a works search.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub container: String,
    pub doi: Option<String>,
}

/// Pick the best candidate for `title`: strictly-greater updates only (the first of equal scores
/// wins), candidates without a DOI never win, and the best must reach `ACCEPT_THRESHOLD`.
pub fn pick_best(
    classifier: &Classifier,
    title: &str,
    candidates: &[Candidate],
) -> Option<(String, f64)> {
    let mut best: Option<&str> = None;
    let mut best_score = 0.0_f64;
    for c in candidates {
        let mut score = compare::similarity(title, &c.title);
        if !c.container.is_empty() && !classifier.guess_journal(&c.container).is_empty() {
            score += KNOWN_JOURNAL_BONUS;
        }
        if score > best_score {
            if let Some(doi) = c.doi.as_deref().filter(|d| !d.trim().is_empty()) {
                best = Some(doi);
                best_score = score;
            }
        }
    }
    best.filter(|_| best_score >= ACCEPT_THRESHOLD)
        .map(|doi| (doi.trim().to_string(), best_score))
}

#[derive(Debug, Clone)]
pub struct CrossrefResolver {
    http: reqwest::Client,
    classifier: Arc<Classifier>,
    endpoint: String,
    timeout: Duration,
}

impl CrossrefResolver {
    pub fn new(http: reqwest::Client, classifier: Arc<Classifier>) -> Self {
        Self {
            http,
            classifier,
            endpoint: DEFAULT_CROSSREF_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn candidates(&self, query: &str) -> Result<Vec<Candidate>> {
        let mut url = parse_endpoint(&self.endpoint)?;
        url.query_pairs_mut()
            .append_pair("query.title", query)
            .append_pair("rows", CROSSREF_ROWS);

        #[derive(Debug, Deserialize)]
        struct Resp {
            message: Option<Message>,
        }
        #[derive(Debug, Deserialize)]
        struct Message {
            items: Option<Vec<Item>>,
        }
        #[derive(Debug, Deserialize)]
        struct Item {
            title: Option<Vec<String>>,
            #[serde(rename = "container-title")]
            container_title: Option<Vec<String>>,
            #[serde(rename = "DOI")]
            doi: Option<String>,
        }

        let parsed: Resp = get_json(&self.http, self.name(), url, self.timeout).await?;
        let items = parsed
            .message
            .and_then(|m| m.items)
            .unwrap_or_default();
        Ok(items
            .into_iter()
            .map(|it| Candidate {
                title: it
                    .title
                    .and_then(|v| v.into_iter().next())
                    .unwrap_or_default(),
                container: it
                    .container_title
                    .and_then(|v| v.into_iter().next())
                    .unwrap_or_default(),
                doi: it.doi,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl LinkResolver for CrossrefResolver {
    fn name(&self) -> &'static str {
        "crossref"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn resolve(&self, title: &str) -> Result<Option<ResolvedLink>> {
        let query = textprep::normalize(title);
        if query.is_empty() {
            return Ok(None);
        }
        let candidates = self.candidates(&query).await?;
        Ok(
            pick_best(&self.classifier, title, &candidates).map(|(doi, score)| ResolvedLink {
                url: format!("https://doi.org/{doi}"),
                identifier: doi,
                score: Some(score),
            }),
        )
    }
}

#[derive(Debug, Clone)]
pub struct PubmedResolver {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl PubmedResolver {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: DEFAULT_PUBMED_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl LinkResolver for PubmedResolver {
    fn name(&self) -> &'static str {
        "pubmed"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn resolve(&self, title: &str) -> Result<Option<ResolvedLink>> {
        let term = textprep::normalize(title);
        if term.is_empty() {
            return Ok(None);
        }
        let mut url = parse_endpoint(&self.endpoint)?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("retmode", "json")
            .append_pair("sort", "relevance")
            .append_pair("retmax", "1")
            .append_pair("term", &term);

        #[derive(Debug, Deserialize)]
        struct Resp {
            esearchresult: Option<SearchResult>,
        }
        #[derive(Debug, Deserialize)]
        struct SearchResult {
            idlist: Option<Vec<String>>,
        }

        let parsed: Resp = get_json(&self.http, self.name(), url, self.timeout).await?;
        let pmid = parsed
            .esearchresult
            .and_then(|r| r.idlist)
            .and_then(|ids| ids.into_iter().next())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        Ok(pmid.map(|id| ResolvedLink {
            url: format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"),
            identifier: id,
            score: None,
        }))
    }
}
