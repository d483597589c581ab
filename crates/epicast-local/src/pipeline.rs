//! Feed item → episode record.
//!
//! Everything except the link lookups is pure and runs on the shared, read-only classifier.
//! Lookups are bounded by each resolver's timeout and never fail the record.

use crate::classify::Classifier;
use crate::identity;
use crate::rewrite::UrlRewriteRules;
use crate::summary;
use crate::textprep;
use epicast_core::{EpisodeRecord, FeedItem, LinkResolver};
use futures_util::StreamExt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Pipeline {
    classifier: Arc<Classifier>,
    rewrite: UrlRewriteRules,
    paper: Option<Arc<dyn LinkResolver>>,
    pubmed: Option<Arc<dyn LinkResolver>>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self {
            classifier,
            rewrite: UrlRewriteRules::default(),
            paper: None,
            pubmed: None,
            concurrency: 1,
        }
    }

    pub fn with_rewrite(mut self, rewrite: UrlRewriteRules) -> Self {
        self.rewrite = rewrite;
        self
    }

    /// Resolver for `paper_url` (publisher link via DOI).
    pub fn with_paper_resolver(mut self, r: Arc<dyn LinkResolver>) -> Self {
        self.paper = Some(r);
        self
    }

    /// Resolver for `pubmed_url`.
    pub fn with_pubmed_resolver(mut self, r: Arc<dyn LinkResolver>) -> Self {
        self.pubmed = Some(r);
        self
    }

    /// Items processed at once. Output order is feed order regardless.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// The record without link lookups.
    pub fn prepare(&self, item: &FeedItem) -> EpisodeRecord {
        let raw_title = item.title.as_deref().unwrap_or("");
        let title = textprep::normalize(raw_title);
        let link = textprep::normalize(item.link.as_deref().unwrap_or(""));
        let id = identity::episode_id(
            item.guid.as_deref(),
            Some(link.as_str()),
            Some(title.as_str()),
        );
        let slug = identity::slug(&id);
        let c = self.classifier.classify(raw_title);

        EpisodeRecord {
            id,
            slug,
            url: self.rewrite.apply(&link),
            pub_date: textprep::normalize(item.pub_date.as_deref().unwrap_or("")),
            journal: c.journal,
            infection_type: c.infection_type,
            pathogens: c.pathogens,
            topics: c.topics,
            tags: c.tags,
            study_design: c.study_design,
            summary: summary::extract(item),
            paper_url: None,
            pubmed_url: None,
            title,
        }
    }

    pub async fn build_record(&self, item: &FeedItem) -> EpisodeRecord {
        let mut rec = self.prepare(item);
        if let Some(r) = &self.paper {
            rec.paper_url = lookup(r.as_ref(), &rec.title).await;
        }
        if let Some(r) = &self.pubmed {
            rec.pubmed_url = lookup(r.as_ref(), &rec.title).await;
        }
        rec
    }

    /// Build every record, in feed order.
    pub async fn run(&self, items: &[FeedItem]) -> Vec<EpisodeRecord> {
        tracing::info!(
            items = items.len(),
            concurrency = self.concurrency,
            lookups = self.paper.is_some() || self.pubmed.is_some(),
            "building records"
        );
        futures_util::stream::iter(items.iter().map(|it| self.build_record(it)))
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// One bounded lookup. Misses log at debug, failures and timeouts at warn; all yield `None`.
async fn lookup(resolver: &dyn LinkResolver, title: &str) -> Option<String> {
    if title.is_empty() {
        return None;
    }
    let name = resolver.name();
    match tokio::time::timeout(resolver.timeout(), resolver.resolve(title)).await {
        Ok(Ok(Some(link))) => {
            tracing::debug!(resolver = name, title, url = %link.url, "link resolved");
            Some(link.url)
        }
        Ok(Ok(None)) => {
            tracing::debug!(resolver = name, title, "no acceptable match");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!(resolver = name, title, error = %e, "lookup failed");
            None
        }
        Err(_) => {
            tracing::warn!(
                resolver = name,
                title,
                timeout_ms = resolver.timeout().as_millis() as u64,
                "lookup timed out"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epicast_core::{Error, ResolvedLink, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone, Copy)]
    enum Answer {
        Hit,
        Miss,
        Fail,
        Hang,
    }

    struct Fake {
        answer: Answer,
        calls: AtomicUsize,
        /// Slower for titles that sort earlier, so completion order is reversed.
        staggered: bool,
    }

    impl Fake {
        fn new(answer: Answer) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
                staggered: false,
            })
        }
    }

    #[async_trait::async_trait]
    impl LinkResolver for Fake {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(100)
        }

        async fn resolve(&self, title: &str) -> Result<Option<ResolvedLink>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.staggered {
                let n: u64 = title.trim_start_matches("ep ").parse().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(60 - n * 10)).await;
            }
            match self.answer {
                Answer::Hit => Ok(Some(ResolvedLink {
                    url: format!("https://doi.org/10.1/{title}"),
                    identifier: title.to_string(),
                    score: Some(1.0),
                })),
                Answer::Miss => Ok(None),
                Answer::Fail => Err(Error::Lookup("boom".to_string())),
                Answer::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(None)
                }
            }
        }
    }

    fn classifier() -> Arc<Classifier> {
        Arc::new(Classifier::builtin().unwrap())
    }

    fn item(title: &str) -> FeedItem {
        FeedItem {
            title: Some(title.to_string()),
            ..FeedItem::default()
        }
    }

    #[test]
    fn prepare_fills_every_offline_field() {
        let p = Pipeline::new(classifier());
        let it = FeedItem {
            title: Some(" COVID-19ワクチンの有効性：前向きコホート研究\u{3000}NEJM ".to_string()),
            link: Some(" https://podcasters.spotify.com/pod/profile/show/episodes/ep-1 ".to_string()),
            pub_date: Some("Mon, 01 Jan 2024 00:00:00 GMT".to_string()),
            guid: None,
            description: Some("<p>one</p><p>two</p>".to_string()),
            ..FeedItem::default()
        };
        let rec = p.prepare(&it);
        assert_eq!(rec.title, "COVID-19ワクチンの有効性：前向きコホート研究 NEJM");
        // Id comes from the link as published, the url from the rewritten link.
        assert_eq!(
            rec.id,
            "https://podcasters.spotify.com/pod/profile/show/episodes/ep-1"
        );
        assert_eq!(
            rec.url,
            "https://creators.spotify.com/pod/show/show/episodes/ep-1"
        );
        assert_eq!(rec.slug, identity::slug(&rec.id));
        assert_eq!(rec.journal, "NEJM");
        assert_eq!(rec.pathogens, vec!["COVID-19"]);
        assert_eq!(rec.topics, vec!["ワクチン"]);
        assert_eq!(rec.study_design, "前向きコホート");
        assert_eq!(rec.summary, "one\n\ntwo");
        assert_eq!(rec.paper_url, None);
    }

    #[test]
    fn guid_wins_and_missing_fields_become_empty() {
        let p = Pipeline::new(classifier());
        let rec = p.prepare(&FeedItem {
            guid: Some("abc".to_string()),
            ..FeedItem::default()
        });
        assert_eq!(rec.id, "abc");
        assert_eq!(rec.slug, "ba7816bf8f01cfea");
        assert_eq!(rec.title, "");
        assert_eq!(rec.url, "");
        assert_eq!(rec.infection_type, epicast_core::UNCLASSIFIED);
    }

    #[tokio::test]
    async fn lookup_outcomes_map_to_optional_links() {
        let hit = Fake::new(Answer::Hit);
        let p = Pipeline::new(classifier())
            .with_paper_resolver(hit.clone())
            .with_pubmed_resolver(Fake::new(Answer::Miss));
        let rec = p.build_record(&item("Dengue")).await;
        assert_eq!(rec.paper_url.as_deref(), Some("https://doi.org/10.1/Dengue"));
        assert_eq!(rec.pubmed_url, None);

        let p = Pipeline::new(classifier()).with_paper_resolver(Fake::new(Answer::Fail));
        assert_eq!(p.build_record(&item("Dengue")).await.paper_url, None);
    }

    #[tokio::test]
    async fn hung_lookup_is_cut_off_by_its_timeout() {
        let p = Pipeline::new(classifier()).with_pubmed_resolver(Fake::new(Answer::Hang));
        let t0 = std::time::Instant::now();
        let rec = p.build_record(&item("Dengue")).await;
        assert_eq!(rec.pubmed_url, None);
        assert!(t0.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn empty_title_skips_lookups() {
        let r = Fake::new(Answer::Hit);
        let p = Pipeline::new(classifier()).with_paper_resolver(r.clone());
        let rec = p.build_record(&item("   ")).await;
        assert_eq!(rec.paper_url, None);
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_run_keeps_feed_order() {
        let r = Arc::new(Fake {
            answer: Answer::Hit,
            calls: AtomicUsize::new(0),
            staggered: true,
        });
        let items: Vec<FeedItem> = (0..5).map(|i| item(&format!("ep {i}"))).collect();

        let sequential = Pipeline::new(classifier())
            .with_paper_resolver(r.clone())
            .run(&items)
            .await;
        let concurrent = Pipeline::new(classifier())
            .with_paper_resolver(r.clone())
            .with_concurrency(4)
            .run(&items)
            .await;

        assert_eq!(sequential, concurrent);
        let titles: Vec<&str> = concurrent.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["ep 0", "ep 1", "ep 2", "ep 3", "ep 4"]);
        assert_eq!(
            concurrent[3].paper_url.as_deref(),
            Some("https://doi.org/10.1/ep 3")
        );
        assert_eq!(r.calls.load(Ordering::SeqCst), 10);
    }
}
