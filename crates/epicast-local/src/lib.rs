use epicast_core::{Error, FetchBackend, FetchRequest, FetchResponse, Result};
use std::collections::BTreeMap;
use std::time::Duration;

pub mod classify;
pub mod compare;
pub mod compose;
pub mod design;
pub mod feed;
pub mod identity;
pub mod papers;
pub mod pipeline;
pub mod ranking;
pub mod rewrite;
pub mod summary;
pub mod tables;
pub mod textprep;

const USER_AGENT: &str = concat!("epicast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct LocalFetcher {
    client: reqwest::Client,
}

impl LocalFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            // Per-request timeouts (FetchRequest.timeout_ms) still apply on top of these.
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client })
    }

    /// Shared HTTP client, for the link resolvers.
    pub fn client(&self) -> reqwest::Client {
        self.client.clone()
    }
}

#[async_trait::async_trait]
impl FetchBackend for LocalFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let started = std::time::Instant::now();
        let url =
            url::Url::parse(req.url.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut get = self.client.get(url);
        if let Some(timeout) = req.timeout() {
            get = get.timeout(timeout);
        }
        let mut resp = get.send().await.map_err(|e| Error::Fetch(e.to_string()))?;
        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let limit = req.max_bytes.map_or(usize::MAX, |n| n as usize);
        let mut body: Vec<u8> = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = resp.chunk().await.map_err(|e| Error::Fetch(e.to_string()))? {
            let room = limit - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let elapsed = started.elapsed().as_millis();
        tracing::debug!(
            url = %req.url,
            status,
            bytes = body.len(),
            truncated,
            elapsed_ms = elapsed as u64,
            "fetched"
        );
        Ok(FetchResponse {
            url: req.url.clone(),
            final_url,
            status,
            content_type,
            bytes: body,
            truncated,
            timings_ms: BTreeMap::from([("network_fetch".to_string(), elapsed)]),
        })
    }
}
