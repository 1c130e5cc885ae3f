// src/sources/mediastack.rs
use metrics::counter;
use rand::Rng;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::sources::{RawItem, SourceAdapter, SourceError};

const DEFAULT_BASE_URL: &str = "http://api.mediastack.com/v1/news";
const MAX_RETRIES: u32 = 3;

/// General-news adapter over a MediaStack-shaped HTTP API. Region and
/// language are pinned (Australia/English); the keyword filter carries
/// negated terms as a coarse pre-filter only, and topic exclusion is
/// re-enforced downstream by the selection stage.
pub struct MediastackAdapter {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    sources: String,
    categories: String,
    keywords: String,
    limit: u32,
}

#[derive(Deserialize)]
struct NewsEnvelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl MediastackAdapter {
    pub fn new(api_key: &str, sources: &str, categories: &str, keywords: &str, limit: u32) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("daily-brief/0.1 (+news digest service)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            sources: sources.to_string(),
            categories: categories.to_string(),
            keywords: keywords.to_string(),
            // Upstream caps the page size at 100.
            limit: limit.min(100),
        }
    }

    /// Reads `MEDIASTACK_API_KEY`; an empty key is reported at fetch time,
    /// before any network call.
    pub fn from_env(sources: &str, categories: &str, keywords: &str, limit: u32) -> Self {
        let api_key = std::env::var("MEDIASTACK_API_KEY").unwrap_or_default();
        Self::new(&api_key, sources, categories, keywords, limit)
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("access_key", self.api_key.clone()),
            ("countries", "au".to_string()),
            ("languages", "en".to_string()),
            ("limit", self.limit.to_string()),
        ];
        if !self.sources.is_empty() {
            params.push(("sources", self.sources.clone()));
        }
        if !self.categories.is_empty() {
            params.push(("categories", self.categories.clone()));
        }
        if !self.keywords.is_empty() {
            params.push(("keywords", self.keywords.clone()));
        }
        params
    }

    /// One-shot multi-country headline snapshot, returned as the upstream
    /// envelope without any processing. Serves the raw diagnostic endpoint.
    pub async fn headline_snapshot(&self) -> Result<serde_json::Value, SourceError> {
        if self.api_key.is_empty() {
            return Err(SourceError::MissingCredentials("MEDIASTACK_API_KEY"));
        }
        let params = [
            ("access_key", self.api_key.clone()),
            ("countries", "au,us,gb".to_string()),
            ("languages", "en".to_string()),
            ("limit", "5".to_string()),
        ];
        let resp = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }
        Ok(resp.json().await?)
    }

    async fn fetch_with_backoff(&self) -> Result<Vec<RawItem>, SourceError> {
        let mut attempt: u32 = 0;
        loop {
            let resp = self
                .http
                .get(&self.base_url)
                .query(&self.query())
                .send()
                .await?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS {
                counter!("source_rate_limited_total").increment(1);
                if attempt >= MAX_RETRIES {
                    return Err(SourceError::RateLimited {
                        attempts: attempt + 1,
                    });
                }
                // Exponential backoff: 1s base, doubling, jitter up to 1s.
                let jitter = rand::rng().random_range(0..1000u64);
                let delay = Duration::from_millis(1000u64 * (1u64 << attempt) + jitter);
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "mediastack rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !resp.status().is_success() {
                return Err(SourceError::Status(resp.status().as_u16()));
            }

            let envelope: NewsEnvelope = resp.json().await?;
            // Missing or non-array `data` means an empty batch, not an error.
            let items = envelope
                .data
                .and_then(|v| serde_json::from_value::<Vec<RawItem>>(v).ok())
                .unwrap_or_default();
            return Ok(items);
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for MediastackAdapter {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, SourceError> {
        if self.api_key.is_empty() {
            return Err(SourceError::MissingCredentials("MEDIASTACK_API_KEY"));
        }
        let items = self.fetch_with_backoff().await?;
        counter!("source_items_total", "source" => "mediastack").increment(items.len() as u64);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "MediaStack"
    }
}

/// Comma-join a deny-list into the upstream keyword syntax (`-term,-term`).
pub fn negate_keywords(excluded: &str) -> String {
    excluded
        .split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| format!("-{k}"))
        .collect::<Vec<_>>()
        .join(",")
}
