// src/sources/reddit.rs
use metrics::counter;
use serde::Deserialize;
use std::time::Duration;

use crate::sources::{RawItem, SourceAdapter, SourceError};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const DEFAULT_API_BASE_URL: &str = "https://oauth.reddit.com";
const FEED_PATH: &str = "r/upliftingnews/top";
const USER_AGENT: &str = "daily-brief/0.1 by /u/dailybrief";

#[derive(Debug, Clone, Default)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl RedditCredentials {
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).unwrap_or_default();
        Self {
            client_id: var("REDDIT_CLIENT_ID"),
            client_secret: var("REDDIT_CLIENT_SECRET"),
            username: var("REDDIT_USERNAME"),
            password: var("REDDIT_PASSWORD"),
        }
    }

    fn missing_field(&self) -> Option<&'static str> {
        if self.client_id.is_empty() {
            Some("REDDIT_CLIENT_ID")
        } else if self.client_secret.is_empty() {
            Some("REDDIT_CLIENT_SECRET")
        } else if self.username.is_empty() {
            Some("REDDIT_USERNAME")
        } else if self.password.is_empty() {
            Some("REDDIT_PASSWORD")
        } else {
            None
        }
    }
}

/// Uplifting-news adapter over the Reddit OAuth API. Pulls the top listing
/// for a 24-hour window from a single fixed community feed. Tokens are
/// exchanged fresh on every run via the password grant; nothing is cached.
pub struct RedditAdapter {
    http: reqwest::Client,
    creds: RedditCredentials,
    token_url: String,
    api_base_url: String,
    limit: u32,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct Post {
    title: Option<String>,
    url: Option<String>,
    subreddit_name_prefixed: Option<String>,
    selftext: Option<String>,
    created_utc: Option<f64>,
}

impl RedditAdapter {
    pub fn new(creds: RedditCredentials, limit: u32) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            creds,
            token_url: TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            limit,
        }
    }

    pub fn from_env(limit: u32) -> Self {
        Self::new(RedditCredentials::from_env(), limit)
    }

    pub fn with_urls(mut self, token_url: &str, api_base_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_base_url = api_base_url.to_string();
        self
    }

    /// Password-grant token exchange. Client credentials ride in the basic
    /// auth header, resource-owner credentials in the form body.
    pub async fn authenticate(&self) -> Result<String, SourceError> {
        if let Some(field) = self.creds.missing_field() {
            return Err(SourceError::MissingCredentials(field));
        }

        let form = [
            ("grant_type", "password"),
            ("username", self.creds.username.as_str()),
            ("password", self.creds.password.as_str()),
        ];
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .form(&form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let body: TokenResponse = resp.json().await?;
        body.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SourceError::InvalidShape("token response missing access_token".into()))
    }

    pub async fn fetch_top(&self, token: &str) -> Result<Vec<RawItem>, SourceError> {
        let url = format!("{}/{}", self.api_base_url, FEED_PATH);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", self.limit.to_string()), ("t", "day".to_string())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let body: serde_json::Value = resp.json().await?;
        // The listing must carry `data.children` as an array; anything else
        // is a schema error the orchestrator can abort the stream on.
        let children = body
            .pointer("/data/children")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SourceError::InvalidShape("listing missing data.children array".into())
            })?;

        let mut out = Vec::with_capacity(children.len());
        for child in children {
            let post: Post = match child.get("data") {
                Some(data) => serde_json::from_value(data.clone())
                    .map_err(|e| SourceError::InvalidShape(format!("bad post payload: {e}")))?,
                None => continue,
            };
            out.push(RawItem {
                title: post.title,
                url: post.url,
                source: post.subreddit_name_prefixed,
                description: post.selftext.filter(|s| !s.trim().is_empty()),
                published_at: post.created_utc.map(|ts| {
                    chrono::DateTime::from_timestamp(ts as i64, 0)
                        .map(|dt| dt.to_rfc3339())
                        .unwrap_or_default()
                }),
                ..RawItem::default()
            });
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for RedditAdapter {
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, SourceError> {
        let token = self.authenticate().await?;
        let items = self.fetch_top(&token).await?;
        counter!("source_items_total", "source" => "reddit").increment(items.len() as u64);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "Reddit"
    }
}
