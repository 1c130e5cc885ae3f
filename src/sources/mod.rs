// src/sources/mod.rs
pub mod mediastack;
pub mod reddit;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One article as delivered by an upstream source, before any judgment.
/// Immutable once fetched; retained only inside the cache's raw slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
}

/// Typed failure surface of a source adapter. The orchestrator matches on
/// this to decide status codes and stream aborts.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("unexpected response shape: {0}")]
    InvalidShape(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetch the current batch from the upstream. A fresh auth handshake, if
    /// the source needs one, happens inside this call; no token is cached
    /// across runs.
    async fn fetch_latest(&self) -> Result<Vec<RawItem>, SourceError>;
    fn name(&self) -> &'static str;
}
