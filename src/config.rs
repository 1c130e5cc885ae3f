// src/config.rs
// Tunables from config/pipeline.toml (env-overridable path) with defaults;
// secrets stay in the environment and are read by the adapters themselves.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

fn default_ttl_hours() -> u64 {
    24
}
fn default_fetch_limit() -> u32 {
    50
}
fn default_select_min() -> u32 {
    5
}
fn default_select_max() -> u32 {
    7
}
fn default_uplifting_select_max() -> u32 {
    10
}
fn default_fallback_prefix() -> usize {
    5
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_store_dir() -> String {
    "cache/streams".to_string()
}

/// How the serving endpoints obtain their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServeMode {
    /// Request-time pipeline over the in-memory store, single-flight
    /// guarded.
    Live,
    /// Read-only serving from the durable store; 404 until the scheduled
    /// trigger has written it.
    Produced,
}

impl Default for ServeMode {
    fn default() -> Self {
        ServeMode::Live
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralTuning {
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
    /// Selected-count bounds are configuration, not constants; editorial
    /// revisions keep moving them.
    #[serde(default = "default_select_min")]
    pub select_min: u32,
    #[serde(default = "default_select_max")]
    pub select_max: u32,
    #[serde(default = "default_fallback_prefix")]
    pub fallback_prefix: usize,
}

impl Default for GeneralTuning {
    fn default() -> Self {
        Self {
            fetch_limit: default_fetch_limit(),
            select_min: default_select_min(),
            select_max: default_select_max(),
            fallback_prefix: default_fallback_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpliftingTuning {
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
    #[serde(default = "default_uplifting_select_max")]
    pub select_max: u32,
}

impl Default for UpliftingTuning {
    fn default() -> Self {
        Self {
            fetch_limit: default_fetch_limit(),
            select_max: default_uplifting_select_max(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_ttl_hours")]
    pub cache_ttl_hours: u64,
    #[serde(default = "default_model")]
    pub completion_model: String,
    #[serde(default)]
    pub serve_mode: ServeMode,
    /// Directory for the durable per-stream JSON documents.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
    #[serde(default)]
    pub general: GeneralTuning,
    #[serde(default)]
    pub uplifting: UpliftingTuning,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_hours: default_ttl_hours(),
            completion_model: default_model(),
            serve_mode: ServeMode::default(),
            store_dir: default_store_dir(),
            general: GeneralTuning::default(),
            uplifting: UpliftingTuning::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: PipelineConfig = toml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load using `$PIPELINE_CONFIG_PATH`, falling back to
    /// `config/pipeline.toml`, falling back to defaults. A present but
    /// malformed file is an error; a missing one is not.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Query-level filters for the general-news source. The keyword deny-list
/// is a coarse pre-filter only; selection re-enforces topic exclusion.
pub struct GeneralNewsFilters {
    pub sources: &'static str,
    pub categories: &'static str,
    pub excluded_keywords: &'static str,
}

pub const GENERAL_NEWS_FILTERS: GeneralNewsFilters = GeneralNewsFilters {
    sources: "abc-news-au,crikey,the-age",
    categories: "general,business,health,science,technology",
    excluded_keywords: "football,soccer,cricket,rugby,basketball,nba,a-league,grand final,\
celebrity,actor,singer,movie,tv show,gossip,entertainment,lifestyle,fashion,travel,food,\
recipe,local news,shop,store,sport,game,league,club,player,coach,score,win,lose,final",
};
