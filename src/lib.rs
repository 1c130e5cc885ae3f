// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod ai;
pub mod api;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod rewrite;
pub mod select;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::cache::{CacheSlot, FileStore, MemoryStore, SlotStore, StreamKey};
pub use crate::pipeline::{general_stream, uplifting_stream, Orchestrator, StreamDescriptor};
pub use crate::rewrite::ProcessedItem;

use std::sync::Arc;

use crate::ai::openai::OpenAiClient;
use crate::config::{PipelineConfig, GENERAL_NEWS_FILTERS};
use crate::sources::mediastack::{negate_keywords, MediastackAdapter};
use crate::sources::reddit::RedditAdapter;

/// Wire the whole application from configuration and environment: the two
/// stream descriptors, the live orchestrator over an in-memory store, and
/// the durable file store for the scheduled path. Missing secrets are not
/// an error here; adapters report them at request time, before any
/// network call.
pub fn build_app_state(cfg: &PipelineConfig) -> AppState {
    let filters = &GENERAL_NEWS_FILTERS;
    let general_adapter = Arc::new(MediastackAdapter::from_env(
        filters.sources,
        filters.categories,
        &negate_keywords(filters.excluded_keywords),
        cfg.general.fetch_limit,
    ));
    let uplifting_adapter = Arc::new(RedditAdapter::from_env(cfg.uplifting.fetch_limit));

    let client: ai::DynCompletion = Arc::new(OpenAiClient::from_env(&cfg.completion_model));
    let store = Arc::new(MemoryStore::new());
    let orchestrator = Orchestrator::new(
        client,
        store,
        cache::ttl_ms(cfg.cache_ttl_hours),
        vec![
            general_stream(general_adapter.clone(), &cfg.general),
            uplifting_stream(uplifting_adapter, &cfg.uplifting),
        ],
    );

    AppState {
        orchestrator: Arc::new(orchestrator),
        durable: Arc::new(FileStore::new(&cfg.store_dir)),
        serve_mode: cfg.serve_mode,
        raw_probe: general_adapter,
    }
}
