// src/pipeline.rs
//! # Pipeline Orchestrator
//! Sequences fetch → normalize → select → rewrite → store per content
//! stream, decides fetch-vs-reuse-cache, and produces the served payload.
//! One parametrized pipeline; the two streams differ only in their
//! descriptors (source adapter, prompts, bounds, fallback policy, rewrite
//! style).

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::ai::DynCompletion;
use crate::cache::{now_ms, CacheSlot, SlotStore, StreamKey};
use crate::config::{GeneralTuning, UpliftingTuning};
use crate::normalize::normalize_batch;
use crate::rewrite::{rewrite_batch, ProcessedItem, RewriteOutcome, RewriteStyle};
use crate::select::{select, SelectionFallback, SelectionPolicy};
use crate::sources::{SourceAdapter, SourceError};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("cache_hits_total", "Serving requests answered from a fresh slot.");
        describe_counter!("cache_misses_total", "Serving requests that triggered a fresh produce.");
        describe_counter!("source_items_total", "Raw items fetched from upstream sources.");
        describe_counter!("source_rate_limited_total", "Rate-limit responses from upstreams.");
        describe_counter!("selection_fallback_total", "Selection replies replaced by the fallback policy.");
        describe_counter!("rewrite_fallback_total", "Per-item rewrites replaced by the original content.");
        describe_counter!("rewrite_rejected_total", "Items dropped by the rewrite rejection pre-check.");
        describe_counter!("stream_aborts_total", "Streams aborted on source failure.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when a stream last produced output.");
        describe_histogram!("pipeline_produce_ms", "Full produce duration per stream in milliseconds.");
    });
}

/// Failure surface of one stream run. Selection/rewrite failures never
/// appear here; those stages absorb them locally.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("stream not yet produced")]
    NotProduced,
}

/// Everything that makes one stream a distinct pipeline instance.
#[derive(Clone)]
pub struct StreamDescriptor {
    pub key: StreamKey,
    pub adapter: Arc<dyn SourceAdapter>,
    pub selection: SelectionPolicy,
    pub rewrite: RewriteStyle,
}

pub fn general_stream(adapter: Arc<dyn SourceAdapter>, tuning: &GeneralTuning) -> StreamDescriptor {
    StreamDescriptor {
        key: StreamKey::General,
        adapter,
        selection: SelectionPolicy {
            prompt: crate::ai::prompts::select_general,
            items_field: "topStories",
            indices_field: "selectedIndices",
            select_min: tuning.select_min,
            select_max: tuning.select_max,
            fallback: SelectionFallback::Prefix(tuning.fallback_prefix),
        },
        rewrite: RewriteStyle::FullSummary,
    }
}

pub fn uplifting_stream(
    adapter: Arc<dyn SourceAdapter>,
    tuning: &UpliftingTuning,
) -> StreamDescriptor {
    StreamDescriptor {
        key: StreamKey::Uplifting,
        adapter,
        selection: SelectionPolicy {
            prompt: crate::ai::prompts::select_uplifting,
            items_field: "topStories",
            indices_field: "selectedIndices",
            select_min: 0,
            select_max: tuning.select_max,
            fallback: SelectionFallback::Empty,
        },
        rewrite: RewriteStyle::HeadlineOnly,
    }
}

/// Aggregate envelope for the scheduled dual-stream run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub success: bool,
    pub message: String,
}

pub struct Orchestrator {
    client: DynCompletion,
    store: Arc<dyn SlotStore>,
    ttl_ms: i64,
    streams: Vec<StreamDescriptor>,
    /// Single-flight guard per stream: the first concurrent miss produces,
    /// followers await the same in-flight result off the refreshed slot.
    guards: HashMap<StreamKey, tokio::sync::Mutex<()>>,
}

impl Orchestrator {
    pub fn new(
        client: DynCompletion,
        store: Arc<dyn SlotStore>,
        ttl_ms: i64,
        streams: Vec<StreamDescriptor>,
    ) -> Self {
        ensure_metrics_described();
        let guards = streams
            .iter()
            .map(|d| (d.key, tokio::sync::Mutex::new(())))
            .collect();
        Self {
            client,
            store,
            ttl_ms,
            streams,
            guards,
        }
    }

    fn descriptor(&self, key: StreamKey) -> &StreamDescriptor {
        self.streams
            .iter()
            .find(|d| d.key == key)
            .expect("stream descriptor not registered")
    }

    /// Live serving path: reuse a fresh slot's processed output verbatim,
    /// otherwise produce under the stream's single-flight guard.
    pub async fn serve(&self, key: StreamKey) -> Result<Vec<ProcessedItem>, StreamError> {
        if let Some(items) = self.cached(key).await {
            counter!("cache_hits_total", "stream" => key.as_str()).increment(1);
            return Ok(items);
        }

        let guard = self
            .guards
            .get(&key)
            .expect("stream guard not registered")
            .lock()
            .await;

        // A concurrent flight may have refreshed the slot while this one
        // waited on the guard.
        if let Some(items) = self.cached(key).await {
            counter!("cache_hits_total", "stream" => key.as_str()).increment(1);
            return Ok(items);
        }

        counter!("cache_misses_total", "stream" => key.as_str()).increment(1);
        let desc = self.descriptor(key);
        let items = self.produce(desc, &*self.store, true).await?;
        drop(guard);
        Ok(items)
    }

    async fn cached(&self, key: StreamKey) -> Option<Vec<ProcessedItem>> {
        let slot = self.store.get(key).await?;
        if slot.is_servable(now_ms(), self.ttl_ms) {
            slot.processed_items
        } else {
            None
        }
    }

    /// Run one stream end to end and write the slot into `sink`.
    /// `persist_raw` keeps the raw batch alongside processed output (live
    /// store); the durable variant stores processed output only.
    async fn produce(
        &self,
        desc: &StreamDescriptor,
        sink: &dyn SlotStore,
        persist_raw: bool,
    ) -> Result<Vec<ProcessedItem>, StreamError> {
        let t0 = std::time::Instant::now();

        let raw = match desc.adapter.fetch_latest().await {
            Ok(raw) => raw,
            Err(e) => {
                counter!("stream_aborts_total", "stream" => desc.key.as_str()).increment(1);
                tracing::error!(stream = %desc.key, error = %e, "source fetch failed, aborting stream");
                return Err(e.into());
            }
        };
        tracing::info!(stream = %desc.key, fetched = raw.len(), source = desc.adapter.name(), "fetched raw batch");

        // A zero-item fetch produces nothing and leaves the previous slot
        // in place rather than clobbering it with an empty one.
        if raw.is_empty() {
            tracing::warn!(stream = %desc.key, "fetch returned no items, skipping produce");
            return Ok(Vec::new());
        }

        let normalized = normalize_batch(&raw);
        let selected = select(&self.client, &desc.selection, &normalized).await;
        tracing::info!(stream = %desc.key, selected = selected.len(), "selection done");

        let outcomes = rewrite_batch(&self.client, desc.rewrite, &selected).await;
        let rejected = outcomes
            .iter()
            .filter(|o| matches!(o, RewriteOutcome::Rejected))
            .count();
        let kept: Vec<ProcessedItem> = outcomes
            .into_iter()
            .filter_map(|o| match o {
                RewriteOutcome::Kept(item) => Some(item),
                RewriteOutcome::Rejected => None,
            })
            .collect();
        tracing::info!(stream = %desc.key, rewritten = kept.len(), rejected, "rewrite done");

        let slot = CacheSlot::fresh(persist_raw.then_some(raw), Some(kept.clone()), now_ms());
        if let Err(e) = sink.put(desc.key, slot).await {
            tracing::warn!(stream = %desc.key, error = %e, "slot store write failed");
        }

        gauge!("pipeline_last_run_ts").set((now_ms() / 1000) as f64);
        histogram!("pipeline_produce_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(kept)
    }

    /// Scheduled dual-stream run: both streams sequentially, failures
    /// isolated per stream, aggregate envelope at the end. Writes only
    /// processed output into the (durable) sink.
    pub async fn run_all(&self, sink: &dyn SlotStore) -> RunReport {
        let mut success = true;
        let mut lines = Vec::with_capacity(self.streams.len());

        for desc in &self.streams {
            tracing::info!(stream = %desc.key, "cron: processing stream");
            match self.produce(desc, sink, false).await {
                Ok(items) if items.is_empty() => {
                    lines.push(format!("{}: nothing to store", desc.key));
                }
                Ok(items) => {
                    lines.push(format!("{}: stored {} items", desc.key, items.len()));
                }
                Err(e) => {
                    success = false;
                    lines.push(format!("{}: failed: {e}", desc.key));
                }
            }
        }

        let message = lines.join("; ");
        tracing::info!(success, %message, "cron: finished");
        RunReport { success, message }
    }
}
