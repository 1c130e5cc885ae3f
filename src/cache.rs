// src/cache.rs
//! # Cache Store
//! One rolling slot per content stream, stamped with its fetch time and
//! answered against a fixed TTL. The store is an injectable dependency
//! owning its own synchronization. Two backings: process-memory for the
//! live-serving variant, and an atomically written JSON file per stream
//! for the scheduled-job variant.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::rewrite::ProcessedItem;
use crate::sources::RawItem;

pub const DEFAULT_TTL_HOURS: u64 = 24;

/// Identity of a content stream, doubling as the durable-store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKey {
    General,
    Uplifting,
}

impl StreamKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKey::General => "todays_general_news",
            StreamKey::Uplifting => "todays_uplifting_news",
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single rolling slot for one stream. Overwritten wholesale on every
/// successful fresh fetch, never partially updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CacheSlot {
    pub raw_items: Option<Vec<RawItem>>,
    pub processed_items: Option<Vec<ProcessedItem>>,
    pub fetched_at_ms: i64,
}

impl CacheSlot {
    pub fn fresh(
        raw_items: Option<Vec<RawItem>>,
        processed_items: Option<Vec<ProcessedItem>>,
        fetched_at_ms: i64,
    ) -> Self {
        Self {
            raw_items,
            processed_items,
            fetched_at_ms,
        }
    }

    /// Freshness is strict on the stale side: age exactly equal to the TTL
    /// already counts as stale.
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.fetched_at_ms) < ttl_ms
    }

    /// A slot serves a hit only when it is fresh AND actually carries
    /// processed output.
    pub fn is_servable(&self, now_ms: i64, ttl_ms: i64) -> bool {
        self.is_fresh(now_ms, ttl_ms)
            && self
                .processed_items
                .as_ref()
                .map(|p| !p.is_empty())
                .unwrap_or(false)
    }
}

pub fn ttl_ms(hours: u64) -> i64 {
    (hours * 60 * 60 * 1000) as i64
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait::async_trait]
pub trait SlotStore: Send + Sync {
    async fn get(&self, key: StreamKey) -> Option<CacheSlot>;
    async fn put(&self, key: StreamKey, slot: CacheSlot) -> anyhow::Result<()>;
}

/// Process-lifetime store. Lost on restart; acceptable for the
/// live-serving variant.
#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<StreamKey, CacheSlot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SlotStore for MemoryStore {
    async fn get(&self, key: StreamKey) -> Option<CacheSlot> {
        self.slots
            .read()
            .expect("slot store rwlock poisoned")
            .get(&key)
            .cloned()
    }

    async fn put(&self, key: StreamKey, slot: CacheSlot) -> anyhow::Result<()> {
        self.slots
            .write()
            .expect("slot store rwlock poisoned")
            .insert(key, slot);
        Ok(())
    }
}

/// Durable store: one JSON document per stream key, written atomically
/// (tmp file + rename). Read-only from the serving path in produced mode.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = std::fs::create_dir_all(&dir);
        Self { dir }
    }

    fn path_for(&self, key: StreamKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

#[async_trait::async_trait]
impl SlotStore for FileStore {
    async fn get(&self, key: StreamKey) -> Option<CacheSlot> {
        let content = std::fs::read_to_string(self.path_for(key)).ok()?;
        serde_json::from_str(&content).ok()
    }

    async fn put(&self, key: StreamKey, slot: CacheSlot) -> anyhow::Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(&slot)?;
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_with_processed(fetched_at_ms: i64) -> CacheSlot {
        CacheSlot::fresh(
            None,
            Some(vec![ProcessedItem {
                title: Some("t".into()),
                summary: vec!["s".into()],
                ..ProcessedItem::default()
            }]),
            fetched_at_ms,
        )
    }

    #[test]
    fn freshness_boundary_is_exclusive_on_the_stale_side() {
        let ttl = ttl_ms(DEFAULT_TTL_HOURS);
        let now = 1_700_000_000_000i64;

        let just_inside = slot_with_processed(now - ttl + 1);
        assert!(just_inside.is_fresh(now, ttl));

        let just_outside = slot_with_processed(now - ttl - 1);
        assert!(!just_outside.is_fresh(now, ttl));

        let exactly_ttl = slot_with_processed(now - ttl);
        assert!(!exactly_ttl.is_fresh(now, ttl));
    }

    #[test]
    fn empty_or_missing_payload_is_never_servable() {
        let ttl = ttl_ms(DEFAULT_TTL_HOURS);
        let now = 1_700_000_000_000i64;

        let empty = CacheSlot::fresh(None, Some(Vec::new()), now);
        assert!(!empty.is_servable(now, ttl));

        let missing = CacheSlot::fresh(Some(Vec::new()), None, now);
        assert!(!missing.is_servable(now, ttl));

        assert!(slot_with_processed(now).is_servable(now, ttl));
    }

    #[tokio::test]
    async fn memory_store_overwrites_wholesale() {
        let store = MemoryStore::new();
        store
            .put(StreamKey::General, slot_with_processed(1))
            .await
            .unwrap();
        store
            .put(StreamKey::General, slot_with_processed(2))
            .await
            .unwrap();
        let got = store.get(StreamKey::General).await.unwrap();
        assert_eq!(got.fetched_at_ms, 2);
        assert!(store.get(StreamKey::Uplifting).await.is_none());
    }

    #[tokio::test]
    async fn file_store_round_trips_per_stream_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.get(StreamKey::General).await.is_none());

        let slot = slot_with_processed(42);
        store.put(StreamKey::General, slot.clone()).await.unwrap();
        let got = store.get(StreamKey::General).await.unwrap();
        assert_eq!(got, slot);

        // Keys are independent documents.
        assert!(store.get(StreamKey::Uplifting).await.is_none());
    }
}
