use std::{collections::HashMap, time::Duration};

use {async_trait::async_trait, bytes::Bytes};

/// Parallel batch calls (`batch_exists`/`batch_get`) are chunked to this size
/// to respect the store's per-call fan-out limit (spec §4.1).
pub const BATCH_CHUNK_SIZE: usize = 100;

/// `delete_all_by_prefix` paginates `list` and deletes in batches of at most
/// this many keys in parallel (spec §4.1).
pub const DELETE_BATCH_SIZE: usize = 50;

/// Reads slower than this are classified as a cache MISS for metrics
/// purposes only (spec §4.1).
pub const HIT_THRESHOLD_MS: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Small metadata side-channel stored alongside a blob (spec §3 — e.g. the
/// asset's `contentType`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobMeta {
    pub content_type: Option<String>,
    pub extra: HashMap<String, String>,
}

impl BlobMeta {
    #[must_use]
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            extra: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub metadata: Option<BlobMeta>,
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub next_cursor: Option<String>,
    pub complete: bool,
}

/// Whether a read was fast enough to count as a cache HIT (metrics only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    Hit,
    Miss,
}

#[must_use]
pub fn classify_latency(elapsed: Duration) -> CacheClass {
    if elapsed.as_millis() as u64 <= HIT_THRESHOLD_MS {
        CacheClass::Hit
    } else {
        CacheClass::Miss
    }
}

/// The minimal interface the core requires from the external key→bytes
/// store (spec §4.1). All calls are treated as possibly-failing and
/// idempotent for identical inputs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<(Bytes, BlobMeta)>>;

    async fn get_text(&self, key: &str, cache_hint_secs: Option<u64>) -> Result<Option<String>> {
        let _ = cache_hint_secs;
        match self.get(key).await? {
            Some((bytes, _)) => Ok(String::from_utf8(bytes.to_vec()).ok()),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes, opts: PutOptions) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn list(&self, prefix: &str, cursor: Option<String>) -> Result<ListPage>;

    /// Parallel existence check, chunked to [`BATCH_CHUNK_SIZE`] per the
    /// store's fan-out limit. Cancels outstanding streams rather than
    /// buffering bodies (spec §4.1) — the in-memory impl has no bodies to
    /// buffer in the first place, so this is a no-op concern there.
    async fn batch_exists(&self, keys: &[String]) -> Result<std::collections::HashSet<String>> {
        let mut present = std::collections::HashSet::new();
        for chunk in keys.chunks(BATCH_CHUNK_SIZE) {
            let checks = chunk.iter().map(|k| async move {
                let exists = self.get(k).await?.is_some();
                Result::Ok((k.clone(), exists))
            });
            for (key, exists) in futures::future::try_join_all(checks).await? {
                if exists {
                    present.insert(key);
                }
            }
        }
        Ok(present)
    }

    /// Parallel batched get; missing keys are simply absent from the map.
    async fn batch_get(&self, keys: &[String]) -> Result<HashMap<String, Bytes>> {
        let mut out = HashMap::new();
        for chunk in keys.chunks(BATCH_CHUNK_SIZE) {
            let reads = chunk.iter().map(|k| async move {
                let got = self.get(k).await?;
                Result::Ok((k.clone(), got))
            });
            for (key, got) in futures::future::try_join_all(reads).await? {
                if let Some((bytes, _meta)) = got {
                    out.insert(key, bytes);
                }
            }
        }
        Ok(out)
    }

    /// Paginate `list(prefix)` and delete in parallel batches of at most
    /// [`DELETE_BATCH_SIZE`]. Returns the number of keys deleted.
    async fn delete_all_by_prefix(&self, prefix: &str) -> Result<usize> {
        let mut cursor = None;
        let mut total = 0usize;
        loop {
            let page = self.list(prefix, cursor.take()).await?;
            for chunk in page.keys.chunks(DELETE_BATCH_SIZE) {
                let deletes = chunk.iter().map(|k| self.delete(k));
                futures::future::try_join_all(deletes).await?;
                total += chunk.len();
            }
            if page.complete || page.next_cursor.is_none() {
                break;
            }
            cursor = page.next_cursor;
        }
        Ok(total)
    }
}

/// Lets an `Arc<dyn BlobStore>` (or `Arc<ConcreteStore>`) be shared across
/// collaborators that each hold their own owned `B: BlobStore`, without
/// cloning the underlying store.
#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<(Bytes, BlobMeta)>> {
        T::get(self, key).await
    }

    async fn get_text(&self, key: &str, cache_hint_secs: Option<u64>) -> Result<Option<String>> {
        T::get_text(self, key, cache_hint_secs).await
    }

    async fn put(&self, key: &str, bytes: Bytes, opts: PutOptions) -> Result<()> {
        T::put(self, key, bytes, opts).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        T::delete(self, key).await
    }

    async fn list(&self, prefix: &str, cursor: Option<String>) -> Result<ListPage> {
        T::list(self, prefix, cursor).await
    }

    async fn batch_exists(&self, keys: &[String]) -> Result<std::collections::HashSet<String>> {
        T::batch_exists(self, keys).await
    }

    async fn batch_get(&self, keys: &[String]) -> Result<HashMap<String, Bytes>> {
        T::batch_get(self, keys).await
    }

    async fn delete_all_by_prefix(&self, prefix: &str) -> Result<usize> {
        T::delete_all_by_prefix(self, prefix).await
    }
}
