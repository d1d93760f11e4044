use std::time::{Duration, Instant};

use {async_trait::async_trait, bytes::Bytes, dashmap::DashMap};

use crate::store::{BlobMeta, BlobStore, ListPage, PutOptions, Result};

struct Entry {
    bytes: Bytes,
    meta: BlobMeta,
    expires_at: Option<Instant>,
}

/// In-memory `BlobStore`, used as the default backing for project metadata
/// (which lives in the blob namespace per spec §4.4) and in tests. Listing
/// pages are capped artificially small so pagination logic gets exercised
/// even for small fixtures.
pub struct InMemoryBlobStore {
    entries: DashMap<String, Entry>,
    page_size: usize,
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            page_size: 1000,
        }
    }

    /// Construct a store with an artificially small list page size, for
    /// exercising the pagination-invariant tests (spec §9 "no duplicates
    /// across pages").
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            page_size: page_size.max(1),
        }
    }

    fn is_live(entry: &Entry) -> bool {
        entry.expires_at.is_none_or(|exp| exp > Instant::now())
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<(Bytes, BlobMeta)>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        if !Self::is_live(&entry) {
            drop(entry);
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some((entry.bytes.clone(), entry.meta.clone())))
    }

    async fn put(&self, key: &str, bytes: Bytes, opts: PutOptions) -> Result<()> {
        let expires_at = opts.ttl_secs.map(|s| Instant::now() + Duration::from_secs(s));
        self.entries.insert(key.to_string(), Entry {
            bytes,
            meta: opts.metadata.unwrap_or_default(),
            expires_at,
        });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str, cursor: Option<String>) -> Result<ListPage> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| Self::is_live(e.value()) && e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();

        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(keys.len());
        let page: Vec<String> = keys[start.min(keys.len())..end].to_vec();
        let complete = end >= keys.len();
        Ok(ListPage {
            keys: page,
            next_cursor: if complete { None } else { Some(end.to_string()) },
            complete,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let store = InMemoryBlobStore::new();
        store
            .put("k", Bytes::from_static(b"v"), PutOptions::default())
            .await
            .unwrap();
        let (bytes, _) = store.get("k").await.unwrap().unwrap();
        assert_eq!(bytes.as_ref(), b"v");
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let store = InMemoryBlobStore::new();
        store
            .put("k", Bytes::from_static(b"v"), PutOptions {
                metadata: None,
                ttl_secs: Some(0),
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pagination_has_no_duplicates_across_pages() {
        let store = InMemoryBlobStore::with_page_size(3);
        for i in 0..10 {
            store
                .put(&format!("p/{i:02}"), Bytes::new(), PutOptions::default())
                .await
                .unwrap();
        }
        let mut seen = std::collections::HashSet::new();
        let mut cursor = None;
        loop {
            let page = store.list("p/", cursor).await.unwrap();
            for key in &page.keys {
                assert!(seen.insert(key.clone()), "duplicate key {key} across pages");
            }
            if page.complete {
                break;
            }
            cursor = page.next_cursor;
        }
        assert_eq!(seen.len(), 10);
    }

    #[tokio::test]
    async fn batch_exists_and_batch_get() {
        let store = InMemoryBlobStore::new();
        store
            .put("a", Bytes::from_static(b"1"), PutOptions::default())
            .await
            .unwrap();
        store
            .put("b", Bytes::from_static(b"2"), PutOptions::default())
            .await
            .unwrap();
        let keys = vec!["a".to_string(), "b".to_string(), "missing".to_string()];
        let exists = store.batch_exists(&keys).await.unwrap();
        assert!(exists.contains("a") && exists.contains("b") && !exists.contains("missing"));

        let got = store.batch_get(&keys).await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got["a"].as_ref(), b"1");
    }

    #[tokio::test]
    async fn delete_all_by_prefix_removes_only_matching_keys() {
        let store = InMemoryBlobStore::new();
        for key in ["project/1/asset/a", "project/1/asset/b", "project/2/asset/a"] {
            store.put(key, Bytes::new(), PutOptions::default()).await.unwrap();
        }
        let deleted = store.delete_all_by_prefix("project/1/").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get("project/2/asset/a").await.unwrap().is_some());
    }
}
