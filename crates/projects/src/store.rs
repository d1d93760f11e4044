use async_trait::async_trait;
use bytes::Bytes;
use dockpit_blob::{BlobMeta, BlobStore, PutOptions};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    model::{Project, UploadSession},
};

/// Project metadata TTL while `PENDING` (spec §3/§4.4): a never-finished
/// project disappears on its own.
pub const PENDING_TTL_SECS: u64 = 3600;

/// Upload-session TTL (spec §3/§4.6).
pub const SESSION_TTL_SECS: u64 = 3600;

const PROJECT_PREFIX: &str = "project/";

fn metadata_key(id: &str) -> String {
    format!("project/{id}/metadata")
}

fn asset_prefix(id: &str) -> String {
    format!("project/{id}/asset/")
}

fn module_prefix(id: &str) -> String {
    format!("project/{id}/module/")
}

fn session_prefix(project_id: &str) -> String {
    format!("upload-session/{project_id}/")
}

fn session_key(project_id: &str, session_id: &str) -> String {
    format!("upload-session/{project_id}/{session_id}")
}

#[derive(Debug, Clone, Default)]
pub struct ListProjectsPage {
    pub projects: Vec<Project>,
    pub next_cursor: Option<String>,
    /// Metadata keys that failed to parse as a `Project` — a missing or
    /// unrecognized `status` field, or otherwise corrupt JSON (spec §4.10
    /// step 2, Testable Property 12). The watchdog sweeps these for
    /// deletion since they can never surface as a usable project.
    pub malformed_keys: Vec<String>,
}

/// Project metadata + upload-session store (spec §4.4, C4): a trait with
/// one swappable backing implementation.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create(&self, name: Option<String>) -> Result<Project>;
    async fn get(&self, id: &str) -> Result<Option<Project>>;
    async fn put(&self, project: &Project) -> Result<()>;
    /// List metadata under `project/`, clamping `limit` to `[1, 100]`, with
    /// no duplicate entries across pages even when the underlying store's
    /// page contains non-metadata keys (asset/module blobs share the same
    /// `project/{id}/` prefix).
    async fn list(&self, limit: u32, cursor: Option<String>) -> Result<ListProjectsPage>;
    /// Cascade-delete a project: asset blobs, module blobs (if
    /// `hasServerCode`), leftover upload sessions, then the metadata itself.
    async fn delete(&self, id: &str) -> Result<()>;
    /// Deletes a raw metadata blob key directly, bypassing the id-based
    /// cascade in [`delete`](Self::delete) — for metadata that failed to
    /// parse as a `Project` at all (see [`ListProjectsPage::malformed_keys`]),
    /// so it has no usable `id` to cascade from.
    async fn delete_metadata_key(&self, key: &str) -> Result<()>;

    async fn create_session(&self, session: &UploadSession) -> Result<()>;
    async fn get_session(&self, project_id: &str, session_id: &str) -> Result<Option<UploadSession>>;
    async fn put_session(&self, session: &UploadSession) -> Result<()>;
    async fn delete_session(&self, project_id: &str, session_id: &str) -> Result<()>;
}

/// The only production backing: project metadata and upload sessions are
/// JSON documents in the blob namespace (spec §4.4), not a separate SQL
/// schema.
pub struct BlobProjectStore<B> {
    blob: B,
}

impl<B: BlobStore> BlobProjectStore<B> {
    pub fn new(blob: B) -> Self {
        Self { blob }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Project>> {
        match self.blob.get_text(key, None).await? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| Error::Corrupt(e.to_string())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<B: BlobStore> ProjectStore for BlobProjectStore<B> {
    async fn create(&self, name: Option<String>) -> Result<Project> {
        let id = Uuid::new_v4().to_string();
        let now = dockpit_common::time::now_rfc3339();
        let project = Project::new_pending(id, name.unwrap_or_default(), now);
        self.put(&project).await?;
        Ok(project)
    }

    async fn get(&self, id: &str) -> Result<Option<Project>> {
        self.get_raw(&metadata_key(id)).await
    }

    async fn put(&self, project: &Project) -> Result<()> {
        let json = serde_json::to_vec(project).map_err(|e| Error::Corrupt(e.to_string()))?;
        let ttl = matches!(project.status, crate::model::ProjectStatus::Pending)
            .then_some(PENDING_TTL_SECS);
        self.blob
            .put(&metadata_key(&project.id), Bytes::from(json), PutOptions {
                metadata: Some(BlobMeta::with_content_type("application/json")),
                ttl_secs: ttl,
            })
            .await?;
        Ok(())
    }

    async fn list(&self, limit: u32, cursor: Option<String>) -> Result<ListProjectsPage> {
        let limit = limit.clamp(1, 100) as usize;
        let (mut blob_cursor, mut idx) = decode_cursor(cursor.as_deref());
        let mut projects = Vec::new();
        let mut malformed_keys = Vec::new();

        loop {
            let page = self.blob.list(PROJECT_PREFIX, blob_cursor.clone()).await?;
            while idx < page.keys.len() && projects.len() < limit {
                let key = &page.keys[idx];
                if key.ends_with("/metadata") {
                    match self.get_raw(key).await {
                        Ok(Some(p)) => projects.push(p),
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(key = %key, error = %e, "corrupt project metadata during list, flagged for sweep");
                            malformed_keys.push(key.clone());
                        }
                    }
                }
                idx += 1;
            }

            if projects.len() >= limit {
                let more_in_page = idx < page.keys.len();
                let next_cursor = (more_in_page || !page.complete)
                    .then(|| encode_cursor(blob_cursor.as_deref(), idx));
                return Ok(ListProjectsPage { projects, next_cursor, malformed_keys });
            }
            if page.complete {
                return Ok(ListProjectsPage { projects, next_cursor: None, malformed_keys });
            }
            blob_cursor = page.next_cursor;
            idx = 0;
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let project = self.get(id).await?;
        self.blob.delete_all_by_prefix(&asset_prefix(id)).await?;
        if project.as_ref().is_some_and(|p| p.has_server_code) {
            self.blob.delete_all_by_prefix(&module_prefix(id)).await?;
        }
        self.blob.delete_all_by_prefix(&session_prefix(id)).await?;
        self.blob.delete(&metadata_key(id)).await?;
        Ok(())
    }

    async fn delete_metadata_key(&self, key: &str) -> Result<()> {
        self.blob.delete(key).await?;
        Ok(())
    }

    async fn create_session(&self, session: &UploadSession) -> Result<()> {
        self.put_session(session).await
    }

    async fn get_session(&self, project_id: &str, session_id: &str) -> Result<Option<UploadSession>> {
        let key = session_key(project_id, session_id);
        match self.blob.get_text(&key, None).await? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| Error::Corrupt(e.to_string())),
            None => Ok(None),
        }
    }

    async fn put_session(&self, session: &UploadSession) -> Result<()> {
        let json = serde_json::to_vec(session).map_err(|e| Error::Corrupt(e.to_string()))?;
        self.blob
            .put(&session_key(&session.project_id, &session.id), Bytes::from(json), PutOptions {
                metadata: Some(BlobMeta::with_content_type("application/json")),
                ttl_secs: Some(SESSION_TTL_SECS),
            })
            .await?;
        Ok(())
    }

    async fn delete_session(&self, project_id: &str, session_id: &str) -> Result<()> {
        self.blob.delete(&session_key(project_id, session_id)).await?;
        Ok(())
    }
}

/// Lets an `Arc<dyn ProjectStore>` (or `Arc<ConcreteStore>`) be shared
/// across collaborators that each hold their own owned `P: ProjectStore`.
#[async_trait]
impl<T: ProjectStore + ?Sized> ProjectStore for std::sync::Arc<T> {
    async fn create(&self, name: Option<String>) -> Result<Project> {
        T::create(self, name).await
    }

    async fn get(&self, id: &str) -> Result<Option<Project>> {
        T::get(self, id).await
    }

    async fn put(&self, project: &Project) -> Result<()> {
        T::put(self, project).await
    }

    async fn list(&self, limit: u32, cursor: Option<String>) -> Result<ListProjectsPage> {
        T::list(self, limit, cursor).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        T::delete(self, id).await
    }

    async fn delete_metadata_key(&self, key: &str) -> Result<()> {
        T::delete_metadata_key(self, key).await
    }

    async fn create_session(&self, session: &UploadSession) -> Result<()> {
        T::create_session(self, session).await
    }

    async fn get_session(&self, project_id: &str, session_id: &str) -> Result<Option<UploadSession>> {
        T::get_session(self, project_id, session_id).await
    }

    async fn put_session(&self, session: &UploadSession) -> Result<()> {
        T::put_session(self, session).await
    }

    async fn delete_session(&self, project_id: &str, session_id: &str) -> Result<()> {
        T::delete_session(self, project_id, session_id).await
    }
}

fn decode_cursor(cursor: Option<&str>) -> (Option<String>, usize) {
    let Some(cursor) = cursor else {
        return (None, 0);
    };
    match cursor.rsplit_once(':') {
        Some((blob_cursor, idx)) => {
            let idx = idx.parse().unwrap_or(0);
            let blob_cursor = (!blob_cursor.is_empty()).then(|| blob_cursor.to_string());
            (blob_cursor, idx)
        }
        None => (None, 0),
    }
}

fn encode_cursor(blob_cursor: Option<&str>, idx: usize) -> String {
    format!("{}:{idx}", blob_cursor.unwrap_or_default())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use dockpit_blob::InMemoryBlobStore;

    use super::*;
    use crate::model::ProjectStatus;

    fn store() -> BlobProjectStore<InMemoryBlobStore> {
        BlobProjectStore::new(InMemoryBlobStore::with_page_size(3))
    }

    #[tokio::test]
    async fn create_get_delete_roundtrip() {
        let store = store();
        let project = store.create(Some("site".into())).await.unwrap();
        assert_eq!(project.status, ProjectStatus::Pending);

        let fetched = store.get(&project.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "site");

        store.delete(&project.id).await.unwrap();
        assert!(store.get(&project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_paginates_without_duplicates_even_with_mixed_keys() {
        let store = store();
        let mut ids = Vec::new();
        for i in 0..7 {
            let project = store.create(Some(format!("site-{i}"))).await.unwrap();
            // Interleave non-metadata keys under the same `project/` prefix.
            store
                .blob
                .put(
                    &format!("project/{}/asset/deadbeef", project.id),
                    Bytes::from_static(b"x"),
                    PutOptions::default(),
                )
                .await
                .unwrap();
            ids.push(project.id);
        }

        let mut seen = std::collections::HashSet::new();
        let mut cursor = None;
        loop {
            let page = store.list(2, cursor).await.unwrap();
            for p in &page.projects {
                assert!(seen.insert(p.id.clone()), "duplicate project {}", p.id);
            }
            if page.next_cursor.is_none() {
                break;
            }
            cursor = page.next_cursor;
        }
        assert_eq!(seen.len(), ids.len());
    }

    #[tokio::test]
    async fn delete_cascades_sessions_and_assets() {
        let store = store();
        let project = store.create(None).await.unwrap();
        store
            .blob
            .put(
                &format!("project/{}/asset/deadbeef", project.id),
                Bytes::from_static(b"x"),
                PutOptions::default(),
            )
            .await
            .unwrap();
        let session = UploadSession {
            id: "sess-1".into(),
            project_id: project.id.clone(),
            manifest: std::collections::HashMap::new(),
            buckets: vec![],
            uploaded_hashes: std::collections::HashSet::new(),
            created_at: dockpit_common::time::now_rfc3339(),
            completion_token: None,
        };
        store.create_session(&session).await.unwrap();

        store.delete(&project.id).await.unwrap();
        assert!(store.get_session(&project.id, "sess-1").await.unwrap().is_none());
        assert!(store
            .blob
            .get(&format!("project/{}/asset/deadbeef", project.id))
            .await
            .unwrap()
            .is_none());
    }
}
