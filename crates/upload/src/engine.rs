use std::collections::{HashMap, HashSet};

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use dockpit_blob::{BlobMeta, BlobStore, PutOptions};
use dockpit_jwt::{CompleteClaims, JwtCodec, Phase, UploadClaims};
use dockpit_projects::{ManifestEntry, ProjectStore, UploadSession};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    limits::{validate_content_hash, validate_pathname, BUCKET_SIZE, MAX_CHUNK_FILES, MAX_MANIFEST_ENTRIES},
};

fn asset_key(project_id: &str, hash: &str) -> String {
    format!("project/{project_id}/asset/{hash}")
}

fn now_secs() -> u64 {
    dockpit_common::time::now_ms() / 1000
}

pub struct CreatedSession {
    pub jwt: String,
    pub buckets: Vec<Vec<String>>,
    /// Unique hashes that still need uploading (spec §8 property 4 "dedup").
    pub new_assets: usize,
    /// Unique hashes already present in the asset namespace.
    pub skipped_assets: usize,
}

pub struct UploadedChunk {
    pub status: u16,
    pub jwt: Option<String>,
}

/// Three-phase deduplicating upload protocol (spec §4.6, C6).
pub struct UploadEngine<B, P> {
    blob: B,
    projects: P,
    jwt: JwtCodec,
}

impl<B: BlobStore, P: ProjectStore> UploadEngine<B, P> {
    pub fn new(blob: B, projects: P, jwt: JwtCodec) -> Self {
        Self { blob, projects, jwt }
    }

    fn validate_manifest(manifest: &HashMap<String, ManifestEntry>) -> Result<()> {
        if manifest.len() > MAX_MANIFEST_ENTRIES {
            return Err(Error::validation("manifest", "exceeds max entry count"));
        }
        for (path, entry) in manifest {
            validate_pathname(path)?;
            validate_content_hash(&entry.hash)?;
            if let Some(size) = entry.size {
                if size > crate::limits::MAX_ASSET_SIZE_BYTES {
                    return Err(Error::validation(path.clone(), "declared size exceeds max asset size"));
                }
            }
        }
        Ok(())
    }

    /// Phase 1: validate the manifest, dedup against existing blobs, assign
    /// buckets of at most [`BUCKET_SIZE`] hashes, and mint either an upload
    /// token (work remains) or a completion token (full cache hit).
    pub async fn create_session(
        &self,
        project_id: &str,
        manifest: HashMap<String, ManifestEntry>,
    ) -> Result<CreatedSession> {
        Self::validate_manifest(&manifest)?;

        let mut unique_hashes: Vec<String> =
            manifest.values().map(|e| e.hash.clone()).collect::<HashSet<_>>().into_iter().collect();
        unique_hashes.sort();

        let total_unique = unique_hashes.len();
        let keys: Vec<String> = unique_hashes.iter().map(|h| asset_key(project_id, h)).collect();
        let existing_keys = self.blob.batch_exists(&keys).await?;

        let work_set: Vec<String> = unique_hashes
            .into_iter()
            .filter(|h| !existing_keys.contains(&asset_key(project_id, h)))
            .collect();
        let new_assets = work_set.len();
        let skipped_assets = total_unique - new_assets;

        let buckets: Vec<Vec<String>> =
            work_set.chunks(BUCKET_SIZE).map(<[String]>::to_vec).collect();

        let session_id = Uuid::new_v4().to_string();
        let now = dockpit_common::time::now_rfc3339();
        let mut session = UploadSession {
            id: session_id.clone(),
            project_id: project_id.to_string(),
            manifest,
            buckets: buckets.clone(),
            uploaded_hashes: HashSet::new(),
            created_at: now,
            completion_token: None,
        };

        let jwt = if buckets.is_empty() {
            let manifest_json = serde_json::to_string(&session.manifest)
                .map_err(|e| Error::validation("manifest", e.to_string()))?;
            let token = self.jwt.mint(
                CompleteClaims {
                    session_id: session_id.clone(),
                    project_id: project_id.to_string(),
                    phase: Phase::Complete,
                    manifest: manifest_json,
                },
                now_secs(),
            );
            session.completion_token = Some(token.clone());
            token
        } else {
            self.jwt.mint(
                UploadClaims {
                    session_id: session_id.clone(),
                    project_id: project_id.to_string(),
                    phase: Phase::Upload,
                },
                now_secs(),
            )
        };

        self.projects.create_session(&session).await?;
        Ok(CreatedSession { jwt, buckets, new_assets, skipped_assets })
    }

    /// Phase 2: verify the bearer JWT, apply each `(hash, base64)` entry
    /// atomically per-call, and mint a completion token once every bucket
    /// is fully uploaded.
    pub async fn upload_chunk(
        &self,
        project_id: &str,
        bearer_token: &str,
        chunk: HashMap<String, String>,
    ) -> Result<UploadedChunk> {
        let claims: UploadClaims =
            self.jwt.verify(bearer_token, now_secs()).ok_or(Error::Unauthorized)?;
        if claims.phase != Phase::Upload || claims.project_id != project_id {
            return Err(Error::Unauthorized);
        }

        let mut session = self
            .projects
            .get_session(project_id, &claims.session_id)
            .await?
            .ok_or(Error::SessionNotFound)?;

        if chunk.len() > MAX_CHUNK_FILES {
            return Err(Error::validation("chunk", "exceeds max files per chunk"));
        }

        let hashes_in_manifest: HashSet<&str> =
            session.manifest.values().map(|e| e.hash.as_str()).collect();

        for (hash, b64) in &chunk {
            if !hashes_in_manifest.contains(hash.as_str()) {
                return Err(Error::validation("hash", "not present in session manifest"));
            }
            if session.uploaded_hashes.contains(hash) {
                return Err(Error::validation("hash", "already uploaded in this session"));
            }

            let bytes = STANDARD
                .decode(b64)
                .map_err(|_| Error::validation("body", "invalid base64"))?;

            let actual_hash = dockpit_content::content_hash(&bytes);
            if &actual_hash != hash {
                return Err(Error::validation("hash", "does not match decoded content"));
            }

            if let Some(declared_size) = session
                .manifest
                .values()
                .find(|e| &e.hash == hash)
                .and_then(|e| e.size)
            {
                if declared_size != bytes.len() as u64 {
                    return Err(Error::validation("size", "decoded size does not match manifest"));
                }
            }

            let mut paths_for_hash: Vec<&String> = session
                .manifest
                .iter()
                .filter(|(_, e)| &e.hash == hash)
                .map(|(p, _)| p)
                .collect();
            paths_for_hash.sort();
            let content_type = paths_for_hash
                .first()
                .map(|p| dockpit_content::guess_content_type(p))
                .unwrap_or("application/octet-stream");

            self.blob
                .put(&asset_key(project_id, hash), Bytes::from(bytes), PutOptions {
                    metadata: Some(BlobMeta::with_content_type(content_type)),
                    ttl_secs: None,
                })
                .await?;

            session.uploaded_hashes.insert(hash.clone());
        }

        let completion_jwt = if session.all_uploaded() {
            let manifest_json = serde_json::to_string(&session.manifest)
                .map_err(|e| Error::validation("manifest", e.to_string()))?;
            let token = self.jwt.mint(
                CompleteClaims {
                    session_id: session.id.clone(),
                    project_id: project_id.to_string(),
                    phase: Phase::Complete,
                    manifest: manifest_json,
                },
                now_secs(),
            );
            session.completion_token = Some(token.clone());
            Some(token)
        } else {
            None
        };

        self.projects.put_session(&session).await?;

        Ok(UploadedChunk {
            status: if completion_jwt.is_some() { 201 } else { 200 },
            jwt: completion_jwt,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use dockpit_blob::InMemoryBlobStore;
    use dockpit_jwt::JwtCodec;
    use dockpit_projects::BlobProjectStore;

    use super::*;

    fn engine() -> (UploadEngine<InMemoryBlobStore, BlobProjectStore<InMemoryBlobStore>>, String) {
        let blob = InMemoryBlobStore::new();
        let projects = BlobProjectStore::new(InMemoryBlobStore::new());
        let engine = UploadEngine::new(blob, projects, JwtCodec::new(b"test-secret".to_vec()));
        (engine, "proj-1".to_string())
    }

    #[tokio::test]
    async fn full_cycle_cache_miss_then_upload_completes() {
        let (engine, project_id) = engine();
        let body = b"hello world";
        let hash = dockpit_content::content_hash(body);
        let mut manifest = HashMap::new();
        manifest.insert("/index.html".to_string(), ManifestEntry { hash: hash.clone(), size: Some(body.len() as u64) });

        let created = engine.create_session(&project_id, manifest).await.unwrap();
        assert_eq!(created.buckets, vec![vec![hash.clone()]]);

        let mut chunk = HashMap::new();
        chunk.insert(hash.clone(), STANDARD.encode(body));
        let result = engine.upload_chunk(&project_id, &created.jwt, chunk).await.unwrap();
        assert_eq!(result.status, 201);
        assert!(result.jwt.is_some());
    }

    #[tokio::test]
    async fn cache_hit_mints_completion_token_directly() {
        let (engine, project_id) = engine();
        let body = b"cached";
        let hash = dockpit_content::content_hash(body);
        engine
            .blob
            .put(&asset_key(&project_id, &hash), Bytes::from_static(body), PutOptions::default())
            .await
            .unwrap();

        let mut manifest = HashMap::new();
        manifest.insert("/a.txt".to_string(), ManifestEntry { hash, size: None });
        let created = engine.create_session(&project_id, manifest).await.unwrap();
        assert!(created.buckets.is_empty());
    }

    #[tokio::test]
    async fn upload_chunk_rejects_replayed_hash() {
        let (engine, project_id) = engine();
        let body = b"payload";
        let hash = dockpit_content::content_hash(body);
        let mut manifest = HashMap::new();
        manifest.insert("/p".to_string(), ManifestEntry { hash: hash.clone(), size: None });
        let created = engine.create_session(&project_id, manifest).await.unwrap();

        let mut chunk = HashMap::new();
        chunk.insert(hash.clone(), STANDARD.encode(body));
        engine.upload_chunk(&project_id, &created.jwt, chunk.clone()).await.unwrap();

        let second = engine.upload_chunk(&project_id, &created.jwt, chunk).await;
        assert!(matches!(second, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn upload_chunk_rejects_integrity_mismatch() {
        let (engine, project_id) = engine();
        let body = b"payload";
        let hash = dockpit_content::content_hash(body);
        let mut manifest = HashMap::new();
        manifest.insert("/p".to_string(), ManifestEntry { hash: hash.clone(), size: None });
        let created = engine.create_session(&project_id, manifest).await.unwrap();

        let mut chunk = HashMap::new();
        chunk.insert(hash, STANDARD.encode(b"tampered"));
        let result = engine.upload_chunk(&project_id, &created.jwt, chunk).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }
}
