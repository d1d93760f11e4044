use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use dockpit_blob::{BlobMeta, BlobStore, PutOptions};
use dockpit_jwt::{CompleteClaims, JwtCodec, Phase};
use dockpit_projects::{ManifestEntry, Project, ProjectStatus, ProjectStore};

use crate::{
    error::{Error, Result},
    limits::{
        MAX_ENV_NAME_LEN, MAX_ENV_VALUE_BYTES, MAX_ENV_VARS, MAX_MODULE_PATH_LEN,
        MAX_PROJECT_NAME_LEN, MAX_SERVER_CODE_BYTES,
    },
    model::{module_key, module_manifest_key, DeployRequest, ModuleRef, ServerCodeManifest, DEFAULT_COMPATIBILITY_DATE},
};

fn now_secs() -> u64 {
    dockpit_common::time::now_ms() / 1000
}

fn asset_key(project_id: &str, hash: &str) -> String {
    format!("project/{project_id}/asset/{hash}")
}

fn manifest_blob_key(project_id: &str) -> String {
    format!("project/{project_id}/manifest")
}

/// Outcome of the write-side work (steps 3–4), applied to the project
/// metadata only once it has all succeeded (step 5, "commit").
#[derive(Default)]
struct AppliedOutcome {
    assets_count: Option<u64>,
    has_server_code: bool,
}

/// Verifies the completion token, writes the binary asset manifest, stores
/// server-code modules content-addressed, and transitions the project to
/// `READY`/`ERROR` (spec §4.7, C7).
pub struct DeploymentFinalizer<B, P> {
    blob: B,
    projects: P,
    jwt: JwtCodec,
}

impl<B: BlobStore, P: ProjectStore> DeploymentFinalizer<B, P> {
    pub fn new(blob: B, projects: P, jwt: JwtCodec) -> Self {
        Self { blob, projects, jwt }
    }

    fn validate(req: &DeployRequest) -> Result<()> {
        if let Some(name) = &req.project_name {
            if name.len() > MAX_PROJECT_NAME_LEN {
                return Err(Error::validation("projectName", "exceeds max length"));
            }
        }
        if let Some(env) = &req.env {
            if env.len() > MAX_ENV_VARS {
                return Err(Error::validation("env", "too many env vars"));
            }
            for (name, value) in env {
                if name.len() > MAX_ENV_NAME_LEN {
                    return Err(Error::validation("env", "env var name too long"));
                }
                if value.len() > MAX_ENV_VALUE_BYTES {
                    return Err(Error::validation("env", "env var value too large"));
                }
            }
        }
        if let Some(server) = &req.server {
            let mut total = 0usize;
            for (path, module) in &server.modules {
                if path.len() > MAX_MODULE_PATH_LEN {
                    return Err(Error::validation("modules", "module path too long"));
                }
                total += module.content_base64().len();
            }
            if total > MAX_SERVER_CODE_BYTES {
                return Err(Error::validation("server", "total server-code size exceeds limit"));
            }
        }
        Ok(())
    }

    pub async fn finalize(&self, project_id: &str, req: DeployRequest) -> Result<Project> {
        let project = self.projects.get(project_id).await?.ok_or(Error::NotFound)?;
        if project.status == ProjectStatus::Ready {
            return Err(Error::Immutable);
        }
        Self::validate(&req)?;

        let outcome = match self.apply(project_id, &req).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.mark_error(project_id).await;
                return Err(e);
            }
        };

        let Some(mut project) = self.projects.get(project_id).await? else {
            return Err(Error::NotFound); // no resurrection: deleted mid-deploy
        };
        if let Some(name) = req.project_name {
            project.name = name;
        }
        if let Some(assets_count) = outcome.assets_count {
            project.assets_count = assets_count;
        }
        if let Some(config) = req.config {
            project.serving_config = Some(config);
        }
        if let Some(run_worker_first) = req.run_worker_first {
            project.run_worker_first = Some(run_worker_first);
        }
        if outcome.has_server_code {
            project.has_server_code = true;
        }
        project.status = ProjectStatus::Ready;
        project.updated_at = dockpit_common::time::now_rfc3339();
        self.projects.put(&project).await?;
        Ok(project)
    }

    async fn apply(&self, project_id: &str, req: &DeployRequest) -> Result<AppliedOutcome> {
        let mut outcome = AppliedOutcome::default();

        if let Some(completion_jwt) = &req.completion_jwt {
            outcome.assets_count = Some(self.finalize_assets(project_id, completion_jwt).await?);
        }

        if let Some(server) = &req.server {
            self.finalize_server_code(project_id, server, req.env.clone().unwrap_or_default())
                .await?;
            outcome.has_server_code = true;
        }

        Ok(outcome)
    }

    async fn finalize_assets(&self, project_id: &str, completion_jwt: &str) -> Result<u64> {
        let claims: CompleteClaims =
            self.jwt.verify(completion_jwt, now_secs()).ok_or(Error::Unauthorized)?;
        if claims.phase != Phase::Complete || claims.project_id != project_id {
            return Err(Error::Unauthorized);
        }

        let session = self
            .projects
            .get_session(project_id, &claims.session_id)
            .await?
            .ok_or(Error::Unauthorized)?;
        if session.completion_token.as_deref() != Some(completion_jwt) {
            return Err(Error::Unauthorized);
        }
        self.projects.delete_session(project_id, &claims.session_id).await?;

        let manifest: HashMap<String, ManifestEntry> =
            serde_json::from_str(&claims.manifest).map_err(|_| Error::Unauthorized)?;

        let keys: Vec<String> = manifest.values().map(|e| asset_key(project_id, &e.hash)).collect();
        let present = self.blob.batch_exists(&keys).await?;
        let missing: Vec<&str> = manifest
            .values()
            .filter(|e| !present.contains(&asset_key(project_id, &e.hash)))
            .map(|e| e.hash.as_str())
            .collect();
        if !missing.is_empty() {
            tracing::warn!(project_id = %project_id, count = missing.len(), "finalize: missing asset hashes at commit time");
        }

        let entries: Vec<(&str, &str)> =
            manifest.iter().map(|(path, e)| (path.as_str(), e.hash.as_str())).collect();
        let bytes = dockpit_manifest::encode(entries)?;
        self.blob
            .put(&manifest_blob_key(project_id), Bytes::from(bytes), PutOptions::default())
            .await?;

        Ok(manifest.len() as u64)
    }

    async fn finalize_server_code(
        &self,
        project_id: &str,
        server: &crate::model::ServerCodeInput,
        env: HashMap<String, String>,
    ) -> Result<()> {
        let mut modules = HashMap::with_capacity(server.modules.len());
        let mut hashes = Vec::with_capacity(server.modules.len());

        for (path, input) in &server.modules {
            let bytes = STANDARD
                .decode(input.content_base64())
                .map_err(|_| Error::validation("modules", "invalid base64"))?;
            let module_type = input.explicit_type().unwrap_or_else(|| dockpit_content::infer_module_type(path));
            let hash = dockpit_content::content_hash(&bytes);
            hashes.push((hash.clone(), bytes));
            modules.insert(path.clone(), ModuleRef { hash, module_type });
        }

        let keys: Vec<String> = hashes.iter().map(|(h, _)| module_key(project_id, h)).collect();
        let present = self.blob.batch_exists(&keys).await?;
        for (hash, bytes) in hashes {
            let key = module_key(project_id, &hash);
            if present.contains(&key) {
                continue;
            }
            self.blob.put(&key, Bytes::from(bytes), PutOptions::default()).await?;
        }

        let manifest = ServerCodeManifest {
            entrypoint: server.entrypoint.clone(),
            modules,
            compatibility_date: DEFAULT_COMPATIBILITY_DATE.to_string(),
            env,
        };
        let json = serde_json::to_vec(&manifest).map_err(|e| Error::validation("server", e.to_string()))?;
        self.blob
            .put(&module_manifest_key(project_id), Bytes::from(json), PutOptions {
                metadata: Some(BlobMeta::with_content_type("application/json")),
                ttl_secs: None,
            })
            .await?;
        Ok(())
    }

    async fn mark_error(&self, project_id: &str) {
        let Ok(Some(mut project)) = self.projects.get(project_id).await else {
            return;
        };
        project.status = ProjectStatus::Error;
        project.updated_at = dockpit_common::time::now_rfc3339();
        if let Err(e) = self.projects.put(&project).await {
            tracing::warn!(project_id = %project_id, error = %e, "failed to mark project ERROR after finalize failure");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use dockpit_blob::InMemoryBlobStore;
    use dockpit_jwt::JwtCodec;
    use dockpit_projects::{BlobProjectStore, UploadSession};

    use super::*;

    fn secret() -> Vec<u8> {
        b"shared-test-secret".to_vec()
    }

    fn empty_request() -> DeployRequest {
        DeployRequest {
            project_name: None,
            completion_jwt: None,
            server: None,
            config: None,
            run_worker_first: None,
            env: None,
        }
    }

    /// Stand in for phase 2 having already uploaded the one asset and
    /// minted a completion token, without going through `dockpit-upload`
    /// (exercised separately in that crate's own tests).
    async fn seed_completed_session(
        blob: &InMemoryBlobStore,
        projects: &BlobProjectStore<InMemoryBlobStore>,
        jwt: &JwtCodec,
        project_id: &str,
    ) -> String {
        let body = b"<html></html>";
        let hash = dockpit_content::content_hash(body);
        blob.put(&asset_key(project_id, &hash), Bytes::from_static(body), PutOptions::default())
            .await
            .unwrap();

        let mut manifest = HashMap::new();
        manifest.insert("/index.html".to_string(), ManifestEntry { hash, size: None });
        let manifest_json = serde_json::to_string(&manifest).unwrap();

        let session_id = "sess-finalize".to_string();
        let completion_jwt = jwt.mint(
            CompleteClaims {
                session_id: session_id.clone(),
                project_id: project_id.to_string(),
                phase: Phase::Complete,
                manifest: manifest_json,
            },
            now_secs(),
        );

        let session = UploadSession {
            id: session_id,
            project_id: project_id.to_string(),
            manifest,
            buckets: vec![],
            uploaded_hashes: std::collections::HashSet::new(),
            created_at: dockpit_common::time::now_rfc3339(),
            completion_token: Some(completion_jwt.clone()),
        };
        projects.create_session(&session).await.unwrap();
        completion_jwt
    }

    #[tokio::test]
    async fn finalize_writes_manifest_and_transitions_ready() {
        let blob = InMemoryBlobStore::new();
        let projects = BlobProjectStore::new(InMemoryBlobStore::new());
        let jwt = JwtCodec::new(secret());
        let project = projects.create(Some("site".into())).await.unwrap();

        let completion_jwt = seed_completed_session(&blob, &projects, &jwt, &project.id).await;

        let finalizer = DeploymentFinalizer::new(blob, projects, JwtCodec::new(secret()));
        let req = DeployRequest { completion_jwt: Some(completion_jwt), ..empty_request() };
        let deployed = finalizer.finalize(&project.id, req).await.unwrap();
        assert_eq!(deployed.status, ProjectStatus::Ready);
        assert_eq!(deployed.assets_count, 1);
    }

    #[tokio::test]
    async fn finalize_rejects_redeploy_of_ready_project() {
        let projects = BlobProjectStore::new(InMemoryBlobStore::new());
        let project = projects.create(None).await.unwrap();
        let mut ready = project.clone();
        ready.status = ProjectStatus::Ready;
        projects.put(&ready).await.unwrap();

        let finalizer = DeploymentFinalizer::new(InMemoryBlobStore::new(), projects, JwtCodec::new(secret()));
        let result = finalizer.finalize(&project.id, empty_request()).await;
        assert!(matches!(result, Err(Error::Immutable)));
    }

    #[tokio::test]
    async fn finalize_rejects_missing_project() {
        let projects = BlobProjectStore::new(InMemoryBlobStore::new());
        let finalizer = DeploymentFinalizer::new(InMemoryBlobStore::new(), projects, JwtCodec::new(secret()));
        let result = finalizer.finalize("missing-project", empty_request()).await;
        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn finalize_rejects_replayed_completion_token() {
        let blob = InMemoryBlobStore::new();
        let projects = BlobProjectStore::new(InMemoryBlobStore::new());
        let jwt = JwtCodec::new(secret());
        let project = projects.create(None).await.unwrap();
        let completion_jwt = seed_completed_session(&blob, &projects, &jwt, &project.id).await;
        // Consume the session once, as a prior finalize call would.
        projects.delete_session(&project.id, "sess-finalize").await.unwrap();

        let finalizer = DeploymentFinalizer::new(blob, projects, JwtCodec::new(secret()));
        let req = DeployRequest { completion_jwt: Some(completion_jwt), ..empty_request() };
        let result = finalizer.finalize(&project.id, req).await;
        assert!(matches!(result, Err(Error::Unauthorized)));
    }
}
