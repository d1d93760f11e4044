use std::sync::Arc;

use dockpit_blob::{BlobStore, InMemoryBlobStore};
use dockpit_config::Config;
use dockpit_deploy::DeploymentFinalizer;
use dockpit_jwt::JwtCodec;
use dockpit_projects::{BlobProjectStore, ProjectStore};
use dockpit_router::ServerCodeExecutor;
use dockpit_upload::UploadEngine;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use crate::executor::HttpServerCodeExecutor;

/// Shared blob store handle. `InMemoryBlobStore` is the only production
/// backing this workspace ships (spec §4.1: the real KV store is an
/// external collaborator) — wrapped as a trait object so every collaborator
/// shares the one instance instead of each owning a clone.
pub type Blob = Arc<dyn BlobStore>;
pub type Projects = Arc<dyn ProjectStore>;

/// Everything a request handler needs, cloned cheaply (every field is an
/// `Arc`) into each `axum` handler via `State`.
#[derive(Clone)]
pub struct AppState {
    pub blob: Blob,
    pub projects: Projects,
    pub upload: Arc<UploadEngine<Blob, Projects>>,
    pub finalizer: Arc<DeploymentFinalizer<Blob, Projects>>,
    /// Hex SHA-256 digest of the admin token, compared in constant time
    /// against each request's candidate (spec §4.11) — the plaintext token
    /// itself is exposed once here and never stored.
    pub admin_token_digest: Arc<str>,
    /// `None` when no worker runtime is configured; traffic for projects
    /// with server code then falls through to a 404 instead of invoking it.
    pub executor: Option<Arc<HttpServerCodeExecutor>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let blob: Blob = Arc::new(InMemoryBlobStore::new());
        let projects: Projects = Arc::new(BlobProjectStore::new(blob.clone()));

        let jwt_secret = config.jwt_secret.expose_secret().clone().into_bytes();
        let upload = UploadEngine::new(blob.clone(), projects.clone(), JwtCodec::new(jwt_secret.clone()));
        let finalizer = DeploymentFinalizer::new(blob.clone(), projects.clone(), JwtCodec::new(jwt_secret));

        let mut hasher = Sha256::new();
        hasher.update(config.admin_token.expose_secret().as_bytes());
        let admin_token_digest: String = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect();

        let executor = config.worker_runtime_url.clone().map(|url| Arc::new(HttpServerCodeExecutor::new(url)));

        Self {
            blob,
            projects,
            upload: Arc::new(upload),
            finalizer: Arc::new(finalizer),
            admin_token_digest: admin_token_digest.into(),
            executor,
        }
    }

    /// Borrow the configured executor as a trait object, the shape
    /// `dockpit_router::route` expects.
    #[must_use]
    pub fn executor(&self) -> Option<&dyn ServerCodeExecutor> {
        self.executor.as_deref().map(|e| e as &dyn ServerCodeExecutor)
    }
}
