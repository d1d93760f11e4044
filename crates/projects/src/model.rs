use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Project lifecycle state (spec §3/§4.4). Transitions are owned by the
/// deployment finalizer (C7) and the watchdog (C10) — never by `get`/`list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Pending,
    Ready,
    Error,
}

/// `runWorkerFirst` is either a blanket bool or a list of glob patterns
/// matched against the request path (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunWorkerFirst {
    Bool(bool),
    Globs(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub created_at: String,
    pub updated_at: String,
    pub has_server_code: bool,
    pub assets_count: u64,
    /// Opaque per-project serving config (HTML handling, redirects, custom
    /// headers) — parsed by `dockpit-serving`, stored here as a flexible
    /// JSON document this layer doesn't need to interpret.
    pub serving_config: Option<serde_json::Value>,
    pub run_worker_first: Option<RunWorkerFirst>,
}

impl Project {
    #[must_use]
    pub fn new_pending(id: String, name: String, now_rfc3339: String) -> Self {
        Self {
            id,
            name,
            status: ProjectStatus::Pending,
            created_at: now_rfc3339.clone(),
            updated_at: now_rfc3339,
            has_server_code: false,
            assets_count: 0,
            serving_config: None,
            run_worker_first: None,
        }
    }
}

/// Per-project upload session (spec §3/§4.6). Bound 1:1 to a project;
/// deleted on successful finalize (single-use).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: String,
    pub project_id: String,
    /// path -> (content hash, optional declared size)
    pub manifest: HashMap<String, ManifestEntry>,
    pub buckets: Vec<Vec<String>>,
    pub uploaded_hashes: HashSet<String>,
    pub created_at: String,
    pub completion_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub hash: String,
    pub size: Option<u64>,
}

impl UploadSession {
    #[must_use]
    pub fn all_uploaded(&self) -> bool {
        self.buckets
            .iter()
            .flatten()
            .all(|h| self.uploaded_hashes.contains(h))
    }
}
