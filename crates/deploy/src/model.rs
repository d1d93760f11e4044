use std::collections::HashMap;

use dockpit_content::ModuleType;
use dockpit_projects::RunWorkerFirst;
use serde::{Deserialize, Serialize};

/// The default `compatibilityDate` stamped on a server-code manifest when
/// the deploy request doesn't override it (spec §4.7).
pub const DEFAULT_COMPATIBILITY_DATE: &str = "2025-11-09";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub project_name: Option<String>,
    pub completion_jwt: Option<String>,
    pub server: Option<ServerCodeInput>,
    pub config: Option<serde_json::Value>,
    pub run_worker_first: Option<RunWorkerFirst>,
    pub env: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerCodeInput {
    pub entrypoint: String,
    pub modules: HashMap<String, ModuleInput>,
}

/// A module entry is either a bare base64 string or `{content, type}` with
/// an explicit type override (spec §4.7.4a).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModuleInput {
    Bare(String),
    Typed { content: String, #[serde(rename = "type")] module_type: Option<ModuleType> },
}

impl ModuleInput {
    #[must_use]
    pub fn content_base64(&self) -> &str {
        match self {
            Self::Bare(s) => s,
            Self::Typed { content, .. } => content,
        }
    }

    #[must_use]
    pub fn explicit_type(&self) -> Option<ModuleType> {
        match self {
            Self::Bare(_) => None,
            Self::Typed { module_type, .. } => *module_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRef {
    pub hash: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCodeManifest {
    pub entrypoint: String,
    pub modules: HashMap<String, ModuleRef>,
    pub compatibility_date: String,
    pub env: HashMap<String, String>,
}

/// Blob key for a project's server-code module bytes, content-addressed
/// (spec §4.7).
#[must_use]
pub fn module_key(project_id: &str, hash: &str) -> String {
    format!("project/{project_id}/module/{hash}")
}

/// Blob key for a project's server-code module manifest, the index this
/// crate writes at deploy time and `dockpit-router` reads back at request
/// time.
#[must_use]
pub fn module_manifest_key(project_id: &str) -> String {
    format!("project/{project_id}/module/MANIFEST")
}
