use serde::{Deserialize, Serialize};

/// The two phases an upload session token can be scoped to (spec §4.5/§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Upload,
    Complete,
}

/// Claims minted for the per-chunk upload phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadClaims {
    pub session_id: String,
    pub project_id: String,
    pub phase: Phase,
}

/// Claims minted once a session has staged every asset and is ready to
/// finalize (spec §4.6). Carries the manifest bytes so the finalizer (C7)
/// never has to trust a client-supplied manifest it didn't itself mint a
/// token against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteClaims {
    pub session_id: String,
    pub project_id: String,
    pub phase: Phase,
    pub manifest: String,
}
