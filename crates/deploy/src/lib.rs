//! Deployment finalizer (spec §4.7, C7): phase 3 of the upload protocol.
//! Verifies the completion token, writes the binary asset manifest, stores
//! server-code modules content-addressed, and commits the project to
//! `READY` (or rolls it back to `ERROR` on failure).

mod error;
mod finalizer;
mod limits;
mod model;

pub use error::{Error, Result};
pub use finalizer::DeploymentFinalizer;
pub use model::{
    module_key, module_manifest_key, DeployRequest, ModuleInput, ModuleRef, ServerCodeInput,
    ServerCodeManifest, DEFAULT_COMPATIBILITY_DATE,
};
