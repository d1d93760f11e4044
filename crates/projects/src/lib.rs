//! Project metadata + upload-session store (spec §4.4, C4). Project metadata
//! and upload sessions both live as JSON documents in the blob namespace
//! (spec §4.4) rather than behind a separate SQL schema, so this crate's one
//! production backing is [`dockpit_blob::BlobStore`].

mod error;
mod model;
mod store;

pub use error::{Error, Result};
pub use model::{ManifestEntry, Project, ProjectStatus, RunWorkerFirst, UploadSession};
pub use store::{BlobProjectStore, ListProjectsPage, ProjectStore, PENDING_TTL_SECS, SESSION_TTL_SECS};
