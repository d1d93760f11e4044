//! Three-phase deduplicating upload session engine (spec §4.6, C6). Phase 3
//! (finalize) lives in `dockpit-deploy`; this crate owns phases 1 and 2.

mod engine;
mod error;
mod limits;

pub use engine::{CreatedSession, UploadEngine, UploadedChunk};
pub use error::{Error, Result};
pub use limits::{
    validate_content_hash, validate_pathname, BUCKET_SIZE, MAX_ASSET_SIZE_BYTES,
    MAX_CHUNK_FILES, MAX_MANIFEST_ENTRIES, MAX_PATHNAME_LEN,
};
