//! The blob abstraction (spec §4.1, C1): a typed wrapper over an external
//! key→bytes store with prefix-list pagination, batched exists/get, and
//! bounded-parallel prefix delete. The real KV store is an external
//! collaborator (spec §1 Non-goals); this crate only defines the contract
//! and ships an in-memory implementation used by tests and as the default
//! backing for the control plane's own metadata.

mod memory;
mod store;

pub use memory::InMemoryBlobStore;
pub use store::{
    classify_latency, BlobMeta, BlobStore, CacheClass, Error, ListPage, PutOptions, Result,
    BATCH_CHUNK_SIZE, DELETE_BATCH_SIZE, HIT_THRESHOLD_MS,
};
