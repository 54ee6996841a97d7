//! Two-tier caching.
//!
//! - `CacheStore`: SQLite-backed persistent store for state/district list
//!   caches, performance snapshots and the sync-run log
//! - `ResponseCache`: short-lived in-memory request deduplication in
//!   front of the retrieval flows

pub mod response;
pub mod store;

pub use response::{ResponseCache, LIST_TTL, SINGLE_RECORD_TTL};
pub use store::{CacheStore, StoreError, SyncRun, SyncStatus};
