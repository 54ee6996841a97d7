//! Orchestration layer: the retrieval flows exposed to the controller
//! layer and the batch synchronizer that backfills the store.

pub mod retrieval;
pub mod sync;

pub use retrieval::{
    CachePolicy, PerformanceSnapshot, RetrievalService, ServiceError, DEFAULT_HISTORY_LIMIT,
    LIST_FRESHNESS,
};
pub use sync::{SyncError, SyncReport, SyncService, DISTRICT_PACING};
