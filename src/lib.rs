//! nregalens - cache-augmented retrieval layer for MGNREGA statistics.
//!
//! Aggregates rural-employment-program data from the data.gov.in open
//! API, normalizes upstream field names into one canonical record shape,
//! derives performance indicators, and caches results in SQLite to keep
//! upstream calls down. The HTTP controller layer and dashboard frontend
//! consume this crate; they are not part of it.
//!
//! Main pieces:
//! - [`api::DataGovClient`]: parameterized reads against the upstream API
//! - [`models`]: canonical records, normalization, indicator computation
//! - [`cache::CacheStore`] / [`cache::ResponseCache`]: persistent and
//!   request-level caching
//! - [`service::RetrievalService`]: cache-hit vs upstream-fetch per flow
//! - [`service::SyncService`]: the sequential district backfill job

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod service;

pub use api::{ApiError, DataGovClient};
pub use cache::{CacheStore, ResponseCache};
pub use config::Config;
pub use models::{District, Indicators, PerformanceRecord, State};
pub use service::{CachePolicy, RetrievalService, SyncService};
