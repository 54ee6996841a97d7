//! Retrieval orchestrator: the four entity flows behind the dashboard.
//!
//! List flows (states, districts) read through the persistent store with
//! a multi-hour freshness window; performance flows always fetch fresh
//! from upstream because current-period figures change too often to
//! trust a long-lived cache, and only write through for auditing. A
//! short-TTL response cache in front of all four flows absorbs repeated
//! identical requests.
//!
//! The cache is advisory throughout: any store failure is logged and
//! degraded to a miss so the service keeps working in direct-upstream
//! mode. Concurrent identical requests may each miss and fetch upstream;
//! there is no single-flight coalescing, which is acceptable because all
//! flows are idempotent.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, RecordQuery, RecordSource};
use crate::cache::{CacheStore, ResponseCache, LIST_TTL, SINGLE_RECORD_TTL};
use crate::models::{District, Indicators, PerformanceRecord, State};

/// Freshness window for the persistent state/district list caches.
pub const LIST_FRESHNESS: Duration = Duration::hours(6);

/// Default page size for history queries (one financial year of months).
pub const DEFAULT_HISTORY_LIMIT: u32 = 12;

/// How the orchestrator uses the persistent store.
///
/// One parameterized service replaces the three near-duplicate variants
/// (pure-API, DB-hybrid, DB-model) so the derivation logic exists in
/// exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Never touch the store: direct-upstream mode.
    None,
    /// List flows read the store within the freshness window and
    /// repopulate it on miss; performance flows write through.
    ReadThrough,
    /// Populate the store after upstream fetches but never serve from it.
    WriteThrough,
}

impl CachePolicy {
    fn reads(&self) -> bool {
        matches!(self, CachePolicy::ReadThrough)
    }

    fn writes(&self) -> bool {
        !matches!(self, CachePolicy::None)
    }
}

/// Typed failure for the public retrieval operations. "Not found" is not
/// a failure; those surface as `None` or an empty list.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("upstream fetch failed: {0}")]
    Upstream(#[from] ApiError),
}

/// A performance record together with its derived indicators.
/// Indicators are recomputed on every read and never cached.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSnapshot {
    #[serde(flatten)]
    pub record: PerformanceRecord,
    pub indicators: Indicators,
}

impl PerformanceSnapshot {
    fn new(record: PerformanceRecord) -> Self {
        let indicators = Indicators::compute(&record);
        Self { record, indicators }
    }
}

/// Orchestrates cache-hit versus upstream-fetch per entity flow.
pub struct RetrievalService<S> {
    source: S,
    store: Option<Arc<CacheStore>>,
    policy: CachePolicy,
    responses: ResponseCache,
    list_freshness: Duration,
}

impl<S: RecordSource> RetrievalService<S> {
    pub fn new(source: S, store: Option<Arc<CacheStore>>, policy: CachePolicy) -> Self {
        Self {
            source,
            store,
            policy,
            responses: ResponseCache::new(),
            list_freshness: LIST_FRESHNESS,
        }
    }

    /// Override the persistent list-cache freshness window.
    pub fn with_list_freshness(mut self, window: Duration) -> Self {
        self.list_freshness = window;
        self
    }

    fn store(&self) -> Option<&CacheStore> {
        self.store.as_deref()
    }

    /// All states known to the program, deduplicated by state code.
    pub async fn list_states(&self) -> Result<Vec<State>, ServiceError> {
        let key = "states:all";
        if let Some(cached) = self.responses.get::<Vec<State>>(key) {
            debug!("states served from response cache");
            return Ok(cached);
        }

        if self.policy.reads() {
            if let Some(states) = self.cached_states() {
                info!(count = states.len(), "states served from store");
                self.responses.put(key, &states, LIST_TTL);
                return Ok(states);
            }
        }

        info!("fetching states from upstream");
        let records = self.source.fetch_records(&RecordQuery::new()).await?;
        let states = State::collect_unique(&records);

        if self.policy.writes() {
            if let Some(store) = self.store() {
                if let Err(e) = store.put_states(&states) {
                    warn!(error = %e, "failed to cache states; continuing");
                }
            }
        }

        self.responses.put(key, &states, LIST_TTL);
        Ok(states)
    }

    /// Districts of one state, deduplicated by district code.
    pub async fn list_districts(&self, state_name: &str) -> Result<Vec<District>, ServiceError> {
        let key = format!("districts:{state_name}");
        if let Some(cached) = self.responses.get::<Vec<District>>(&key) {
            debug!(state = state_name, "districts served from response cache");
            return Ok(cached);
        }

        if self.policy.reads() {
            if let Some(districts) = self.cached_districts(state_name) {
                info!(state = state_name, count = districts.len(), "districts served from store");
                self.responses.put(&key, &districts, LIST_TTL);
                return Ok(districts);
            }
        }

        info!(state = state_name, "fetching districts from upstream");
        let query = RecordQuery::new().state(state_name);
        let records = self.source.fetch_records(&query).await?;
        let districts = District::collect_unique(&records);

        if self.policy.writes() {
            if let Some(store) = self.store() {
                if let Err(e) = store.put_districts(&districts) {
                    warn!(error = %e, "failed to cache districts; continuing");
                }
            }
        }

        self.responses.put(&key, &districts, LIST_TTL);
        Ok(districts)
    }

    /// Latest performance snapshot for one district, always fetched
    /// fresh from upstream. `None` when upstream has no matching record.
    pub async fn latest_performance(
        &self,
        district_name: &str,
        state_name: &str,
        financial_year: &str,
    ) -> Result<Option<PerformanceSnapshot>, ServiceError> {
        let key = format!("performance:{district_name}|{state_name}|{financial_year}");
        if let Some(record) = self.responses.get::<PerformanceRecord>(&key) {
            debug!(district = district_name, "performance served from response cache");
            return Ok(Some(PerformanceSnapshot::new(record)));
        }

        let query = RecordQuery::new()
            .state(state_name)
            .district(district_name)
            .financial_year(financial_year)
            .limit(1);
        let records = self.source.fetch_records(&query).await?;

        let Some(raw) = records.first() else {
            info!(
                district = district_name,
                state = state_name,
                financial_year,
                "no performance data upstream"
            );
            return Ok(None);
        };

        let record = PerformanceRecord::from_raw(raw);
        self.write_through(&record);
        self.responses.put(&key, &record, SINGLE_RECORD_TTL);
        Ok(Some(PerformanceSnapshot::new(record)))
    }

    /// Recent performance periods for one district, newest first as
    /// upstream reports them. Empty when upstream has none.
    pub async fn performance_history(
        &self,
        district_name: &str,
        state_name: &str,
        financial_year: &str,
        limit: u32,
    ) -> Result<Vec<PerformanceRecord>, ServiceError> {
        let key = format!("history:{district_name}|{state_name}|{financial_year}|{limit}");
        if let Some(records) = self.responses.get::<Vec<PerformanceRecord>>(&key) {
            debug!(district = district_name, "history served from response cache");
            return Ok(records);
        }

        let query = RecordQuery::new()
            .state(state_name)
            .district(district_name)
            .financial_year(financial_year)
            .limit(limit);
        let raw_records = self.source.fetch_records(&query).await?;

        let records: Vec<PerformanceRecord> =
            raw_records.iter().map(PerformanceRecord::from_raw).collect();
        for record in &records {
            self.write_through(record);
        }

        self.responses.put(&key, &records, LIST_TTL);
        Ok(records)
    }

    // ===== Advisory store access =====

    fn cached_states(&self) -> Option<Vec<State>> {
        let store = self.store()?;
        match store.fresh_states(self.list_freshness) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "state cache read failed; treating as miss");
                None
            }
        }
    }

    fn cached_districts(&self, state_name: &str) -> Option<Vec<District>> {
        let store = self.store()?;
        match store.fresh_districts(state_name, self.list_freshness) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "district cache read failed; treating as miss");
                None
            }
        }
    }

    fn write_through(&self, record: &PerformanceRecord) {
        if !self.policy.writes() {
            return;
        }
        if let Some(store) = self.store() {
            if let Err(e) = store.upsert_performance(record) {
                warn!(
                    district = %record.district_code,
                    error = %e,
                    "failed to write performance through to store; continuing"
                );
            }
        }
    }
}
