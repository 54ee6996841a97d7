//! Batch synchronizer: backfills the performance store district by
//! district.
//!
//! The loop is intentionally sequential with a fixed pause between
//! districts; throughput is traded for staying under the upstream rate
//! limit. A district that fails to fetch is logged and skipped, so
//! partial upstream outages still produce a completed run with whatever
//! was reachable.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, RawRecord, RecordQuery, RecordSource, RATE_LIMIT_BACKOFF};
use crate::cache::{CacheStore, StoreError};
use crate::models::{District, PerformanceRecord};

/// Pause between district fetches. The upstream API throttles bursts
/// well below this rate.
pub const DISTRICT_PACING: Duration = Duration::from_millis(500);

/// Page size for the per-district state query; a state reports fewer
/// rows than this per financial year.
const STATE_PAGE_LIMIT: u32 = 100;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Persistence failure outside the per-district loop. Fatal to the
    /// run (and recorded on it), but never to the host process.
    #[error("sync run persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// Outcome of a completed batch run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run_id: i64,
    pub districts_total: usize,
    pub records_synced: u32,
}

/// Sequentially refreshes the current-period snapshot of every known
/// district.
pub struct SyncService<S> {
    source: S,
    store: Arc<CacheStore>,
    financial_year: String,
    pacing: Duration,
}

impl<S: RecordSource> SyncService<S> {
    pub fn new(source: S, store: Arc<CacheStore>, financial_year: impl Into<String>) -> Self {
        Self {
            source,
            store,
            financial_year: financial_year.into(),
            pacing: DISTRICT_PACING,
        }
    }

    /// Override the inter-district pause (tests, or gentler schedules).
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Run one full sync over all districts in the store.
    ///
    /// District-level fetch or upsert failures are logged and skipped;
    /// only failures of the run bookkeeping itself abort the batch.
    /// Records upserted before a fatal failure remain in place.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        info!(financial_year = %self.financial_year, "starting batch sync");
        let run_id = self.store.start_sync_run()?;

        let districts = match self.store.all_districts() {
            Ok(districts) => districts,
            Err(e) => {
                error!(error = %e, "could not load district list");
                self.store.fail_sync_run(run_id, &e.to_string())?;
                return Err(e.into());
            }
        };

        let mut records_synced = 0u32;
        for district in &districts {
            match self.fetch_district(district).await {
                Ok(Some(raw)) => {
                    let record = PerformanceRecord::from_raw(&raw);
                    match self.store.upsert_performance(&record) {
                        Ok(()) => {
                            records_synced += 1;
                            info!(district = %district.name, "synced district");
                        }
                        Err(e) => {
                            warn!(district = %district.name, error = %e, "upsert failed; skipping district");
                        }
                    }
                }
                Ok(None) => {
                    debug!(district = %district.name, "no upstream data for district");
                }
                Err(e) => {
                    warn!(district = %district.name, error = %e, "fetch failed; skipping district");
                }
            }

            tokio::time::sleep(self.pacing).await;
        }

        self.store.complete_sync_run(run_id, records_synced)?;
        info!(records_synced, total = districts.len(), "batch sync completed");

        Ok(SyncReport {
            run_id,
            districts_total: districts.len(),
            records_synced,
        })
    }

    /// Fetch the current-period rows for the district's parent state and
    /// pick the row matching the district. Retries exactly once after a
    /// fixed backoff when rate limited.
    async fn fetch_district(&self, district: &District) -> Result<Option<RawRecord>, ApiError> {
        let query = RecordQuery::new()
            .state(&district.state_name)
            .financial_year(&self.financial_year)
            .limit(STATE_PAGE_LIMIT);

        let records = match self.source.fetch_records(&query).await {
            Ok(records) => records,
            Err(e) if e.is_rate_limited() => {
                warn!(district = %district.name, "rate limited; retrying after backoff");
                tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
                self.source.fetch_records(&query).await?
            }
            Err(e) => return Err(e),
        };

        Ok(match_district(&records, &district.name).cloned())
    }
}

/// Pick the upstream row for a district by case-insensitive substring
/// containment in either direction. Upstream spellings drift, so exact
/// equality misses real matches; the cost is ambiguity between
/// similarly named districts (e.g. "Balod" also matches "Baloda Bazar"),
/// where the first row in upstream order wins.
fn match_district<'a>(records: &'a [RawRecord], district_name: &str) -> Option<&'a RawRecord> {
    let wanted = district_name.to_lowercase();
    records.iter().find(|record| {
        match record.get("district_name").and_then(|v| v.as_str()) {
            Some(name) => {
                let candidate = name.to_lowercase();
                candidate.contains(&wanted) || wanted.contains(&candidate)
            }
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SyncStatus;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted source: pops one canned response per fetch call.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Vec<RawRecord>, ApiError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<RawRecord>, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl RecordSource for &ScriptedSource {
        async fn fetch_records(&self, _query: &RecordQuery) -> Result<Vec<RawRecord>, ApiError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn perf_row(district: &str) -> RawRecord {
        [
            ("district_code", json!("0911")),
            ("district_name", json!(district)),
            ("state_code", json!("09")),
            ("state_name", json!("Uttar Pradesh")),
            ("fin_year", json!("2024-2025")),
            ("month", json!("January")),
            ("Total_No_of_Workers", json!("500")),
            ("Total_No_of_Active_Workers", json!("400")),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }

    fn district(code: &str, name: &str) -> District {
        District {
            code: code.into(),
            name: name.into(),
            state_code: "09".into(),
            state_name: "Uttar Pradesh".into(),
        }
    }

    fn seeded_store(districts: &[District]) -> Arc<CacheStore> {
        let store = Arc::new(CacheStore::open_in_memory().unwrap());
        store.put_districts(districts).unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_still_completes() {
        // Three districts: one syncs, one fetch fails, one has no data.
        let store = seeded_store(&[
            district("0911", "Agra"),
            district("0912", "Aligarh"),
            district("0913", "Amethi"),
        ]);
        let source = ScriptedSource::new(vec![
            Ok(vec![perf_row("Agra")]),
            Err(ApiError::Unavailable("connection reset".into())),
            Ok(Vec::new()),
        ]);

        let sync = SyncService::new(&source, store.clone(), "2024-2025");
        let report = sync.run().await.unwrap();

        assert_eq!(report.districts_total, 3);
        assert_eq!(report.records_synced, 1);

        let run = store.get_sync_run(report.run_id).unwrap().unwrap();
        assert_eq!(run.status, SyncStatus::Completed);
        assert_eq!(run.records_synced, 1);
        assert!(run.error_message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_once() {
        let store = seeded_store(&[district("0911", "Agra")]);
        let source = ScriptedSource::new(vec![
            Err(ApiError::RateLimited),
            Ok(vec![perf_row("Agra")]),
        ]);

        let sync = SyncService::new(&source, store.clone(), "2024-2025");
        let report = sync.run().await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(report.records_synced, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_rate_limit_skips_district() {
        let store = seeded_store(&[district("0911", "Agra")]);
        let source = ScriptedSource::new(vec![
            Err(ApiError::RateLimited),
            Err(ApiError::RateLimited),
        ]);

        let sync = SyncService::new(&source, store.clone(), "2024-2025");
        let report = sync.run().await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(report.records_synced, 0);
        let run = store.get_sync_run(report.run_id).unwrap().unwrap();
        assert_eq!(run.status, SyncStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synced_record_persisted_and_normalized() {
        let store = seeded_store(&[district("0911", "Agra")]);
        let source = ScriptedSource::new(vec![Ok(vec![perf_row("Agra")])]);

        SyncService::new(&source, store.clone(), "2024-2025")
            .run()
            .await
            .unwrap();

        let record = store
            .get_performance("0911", "2024-2025", "January")
            .unwrap()
            .unwrap();
        assert_eq!(record.total_workers, 500.0);
        assert_eq!(record.employment_demand_fulfilled_percent, 80.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_district_list_completes_with_zero() {
        let store = Arc::new(CacheStore::open_in_memory().unwrap());
        let source = ScriptedSource::new(Vec::new());

        let report = SyncService::new(&source, store.clone(), "2024-2025")
            .run()
            .await
            .unwrap();

        assert_eq!(report.records_synced, 0);
        assert_eq!(source.calls(), 0);
        let run = store.get_sync_run(report.run_id).unwrap().unwrap();
        assert_eq!(run.status, SyncStatus::Completed);
    }

    #[test]
    fn test_fuzzy_match_both_directions() {
        let records = vec![perf_row("Agra Rural")];
        // Stored name contained in upstream name
        assert!(match_district(&records, "Agra").is_some());
        // Upstream name contained in stored name
        let records = vec![perf_row("Agra")];
        assert!(match_district(&records, "Agra District").is_some());
        // Case differences
        assert!(match_district(&records, "AGRA").is_some());
        // No overlap
        assert!(match_district(&records, "Aligarh").is_none());
    }
}
