//! SQLite-backed persistent cache store.
//!
//! Tables:
//! - `states`, `districts` — list caches with a freshness window on
//!   `updated_at`; upserted by natural key (code)
//! - `performance` — one JSON snapshot per (district, financial year,
//!   month), upserted on re-sync
//! - `sync_runs` — append-only batch outcome log
//!
//! The store itself reports failures; treating them as advisory (logged,
//! degraded to a cache miss) is the orchestrator's job.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::info;

use crate::models::{District, PerformanceRecord, State};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("payload serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Lifecycle states of a batch sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    InProgress,
    Completed,
    Failed,
}

impl SyncStatus {
    fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "completed" => SyncStatus::Completed,
            "failed" => SyncStatus::Failed,
            _ => SyncStatus::InProgress,
        }
    }
}

/// One entry in the sync-run log.
#[derive(Debug, Clone)]
pub struct SyncRun {
    pub id: i64,
    pub status: SyncStatus,
    pub records_synced: u32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS states (
    state_code   TEXT PRIMARY KEY,
    state_name   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS districts (
    district_code TEXT PRIMARY KEY,
    district_name TEXT NOT NULL,
    state_code    TEXT NOT NULL,
    state_name    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_districts_state_name ON districts(state_name);

CREATE TABLE IF NOT EXISTS performance (
    district_code  TEXT NOT NULL,
    financial_year TEXT NOT NULL,
    month          TEXT NOT NULL,
    district_name  TEXT NOT NULL,
    state_code     TEXT NOT NULL,
    state_name     TEXT NOT NULL,
    data           TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE(district_code, financial_year, month)
);
CREATE INDEX IF NOT EXISTS idx_performance_district
    ON performance(district_code, financial_year);

CREATE TABLE IF NOT EXISTS sync_runs (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    status         TEXT NOT NULL,
    records_synced INTEGER NOT NULL DEFAULT 0,
    error_message  TEXT,
    started_at     TEXT NOT NULL,
    completed_at   TEXT
);
";

/// Persistent store shared by the retrieval orchestrator and the batch
/// synchronizer. Reads and writes go through a mutex-guarded connection;
/// entries are upserted by natural key with last-write-wins semantics.
pub struct CacheStore {
    conn: Mutex<Connection>,
}

impl CacheStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            // Opening fails anyway if this cannot be created
            let _ = std::fs::create_dir_all(parent);
        }
        info!(path = %path.display(), "opening cache store");
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // ===== States =====

    /// Return the cached state list entries within the freshness window.
    /// Stale rows are filtered out; an empty result is a miss, not an
    /// error.
    pub fn fresh_states(&self, window: Duration) -> Result<Option<Vec<State>>, StoreError> {
        let cutoff = (Utc::now() - window).to_rfc3339();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT state_code, state_name FROM states
             WHERE updated_at > ?1 ORDER BY state_name",
        )?;
        let states = stmt
            .query_map([cutoff], |row| {
                Ok(State {
                    code: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(if states.is_empty() { None } else { Some(states) })
    }

    pub fn put_states(&self, states: &[State]) -> Result<(), StoreError> {
        self.put_states_at(states, Utc::now())
    }

    fn put_states_at(&self, states: &[State], now: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "INSERT INTO states (state_code, state_name, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(state_code)
             DO UPDATE SET state_name = ?2, updated_at = ?3",
        )?;
        for state in states {
            stmt.execute(params![state.code, state.name, now.to_rfc3339()])?;
        }
        Ok(())
    }

    // ===== Districts =====

    pub fn fresh_districts(
        &self,
        state_name: &str,
        window: Duration,
    ) -> Result<Option<Vec<District>>, StoreError> {
        let cutoff = (Utc::now() - window).to_rfc3339();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT district_code, district_name, state_code, state_name FROM districts
             WHERE state_name = ?1 AND updated_at > ?2 ORDER BY district_name",
        )?;
        let districts = stmt
            .query_map(params![state_name, cutoff], Self::district_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(if districts.is_empty() {
            None
        } else {
            Some(districts)
        })
    }

    pub fn put_districts(&self, districts: &[District]) -> Result<(), StoreError> {
        self.put_districts_at(districts, Utc::now())
    }

    fn put_districts_at(
        &self,
        districts: &[District],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "INSERT INTO districts (district_code, district_name, state_code, state_name, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(district_code)
             DO UPDATE SET district_name = ?2, state_code = ?3, state_name = ?4, updated_at = ?5",
        )?;
        for district in districts {
            stmt.execute(params![
                district.code,
                district.name,
                district.state_code,
                district.state_name,
                now.to_rfc3339()
            ])?;
        }
        Ok(())
    }

    /// All known districts, regardless of freshness. Input for the batch
    /// synchronizer, which assumes districts were seeded previously.
    pub fn all_districts(&self) -> Result<Vec<District>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT district_code, district_name, state_code, state_name
             FROM districts ORDER BY district_name",
        )?;
        let districts = stmt
            .query_map([], Self::district_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(districts)
    }

    fn district_from_row(row: &rusqlite::Row<'_>) -> Result<District, rusqlite::Error> {
        Ok(District {
            code: row.get(0)?,
            name: row.get(1)?,
            state_code: row.get(2)?,
            state_name: row.get(3)?,
        })
    }

    // ===== Performance =====

    /// Upsert one snapshot by its (district, financial year, month)
    /// identity. A re-sync replaces the prior payload for the period.
    pub fn upsert_performance(&self, record: &PerformanceRecord) -> Result<(), StoreError> {
        let data = serde_json::to_string(record)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO performance
                (district_code, financial_year, month,
                 district_name, state_code, state_name, data, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(district_code, financial_year, month)
             DO UPDATE SET district_name = ?4, state_code = ?5, state_name = ?6,
                           data = ?7, updated_at = ?8",
            params![
                record.district_code,
                record.financial_year,
                record.month,
                record.district_name,
                record.state_code,
                record.state_name,
                data,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_performance(
        &self,
        district_code: &str,
        financial_year: &str,
        month: &str,
    ) -> Result<Option<PerformanceRecord>, StoreError> {
        let conn = self.conn()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM performance
                 WHERE district_code = ?1 AND financial_year = ?2 AND month = ?3",
                params![district_code, financial_year, month],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match data {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        })
    }

    /// Stored snapshots for a district, newest first, one per period.
    pub fn performance_history(
        &self,
        district_code: &str,
        limit: u32,
    ) -> Result<Vec<PerformanceRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT data FROM performance
             WHERE district_code = ?1
             ORDER BY financial_year DESC, updated_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![district_code, limit], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    // ===== Sync runs =====

    /// Record the start of a batch run and return its log id.
    pub fn start_sync_run(&self) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_runs (status, started_at) VALUES (?1, ?2)",
            params![SyncStatus::InProgress.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn complete_sync_run(&self, id: i64, records_synced: u32) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sync_runs SET status = ?1, records_synced = ?2, completed_at = ?3
             WHERE id = ?4",
            params![
                SyncStatus::Completed.as_str(),
                records_synced,
                Utc::now().to_rfc3339(),
                id
            ],
        )?;
        Ok(())
    }

    pub fn fail_sync_run(&self, id: i64, error_message: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sync_runs SET status = ?1, error_message = ?2, completed_at = ?3
             WHERE id = ?4",
            params![
                SyncStatus::Failed.as_str(),
                error_message,
                Utc::now().to_rfc3339(),
                id
            ],
        )?;
        Ok(())
    }

    pub fn get_sync_run(&self, id: i64) -> Result<Option<SyncRun>, StoreError> {
        let conn = self.conn()?;
        let run = conn
            .query_row(
                "SELECT id, status, records_synced, error_message, started_at, completed_at
                 FROM sync_runs WHERE id = ?1",
                [id],
                |row| {
                    Ok(SyncRun {
                        id: row.get(0)?,
                        status: SyncStatus::parse(&row.get::<_, String>(1)?),
                        records_synced: row.get(2)?,
                        error_message: row.get(3)?,
                        started_at: parse_ts(&row.get::<_, String>(4)?),
                        completed_at: row.get::<_, Option<String>>(5)?.map(|s| parse_ts(&s)),
                    })
                },
            )
            .optional()?;
        Ok(run)
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
