//! Application configuration.
//!
//! All settings come from the environment (optionally via a `.env`
//! file): the upstream endpoint and API key, the cache database
//! location, and the sync job's financial year and pacing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// data.gov.in resource endpoint for MGNREGA district performance.
const DEFAULT_API_URL: &str =
    "https://api.data.gov.in/resource/ee03643a-ee4c-48c2-ac30-9f2ff26ab722";

/// Financial year the sync job targets when none is configured.
const DEFAULT_FINANCIAL_YEAR: &str = "2024-2025";

/// Directory name under the platform data dir for the cache database.
const APP_NAME: &str = "nregalens";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    pub db_path: PathBuf,
    pub financial_year: String,
    pub list_cache_window: chrono::Duration,
    pub sync_pacing: Duration,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let api_url =
            std::env::var("DATA_GOV_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_key = std::env::var("DATA_GOV_API_KEY")
            .context("DATA_GOV_API_KEY must be set (register at data.gov.in)")?;

        let db_path = match std::env::var("NREGALENS_DB") {
            Ok(path) => PathBuf::from(path),
            Err(_) => Self::default_db_path()?,
        };

        let financial_year = std::env::var("SYNC_FINANCIAL_YEAR")
            .unwrap_or_else(|_| DEFAULT_FINANCIAL_YEAR.to_string());

        let cache_hours: i64 = std::env::var("CACHE_EXPIRY_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(6);

        let sync_delay_ms: u64 = std::env::var("SYNC_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        Ok(Self {
            api_url,
            api_key,
            db_path,
            financial_year,
            list_cache_window: chrono::Duration::hours(cache_hours),
            sync_pacing: Duration::from_millis(sync_delay_ms),
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join("nregalens.db"))
    }
}
