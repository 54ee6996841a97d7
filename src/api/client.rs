//! HTTP client for the data.gov.in open-data API.
//!
//! The MGNREGA resource is a single flat table queried with equality
//! filters and limit/offset pagination. Records come back as loosely
//! typed key/value objects; normalization into domain types happens in
//! `models`, not here.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// The batch synchronizer issues hundreds of sequential calls, so a tight
/// budget keeps total run time bounded.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default page size for list queries. The resource holds well under a
/// thousand rows per state, so one page covers a full list fetch.
pub const DEFAULT_LIST_LIMIT: u32 = 1000;

/// A raw upstream record: a flat JSON object keyed by the API's native
/// field names (`Total_No_of_JobCards_issued`, `fin_year`, ...).
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Option<Vec<RawRecord>>,
}

/// Equality filters and pagination for a record query.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub state_name: Option<String>,
    pub district_name: Option<String>,
    pub financial_year: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl RecordQuery {
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            ..Self::default()
        }
    }

    pub fn state(mut self, name: impl Into<String>) -> Self {
        self.state_name = Some(name.into());
        self
    }

    pub fn district(mut self, name: impl Into<String>) -> Self {
        self.district_name = Some(name.into());
        self
    }

    pub fn financial_year(mut self, year: impl Into<String>) -> Self {
        self.financial_year = Some(year.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Stable string form used as a response-cache key component.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.state_name.as_deref().unwrap_or("-"),
            self.district_name.as_deref().unwrap_or("-"),
            self.financial_year.as_deref().unwrap_or("-"),
            self.limit,
            self.offset
        )
    }
}

/// Source of raw upstream records.
///
/// `DataGovClient` is the production implementation; the retrieval and
/// sync services are generic over this so they can run against scripted
/// fixtures.
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, ApiError>;
}

/// Client for the data.gov.in resource API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct DataGovClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DataGovClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn query_params(&self, query: &RecordQuery) -> Vec<(String, String)> {
        let mut params = vec![
            ("api-key".to_string(), self.api_key.clone()),
            ("format".to_string(), "json".to_string()),
            ("limit".to_string(), query.limit.to_string()),
            ("offset".to_string(), query.offset.to_string()),
        ];
        if let Some(ref state) = query.state_name {
            params.push(("filters[state_name]".to_string(), state.clone()));
        }
        if let Some(ref district) = query.district_name {
            params.push(("filters[district_name]".to_string(), district.clone()));
        }
        if let Some(ref year) = query.financial_year {
            params.push(("filters[fin_year]".to_string(), year.clone()));
        }
        params
    }
}

impl RecordSource for DataGovClient {
    async fn fetch_records(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, ApiError> {
        let params = self.query_params(query);

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let parsed: RecordsResponse = response.json().await?;
        let records = parsed.records.unwrap_or_default();
        debug!(count = records.len(), query = %query.cache_key(), "fetched upstream records");
        Ok(records)
    }
}
