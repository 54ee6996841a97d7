//! Client for the data.gov.in MGNREGA open-data resource.
//!
//! The upstream API is a read-only parameterized query interface: an API
//! key, `limit`/`offset` pagination, and equality filters on state name,
//! district name and financial year. Responses are flat key/value records.

pub mod client;
pub mod error;

pub use client::{DataGovClient, RawRecord, RecordQuery, RecordSource, DEFAULT_LIST_LIMIT};
pub use error::{ApiError, RATE_LIMIT_BACKOFF};
