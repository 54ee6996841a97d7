//! Domain models for MGNREGA program data.
//!
//! - `State`, `District`: region identities distilled from upstream rows
//! - `PerformanceRecord`: the canonical monthly district snapshot
//! - `Indicators`: derived scores and rating bands, recomputed per read

pub mod indicators;
pub mod performance;
pub mod region;

pub use indicators::{EmploymentRating, Indicators, PerformanceLevel, QualityRating};
pub use performance::PerformanceRecord;
pub use region::{District, State};
