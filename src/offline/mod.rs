//! Offline Module
//!
//! Schema-tagged critical data and the stale-while-revalidate read path.

mod data;
mod manager;
mod options;
mod outcome;

pub use data::{CriticalData, CriticalRecord, DataType};
pub use manager::{OfflineDataManager, OfflineStats};
pub use options::{CacheOptions, DEFAULT_MAX_AGE, DEFAULT_TTL};
pub use outcome::{CacheSource, DataRevalidated, Fetched, Revalidation};
