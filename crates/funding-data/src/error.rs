//! Error types for the funding data pipeline

use thiserror::Error;

/// Errors that can occur while collecting, storing or querying samples
#[derive(Error, Debug)]
pub enum FundingDataError {
    /// Malformed or out-of-range caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// The snapshot fetch failed wholesale
    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(String),

    /// A sample with this collection timestamp already exists
    #[error("Duplicate sample timestamp: {0}")]
    DuplicateTimestamp(i64),

    /// Connectivity or transaction failure in the store
    #[error("Storage error: {0}")]
    Storage(String),

    /// No data matched the request
    #[error("Not found")]
    NotFound,
}

/// Result type for funding data operations
pub type Result<T> = std::result::Result<T, FundingDataError>;
