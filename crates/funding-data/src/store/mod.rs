//! Sample persistence.
//!
//! `SampleStore` is the seam between the collector / query service and the
//! backing storage. `PostgresSampleStore` is the production implementation;
//! `InMemorySampleStore` enforces the same invariants for tests and local
//! development.

mod memory;
mod postgres;

pub use memory::InMemorySampleStore;
pub use postgres::PostgresSampleStore;

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::error::Result;
use crate::types::{InstrumentPoint, RateStats, ReferenceValueStats, Sample};

/// Persistent store for samples and their rate observations.
///
/// All range bounds are inclusive. Bound ordering (`start <= end`) and
/// instrument id validity are the caller's responsibility; the store only
/// enforces the structural invariants (timestamp uniqueness, one rate per
/// instrument per sample, no orphaned rates).
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Insert one sample and all of its rate observations atomically.
    ///
    /// Returns the new sample id. A sample with the same timestamp already
    /// present yields `DuplicateTimestamp`; any other failure rolls the
    /// whole insert back - a partially written sample is never visible.
    async fn insert_sample(
        &self,
        timestamp: i64,
        reference_value: &BigDecimal,
        rates: &[(i32, BigDecimal)],
    ) -> Result<i64>;

    /// The most recent sample, rates ascending by instrument id.
    async fn latest_sample(&self) -> Result<Option<Sample>>;

    /// Samples with `start <= timestamp <= end`, descending by timestamp.
    async fn range(&self, start: i64, end: i64) -> Result<Vec<Sample>>;

    /// One instrument's points in range, ascending by timestamp.
    async fn instrument_range(
        &self,
        instrument_id: i32,
        start: i64,
        end: i64,
    ) -> Result<Vec<InstrumentPoint>>;

    /// Reference value statistics over the range; `None` when no samples.
    async fn reference_value_stats(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Option<ReferenceValueStats>>;

    /// Per-instrument rate statistics for every instrument observed in
    /// range, ascending by instrument id.
    async fn rate_stats(&self, start: i64, end: i64) -> Result<Vec<RateStats>>;
}
