//! Domain types for the sample time series.
//!
//! All monetary values are decimals (`BigDecimal`), never binary floats,
//! so that repeated averaging does not accumulate representation error.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// One instrument's rate within a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    pub instrument_id: i32,
    pub rate: BigDecimal,
}

/// One collection cycle's committed result: the reference value plus the
/// rate observations that were actually measured in that cycle.
///
/// An instrument that failed to fetch in a cycle is simply absent from
/// `rates` - absence is the signal, not a zero value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: i64,
    /// Milliseconds since epoch, assigned at collection time upstream.
    /// Globally unique across all samples.
    pub timestamp: i64,
    pub reference_value: BigDecimal,
    /// Ordered ascending by `instrument_id`.
    pub rates: Vec<RateObservation>,
}

/// One instrument's view of a single sample, as returned by history queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentPoint {
    pub timestamp: i64,
    pub rate: BigDecimal,
    pub reference_value: BigDecimal,
}

/// Per-instrument rate statistics over a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub instrument_id: i32,
    pub avg_rate: BigDecimal,
    pub min_rate: BigDecimal,
    pub max_rate: BigDecimal,
    pub count: i64,
}

/// Reference value statistics over a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceValueStats {
    pub avg_reference_value: BigDecimal,
    pub min_reference_value: BigDecimal,
    pub max_reference_value: BigDecimal,
    pub count: i64,
}
