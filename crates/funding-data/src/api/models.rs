//! API models for the funding data HTTP endpoints.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::RateBucket;
use crate::types::{InstrumentPoint, RateStats, ReferenceValueStats, Sample};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// Error payload shared by all endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// One rate observation in a sample response
#[derive(Debug, Serialize, Deserialize)]
pub struct RateEntry {
    pub instrument_id: i32,
    pub rate: BigDecimal,
}

/// Full sample in API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct SampleResponse {
    pub id: i64,
    pub timestamp: i64,
    pub reference_value: BigDecimal,
    pub rates: Vec<RateEntry>,
}

impl From<Sample> for SampleResponse {
    fn from(sample: Sample) -> Self {
        Self {
            id: sample.id,
            timestamp: sample.timestamp,
            reference_value: sample.reference_value,
            rates: sample
                .rates
                .into_iter()
                .map(|r| RateEntry {
                    instrument_id: r.instrument_id,
                    rate: r.rate,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SampleEnvelope {
    pub success: bool,
    pub sample: SampleResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SamplesEnvelope {
    pub success: bool,
    pub count: usize,
    pub samples: Vec<SampleResponse>,
}

/// Rate observation enriched with its instrument symbol
#[derive(Debug, Serialize, Deserialize)]
pub struct SymbolRateEntry {
    pub instrument_id: i32,
    pub symbol: String,
    pub rate: BigDecimal,
}

/// Latest sample with symbols resolved and registry coverage attached
#[derive(Debug, Serialize, Deserialize)]
pub struct LatestFullResponse {
    pub success: bool,
    pub timestamp: i64,
    pub reference_value: BigDecimal,
    pub instrument_count: usize,
    pub rates: Vec<SymbolRateEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateStatsResponse {
    pub instrument_id: i32,
    pub symbol: Option<String>,
    pub avg_rate: BigDecimal,
    pub min_rate: BigDecimal,
    pub max_rate: BigDecimal,
    pub count: i64,
}

impl RateStatsResponse {
    pub fn from_stats(stats: RateStats, symbol: Option<&str>) -> Self {
        Self {
            instrument_id: stats.instrument_id,
            symbol: symbol.map(str::to_string),
            avg_rate: stats.avg_rate,
            min_rate: stats.min_rate,
            max_rate: stats.max_rate,
            count: stats.count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateStatsEnvelope {
    pub success: bool,
    pub count: usize,
    pub stats: Vec<RateStatsResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferenceStatsEnvelope {
    pub success: bool,
    pub avg_reference_value: BigDecimal,
    pub min_reference_value: BigDecimal,
    pub max_reference_value: BigDecimal,
    pub count: i64,
}

impl From<ReferenceValueStats> for ReferenceStatsEnvelope {
    fn from(stats: ReferenceValueStats) -> Self {
        Self {
            success: true,
            avg_reference_value: stats.avg_reference_value,
            min_reference_value: stats.min_reference_value,
            max_reference_value: stats.max_reference_value,
            count: stats.count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointResponse {
    pub timestamp: i64,
    pub rate: BigDecimal,
    pub reference_value: BigDecimal,
}

impl From<InstrumentPoint> for PointResponse {
    fn from(point: InstrumentPoint) -> Self {
        Self {
            timestamp: point.timestamp,
            rate: point.rate,
            reference_value: point.reference_value,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BucketResponse {
    pub bucket_start: i64,
    pub avg_rate: BigDecimal,
    pub avg_reference_value: BigDecimal,
    pub sample_count: u64,
}

impl From<RateBucket> for BucketResponse {
    fn from(bucket: RateBucket) -> Self {
        Self {
            bucket_start: bucket.bucket_start,
            avg_rate: bucket.avg_rate,
            avg_reference_value: bucket.avg_reference_value,
            sample_count: bucket.sample_count,
        }
    }
}

/// Instrument history. Raw points and bucketed aggregates are mutually
/// exclusive; `granularity` is set only for the bucketed form.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEnvelope {
    pub success: bool,
    pub instrument_id: i32,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<PointResponse>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<BucketResponse>>,
}

/// Time range query parameters, kept as strings so malformed values get a
/// structured validation error instead of a bare deserializer rejection.
#[derive(Debug, Deserialize, Default)]
pub struct RangeParams {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct HistoryParams {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub granularity: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DurationParams {
    #[serde(default)]
    pub granularity: Option<String>,
}
