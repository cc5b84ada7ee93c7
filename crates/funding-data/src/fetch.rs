//! Snapshot fetcher boundary.
//!
//! The collector consumes the `SnapshotFetcher` trait; the upstream data
//! source is external to this system. A whole-call failure surfaces as
//! `UpstreamFetch`; an individual instrument that could not be read comes
//! back with `rate: None` and is resolved by the collector's policy.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::Deserialize;

use crate::error::{FundingDataError, Result};

/// One instrument's result within a snapshot. `rate` is `None` when the
/// upstream call for this instrument failed.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentRate {
    pub instrument_id: i32,
    pub rate: Option<BigDecimal>,
}

/// A full snapshot across all requested instruments.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Collection time in milliseconds since epoch. This is the sample's
    /// identity: two snapshots with the same timestamp collide in the store.
    pub timestamp: i64,
    pub reference_value: BigDecimal,
    pub rates: Vec<InstrumentRate>,
}

/// Source of raw market snapshots.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch the reference value plus a rate per requested instrument.
    async fn fetch(&self, instrument_ids: &[i32]) -> Result<Snapshot>;
}

#[derive(Debug, Deserialize)]
struct SnapshotBody {
    reference_value: BigDecimal,
    rates: Vec<InstrumentRate>,
}

/// Fetcher that polls an HTTP endpoint returning the snapshot as JSON.
pub struct HttpSnapshotFetcher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSnapshotFetcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch(&self, instrument_ids: &[i32]) -> Result<Snapshot> {
        let ids = instrument_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("ids", ids.as_str())])
            .send()
            .await
            .map_err(|e| FundingDataError::UpstreamFetch(format!("request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| FundingDataError::UpstreamFetch(format!("bad status: {}", e)))?;

        let body: SnapshotBody = response
            .json()
            .await
            .map_err(|e| FundingDataError::UpstreamFetch(format!("invalid body: {}", e)))?;

        Ok(Snapshot {
            timestamp: Utc::now().timestamp_millis(),
            reference_value: body.reference_value,
            rates: body.rates,
        })
    }
}
