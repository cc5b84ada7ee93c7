//! In-memory sample store.
//!
//! Keeps the whole series in a `BTreeMap` keyed by timestamp and enforces
//! the same uniqueness and atomicity rules as the Postgres store. Data is
//! lost on restart; intended for tests and local development.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use tokio::sync::RwLock;

use crate::error::{FundingDataError, Result};
use crate::store::SampleStore;
use crate::types::{InstrumentPoint, RateObservation, RateStats, ReferenceValueStats, Sample};

struct StoredSample {
    id: i64,
    reference_value: BigDecimal,
    /// Keyed by instrument id, so iteration is already ascending.
    rates: BTreeMap<i32, BigDecimal>,
}

#[derive(Default)]
struct Inner {
    /// Keyed by timestamp: uniqueness falls out of the map.
    samples: BTreeMap<i64, StoredSample>,
    next_id: i64,
}

/// Non-persistent `SampleStore` implementation.
pub struct InMemorySampleStore {
    inner: RwLock<Inner>,
}

impl InMemorySampleStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for InMemorySampleStore {
    fn default() -> Self {
        Self::new()
    }
}

fn to_sample(timestamp: i64, stored: &StoredSample) -> Sample {
    Sample {
        id: stored.id,
        timestamp,
        reference_value: stored.reference_value.clone(),
        rates: stored
            .rates
            .iter()
            .map(|(instrument_id, rate)| RateObservation {
                instrument_id: *instrument_id,
                rate: rate.clone(),
            })
            .collect(),
    }
}

#[async_trait]
impl SampleStore for InMemorySampleStore {
    async fn insert_sample(
        &self,
        timestamp: i64,
        reference_value: &BigDecimal,
        rates: &[(i32, BigDecimal)],
    ) -> Result<i64> {
        let mut inner = self.inner.write().await;

        if inner.samples.contains_key(&timestamp) {
            return Err(FundingDataError::DuplicateTimestamp(timestamp));
        }

        // Validate every row before touching the map, so a bad rate list
        // leaves no sample behind.
        let mut rate_map = BTreeMap::new();
        for (instrument_id, rate) in rates {
            if rate_map.insert(*instrument_id, rate.clone()).is_some() {
                return Err(FundingDataError::Storage(format!(
                    "duplicate rate for instrument {} in sample {}",
                    instrument_id, timestamp
                )));
            }
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.samples.insert(
            timestamp,
            StoredSample {
                id,
                reference_value: reference_value.clone(),
                rates: rate_map,
            },
        );

        Ok(id)
    }

    async fn latest_sample(&self) -> Result<Option<Sample>> {
        let inner = self.inner.read().await;
        Ok(inner
            .samples
            .iter()
            .next_back()
            .map(|(ts, stored)| to_sample(*ts, stored)))
    }

    async fn range(&self, start: i64, end: i64) -> Result<Vec<Sample>> {
        let inner = self.inner.read().await;
        Ok(inner
            .samples
            .range(start..=end)
            .rev()
            .map(|(ts, stored)| to_sample(*ts, stored))
            .collect())
    }

    async fn instrument_range(
        &self,
        instrument_id: i32,
        start: i64,
        end: i64,
    ) -> Result<Vec<InstrumentPoint>> {
        let inner = self.inner.read().await;
        Ok(inner
            .samples
            .range(start..=end)
            .filter_map(|(ts, stored)| {
                stored.rates.get(&instrument_id).map(|rate| InstrumentPoint {
                    timestamp: *ts,
                    rate: rate.clone(),
                    reference_value: stored.reference_value.clone(),
                })
            })
            .collect())
    }

    async fn reference_value_stats(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Option<ReferenceValueStats>> {
        let inner = self.inner.read().await;
        let mut iter = inner.samples.range(start..=end).map(|(_, s)| &s.reference_value);

        let first = match iter.next() {
            Some(v) => v,
            None => return Ok(None),
        };

        let mut sum = first.clone();
        let mut min = first.clone();
        let mut max = first.clone();
        let mut count: i64 = 1;

        for value in iter {
            sum += value;
            if *value < min {
                min = value.clone();
            }
            if *value > max {
                max = value.clone();
            }
            count += 1;
        }

        Ok(Some(ReferenceValueStats {
            avg_reference_value: &sum / &BigDecimal::from(count),
            min_reference_value: min,
            max_reference_value: max,
            count,
        }))
    }

    async fn rate_stats(&self, start: i64, end: i64) -> Result<Vec<RateStats>> {
        struct Acc {
            sum: BigDecimal,
            min: BigDecimal,
            max: BigDecimal,
            count: i64,
        }

        let inner = self.inner.read().await;
        let mut per_instrument: BTreeMap<i32, Acc> = BTreeMap::new();

        for (_, stored) in inner.samples.range(start..=end) {
            for (instrument_id, rate) in &stored.rates {
                match per_instrument.get_mut(instrument_id) {
                    Some(acc) => {
                        acc.sum += rate;
                        if *rate < acc.min {
                            acc.min = rate.clone();
                        }
                        if *rate > acc.max {
                            acc.max = rate.clone();
                        }
                        acc.count += 1;
                    }
                    None => {
                        per_instrument.insert(
                            *instrument_id,
                            Acc {
                                sum: rate.clone(),
                                min: rate.clone(),
                                max: rate.clone(),
                                count: 1,
                            },
                        );
                    }
                }
            }
        }

        Ok(per_instrument
            .into_iter()
            .map(|(instrument_id, acc)| RateStats {
                instrument_id,
                avg_rate: &acc.sum / &BigDecimal::from(acc.count),
                min_rate: acc.min,
                max_rate: acc.max,
                count: acc.count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    async fn seed(store: &InMemorySampleStore, timestamp: i64, reference: &str, rates: &[(i32, &str)]) {
        let rates: Vec<(i32, BigDecimal)> =
            rates.iter().map(|(id, r)| (*id, dec(r))).collect();
        store
            .insert_sample(timestamp, &dec(reference), &rates)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_timestamp_rejected() {
        let store = InMemorySampleStore::new();
        seed(&store, 1_000, "1.01", &[(1, "0.5")]).await;

        let err = store
            .insert_sample(1_000, &dec("1.02"), &[(1, dec("0.6")), (2, dec("0.7"))])
            .await
            .unwrap_err();
        assert_matches!(err, FundingDataError::DuplicateTimestamp(1_000));

        // The original sample is untouched.
        let latest = store.latest_sample().await.unwrap().unwrap();
        assert_eq!(latest.rates.len(), 1);
        assert_eq!(latest.reference_value, dec("1.01"));
    }

    #[tokio::test]
    async fn test_duplicate_instrument_leaves_no_sample() {
        let store = InMemorySampleStore::new();

        let err = store
            .insert_sample(2_000, &dec("1.0"), &[(7, dec("0.1")), (7, dec("0.2"))])
            .await
            .unwrap_err();
        assert_matches!(err, FundingDataError::Storage(_));

        assert!(store.latest_sample().await.unwrap().is_none());
        assert!(store.range(0, 10_000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_range_descending_rates_ascending() {
        let store = InMemorySampleStore::new();
        seed(&store, 1_000, "1.0", &[(2, "0.2"), (1, "0.1")]).await;
        seed(&store, 2_000, "1.1", &[(1, "0.3")]).await;
        seed(&store, 3_000, "1.2", &[(1, "0.4")]).await;

        let samples = store.range(1_000, 3_000).await.unwrap();

        let timestamps: Vec<i64> = samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![3_000, 2_000, 1_000]);

        let ids: Vec<i32> = samples[2].rates.iter().map(|r| r.instrument_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_range_bounds_inclusive() {
        let store = InMemorySampleStore::new();
        seed(&store, 1_000, "1.0", &[(1, "0.1")]).await;
        seed(&store, 2_000, "1.0", &[(1, "0.2")]).await;
        seed(&store, 3_000, "1.0", &[(1, "0.3")]).await;

        let samples = store.range(1_000, 3_000).await.unwrap();
        assert_eq!(samples.len(), 3);

        let samples = store.range(1_001, 2_999).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp, 2_000);
    }

    #[tokio::test]
    async fn test_instrument_range_ascending_and_omits_absent() {
        let store = InMemorySampleStore::new();
        seed(&store, 1_000, "1.0", &[(1, "0.1"), (2, "0.9")]).await;
        // Instrument 1 missing from this cycle.
        seed(&store, 2_000, "1.1", &[(2, "0.8")]).await;
        seed(&store, 3_000, "1.2", &[(1, "0.3")]).await;

        let points = store.instrument_range(1, 0, 10_000).await.unwrap();

        let timestamps: Vec<i64> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![1_000, 3_000]);
        assert_eq!(points[1].reference_value, dec("1.2"));
    }

    #[tokio::test]
    async fn test_reference_value_stats() {
        let store = InMemorySampleStore::new();
        seed(&store, 1_000, "1.0", &[(1, "0.1")]).await;
        seed(&store, 2_000, "2.0", &[(1, "0.2")]).await;
        seed(&store, 3_000, "3.0", &[(1, "0.3")]).await;

        let stats = store.reference_value_stats(0, 10_000).await.unwrap().unwrap();
        assert_eq!(stats.avg_reference_value, dec("2"));
        assert_eq!(stats.min_reference_value, dec("1.0"));
        assert_eq!(stats.max_reference_value, dec("3.0"));
        assert_eq!(stats.count, 3);

        assert!(store.reference_value_stats(50_000, 60_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_stats_per_instrument() {
        let store = InMemorySampleStore::new();
        seed(&store, 1_000, "1.0", &[(1, "0.1"), (2, "-0.5")]).await;
        seed(&store, 2_000, "1.0", &[(1, "0.3"), (2, "-0.1")]).await;

        let stats = store.rate_stats(0, 10_000).await.unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].instrument_id, 1);
        assert_eq!(stats[0].avg_rate, dec("0.2"));
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[1].instrument_id, 2);
        assert_eq!(stats[1].min_rate, dec("-0.5"));
        assert_eq!(stats[1].max_rate, dec("-0.1"));
    }

    #[tokio::test]
    async fn test_latest_sample() {
        let store = InMemorySampleStore::new();
        assert!(store.latest_sample().await.unwrap().is_none());

        seed(&store, 1_000, "1.0", &[(1, "0.1")]).await;
        seed(&store, 5_000, "1.5", &[(1, "0.2")]).await;

        let latest = store.latest_sample().await.unwrap().unwrap();
        assert_eq!(latest.timestamp, 5_000);
        assert_eq!(latest.reference_value, dec("1.5"));
    }
}
