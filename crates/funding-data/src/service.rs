//! Query facade: validates read requests and dispatches them to the store
//! or the aggregator. Transport-independent; the HTTP binding lives in
//! `api`.

use std::sync::Arc;

use chrono::Utc;

use crate::aggregate::{bucket_points, Granularity, RateBucket};
use crate::error::{FundingDataError, Result};
use crate::registry::InstrumentRegistry;
use crate::store::SampleStore;
use crate::types::{InstrumentPoint, RateStats, ReferenceValueStats, Sample};

const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Result of an instrument history query. Raw rows when no granularity was
/// requested; bucketed aggregates otherwise. The two are distinct paths,
/// not a trivial-width bucketing.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentHistory {
    Raw(Vec<InstrumentPoint>),
    Bucketed(Vec<RateBucket>),
}

/// Validated read surface over the sample store.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn SampleStore>,
    registry: Arc<InstrumentRegistry>,
}

impl QueryService {
    pub fn new(store: Arc<dyn SampleStore>, registry: Arc<InstrumentRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    /// The most recent sample.
    pub async fn latest(&self) -> Result<Sample> {
        self.store
            .latest_sample()
            .await?
            .ok_or(FundingDataError::NotFound)
    }

    /// All samples in the inclusive range, descending by timestamp.
    pub async fn range(&self, start: i64, end: i64) -> Result<Vec<Sample>> {
        validate_range(start, end)?;
        self.store.range(start, end).await
    }

    /// Per-instrument rate statistics over the range.
    pub async fn rate_stats(&self, start: i64, end: i64) -> Result<Vec<RateStats>> {
        validate_range(start, end)?;
        self.store.rate_stats(start, end).await
    }

    /// Reference value statistics over the range.
    pub async fn reference_value_stats(&self, start: i64, end: i64) -> Result<ReferenceValueStats> {
        validate_range(start, end)?;
        self.store
            .reference_value_stats(start, end)
            .await?
            .ok_or(FundingDataError::NotFound)
    }

    /// One instrument's history, raw or bucketed.
    pub async fn instrument_history(
        &self,
        instrument_id: i32,
        start: i64,
        end: i64,
        granularity: Option<Granularity>,
    ) -> Result<InstrumentHistory> {
        self.validate_instrument(instrument_id)?;
        validate_range(start, end)?;

        let points = self.store.instrument_range(instrument_id, start, end).await?;

        Ok(match granularity {
            Some(granularity) => InstrumentHistory::Bucketed(bucket_points(&points, granularity)),
            None => InstrumentHistory::Raw(points),
        })
    }

    /// History over a trailing window expressed as a duration token
    /// (`"30d"`, `"12h"`, `"4w"`, `"1m"` for an approximate 30-day month).
    pub async fn instrument_history_by_duration(
        &self,
        instrument_id: i32,
        duration: &str,
        granularity: Option<Granularity>,
    ) -> Result<InstrumentHistory> {
        let window = parse_duration_token(duration)?;
        let end = Utc::now().timestamp_millis();
        let start = end - window;
        self.instrument_history(instrument_id, start, end, granularity).await
    }

    fn validate_instrument(&self, instrument_id: i32) -> Result<()> {
        if !self.registry.contains(instrument_id) {
            return Err(FundingDataError::Validation(format!(
                "unknown instrument id {} (expected 1..={})",
                instrument_id,
                self.registry.len()
            )));
        }
        Ok(())
    }
}

fn validate_range(start: i64, end: i64) -> Result<()> {
    if start > end {
        return Err(FundingDataError::Validation(format!(
            "start_time {} is after end_time {}",
            start, end
        )));
    }
    Ok(())
}

/// Parse a `<integer><unit>` duration token into milliseconds.
///
/// Units: d = days, h = hours, w = weeks, m = approximate 30-day months.
pub fn parse_duration_token(token: &str) -> Result<i64> {
    let invalid = || {
        FundingDataError::Validation(format!(
            "invalid duration '{}' (expected <integer><unit>, unit one of d/h/w/m)",
            token
        ))
    };

    let unit_at = token
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (magnitude, unit) = token.split_at(unit_at);

    let magnitude: i64 = magnitude.parse().map_err(|_| invalid())?;
    if magnitude < 1 {
        return Err(invalid());
    }

    let unit_millis = match unit {
        "h" => MILLIS_PER_HOUR,
        "d" => MILLIS_PER_DAY,
        "w" => 7 * MILLIS_PER_DAY,
        "m" => 30 * MILLIS_PER_DAY,
        _ => return Err(invalid()),
    };

    magnitude
        .checked_mul(unit_millis)
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySampleStore;
    use assert_matches::assert_matches;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn registry() -> Arc<InstrumentRegistry> {
        Arc::new(
            InstrumentRegistry::new(vec![
                (1, "BTC/USD".to_string()),
                (2, "ETH/USD".to_string()),
            ])
            .unwrap(),
        )
    }

    fn service(store: Arc<InMemorySampleStore>) -> QueryService {
        QueryService::new(store, registry())
    }

    #[test]
    fn test_duration_token_days() {
        assert_eq!(parse_duration_token("30d").unwrap(), 30 * MILLIS_PER_DAY);
    }

    #[test]
    fn test_duration_token_weeks() {
        assert_eq!(parse_duration_token("4w").unwrap(), 4 * 7 * MILLIS_PER_DAY);
    }

    #[test]
    fn test_duration_token_hours_and_months() {
        assert_eq!(parse_duration_token("12h").unwrap(), 12 * MILLIS_PER_HOUR);
        assert_eq!(parse_duration_token("2m").unwrap(), 60 * MILLIS_PER_DAY);
    }

    #[test]
    fn test_duration_token_rejects_bad_input() {
        assert_matches!(parse_duration_token("2x"), Err(FundingDataError::Validation(_)));
        assert_matches!(parse_duration_token("d"), Err(FundingDataError::Validation(_)));
        assert_matches!(parse_duration_token("30"), Err(FundingDataError::Validation(_)));
        assert_matches!(parse_duration_token("3.5d"), Err(FundingDataError::Validation(_)));
        assert_matches!(parse_duration_token("0d"), Err(FundingDataError::Validation(_)));
        assert_matches!(parse_duration_token(""), Err(FundingDataError::Validation(_)));
    }

    #[tokio::test]
    async fn test_latest_not_found_when_empty() {
        let svc = service(Arc::new(InMemorySampleStore::new()));
        assert_matches!(svc.latest().await, Err(FundingDataError::NotFound));
    }

    #[tokio::test]
    async fn test_range_rejects_inverted_bounds() {
        let svc = service(Arc::new(InMemorySampleStore::new()));
        assert_matches!(
            svc.range(2_000, 1_000).await,
            Err(FundingDataError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_history_rejects_unknown_instrument() {
        let svc = service(Arc::new(InMemorySampleStore::new()));
        assert_matches!(
            svc.instrument_history(99, 0, 1_000, None).await,
            Err(FundingDataError::Validation(_))
        );
        assert_matches!(
            svc.instrument_history(0, 0, 1_000, None).await,
            Err(FundingDataError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_history_raw_vs_bucketed() {
        let store = Arc::new(InMemorySampleStore::new());
        for (ts, rate) in [(10_000, "10"), (20_000, "20"), (30_000, "30")] {
            store
                .insert_sample(ts, &dec("1.0"), &[(1, dec(rate))])
                .await
                .unwrap();
        }
        let svc = service(store);

        let raw = svc.instrument_history(1, 0, 60_000, None).await.unwrap();
        assert_matches!(raw, InstrumentHistory::Raw(points) => {
            assert_eq!(points.len(), 3);
            assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        });

        let bucketed = svc
            .instrument_history(1, 0, 60_000, Some(Granularity::FiveMinutes))
            .await
            .unwrap();
        assert_matches!(bucketed, InstrumentHistory::Bucketed(buckets) => {
            assert_eq!(buckets.len(), 1);
            assert_eq!(buckets[0].avg_rate, dec("20"));
            assert_eq!(buckets[0].sample_count, 3);
        });
    }

    #[tokio::test]
    async fn test_history_by_duration_covers_recent_points() {
        let store = Arc::new(InMemorySampleStore::new());
        let now = Utc::now().timestamp_millis();
        store
            .insert_sample(now - 1_000, &dec("1.0"), &[(1, dec("0.5"))])
            .await
            .unwrap();
        // Outside a 1h window.
        store
            .insert_sample(now - 2 * MILLIS_PER_HOUR, &dec("1.0"), &[(1, dec("0.9"))])
            .await
            .unwrap();
        let svc = service(store);

        let history = svc
            .instrument_history_by_duration(1, "1h", None)
            .await
            .unwrap();
        assert_matches!(history, InstrumentHistory::Raw(points) => {
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].rate, dec("0.5"));
        });
    }

    #[tokio::test]
    async fn test_reference_stats_not_found_on_empty_range() {
        let svc = service(Arc::new(InMemorySampleStore::new()));
        assert_matches!(
            svc.reference_value_stats(0, 1_000).await,
            Err(FundingDataError::NotFound)
        );
    }
}
