//! Time-bucketed aggregation over raw instrument points.
//!
//! Buckets are fixed-width windows aligned to the epoch, not to the query's
//! start time: a point's bucket is its timestamp truncated down to the
//! nearest multiple of the bucket width. Buckets with no contributing
//! samples are omitted from the output.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::InstrumentPoint;

/// Fixed set of supported bucket widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    FourHours,
    EightHours,
    OneDay,
}

impl Granularity {
    /// Bucket width in milliseconds.
    pub fn as_millis(&self) -> i64 {
        match self {
            Granularity::OneMinute => 60_000,
            Granularity::FiveMinutes => 300_000,
            Granularity::FifteenMinutes => 900_000,
            Granularity::ThirtyMinutes => 1_800_000,
            Granularity::OneHour => 3_600_000,
            Granularity::FourHours => 14_400_000,
            Granularity::EightHours => 28_800_000,
            Granularity::OneDay => 86_400_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::OneMinute => "1m",
            Granularity::FiveMinutes => "5m",
            Granularity::FifteenMinutes => "15m",
            Granularity::ThirtyMinutes => "30m",
            Granularity::OneHour => "1h",
            Granularity::FourHours => "4h",
            Granularity::EightHours => "8h",
            Granularity::OneDay => "24h",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Granularity::OneMinute),
            "5m" => Some(Granularity::FiveMinutes),
            "15m" => Some(Granularity::FifteenMinutes),
            "30m" => Some(Granularity::ThirtyMinutes),
            "1h" => Some(Granularity::OneHour),
            "4h" => Some(Granularity::FourHours),
            "8h" => Some(Granularity::EightHours),
            "24h" => Some(Granularity::OneDay),
            _ => None,
        }
    }

    /// Truncate a timestamp down to the start of its bucket.
    pub fn bucket_start(&self, timestamp_ms: i64) -> i64 {
        let width = self.as_millis();
        timestamp_ms.div_euclid(width) * width
    }
}

/// One aggregated bucket for a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateBucket {
    /// Epoch-aligned start of the bucket, milliseconds.
    pub bucket_start: i64,
    pub avg_rate: BigDecimal,
    pub avg_reference_value: BigDecimal,
    pub sample_count: u64,
}

/// Group raw points into fixed-width buckets and average each bucket.
///
/// `points` must already be filtered to the query range; ordering of the
/// input does not matter. Output is ascending by `bucket_start`.
pub fn bucket_points(points: &[InstrumentPoint], granularity: Granularity) -> Vec<RateBucket> {
    use std::collections::BTreeMap;

    struct Acc {
        rate_sum: BigDecimal,
        reference_sum: BigDecimal,
        count: u64,
    }

    let mut buckets: BTreeMap<i64, Acc> = BTreeMap::new();

    for point in points {
        let start = granularity.bucket_start(point.timestamp);
        let acc = buckets.entry(start).or_insert_with(|| Acc {
            rate_sum: BigDecimal::from(0),
            reference_sum: BigDecimal::from(0),
            count: 0,
        });
        acc.rate_sum += &point.rate;
        acc.reference_sum += &point.reference_value;
        acc.count += 1;
    }

    buckets
        .into_iter()
        .map(|(bucket_start, acc)| {
            let divisor = BigDecimal::from(acc.count);
            RateBucket {
                bucket_start,
                avg_rate: &acc.rate_sum / &divisor,
                avg_reference_value: &acc.reference_sum / &divisor,
                sample_count: acc.count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn point(timestamp: i64, rate: &str, reference: &str) -> InstrumentPoint {
        InstrumentPoint {
            timestamp,
            rate: BigDecimal::from_str(rate).unwrap(),
            reference_value: BigDecimal::from_str(reference).unwrap(),
        }
    }

    #[test]
    fn test_granularity_tokens() {
        assert_eq!(Granularity::parse("5m"), Some(Granularity::FiveMinutes));
        assert_eq!(Granularity::parse("24h"), Some(Granularity::OneDay));
        assert_eq!(Granularity::parse("2x"), None);
        assert_eq!(Granularity::FiveMinutes.as_str(), "5m");
        assert_eq!(Granularity::OneDay.as_millis(), 86_400_000);
    }

    #[test]
    fn test_single_bucket_mean() {
        let points = vec![
            point(10_000, "10", "1.0"),
            point(20_000, "20", "1.1"),
            point(30_000, "30", "1.2"),
        ];

        let buckets = bucket_points(&points, Granularity::FiveMinutes);

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].bucket_start, 0);
        assert_eq!(buckets[0].avg_rate, BigDecimal::from(20));
        assert_eq!(buckets[0].avg_reference_value, BigDecimal::from_str("1.1").unwrap());
        assert_eq!(buckets[0].sample_count, 3);
    }

    #[test]
    fn test_bucket_alignment_is_epoch_based() {
        // 00:00:30 and 00:04:59 share the first 5m bucket, 00:05:00 opens
        // the next one.
        let points = vec![
            point(30_000, "1", "1"),
            point(299_000, "3", "1"),
            point(300_000, "5", "1"),
        ];

        let buckets = bucket_points(&points, Granularity::FiveMinutes);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].bucket_start, 0);
        assert_eq!(buckets[0].sample_count, 2);
        assert_eq!(buckets[0].avg_rate, BigDecimal::from(2));
        assert_eq!(buckets[1].bucket_start, 300_000);
        assert_eq!(buckets[1].sample_count, 1);
    }

    #[test]
    fn test_output_ascending_and_gaps_omitted() {
        // Points in the first and fourth 1m buckets, nothing in between.
        let points = vec![point(200_000, "4", "1"), point(10_000, "2", "1")];

        let buckets = bucket_points(&points, Granularity::OneMinute);

        assert_eq!(buckets.len(), 2);
        assert!(buckets[0].bucket_start < buckets[1].bucket_start);
        assert_eq!(buckets[0].bucket_start, 0);
        assert_eq!(buckets[1].bucket_start, 180_000);
    }

    #[test]
    fn test_empty_input() {
        let buckets = bucket_points(&[], Granularity::OneHour);
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_decimal_mean_is_exact() {
        // 0.1 + 0.2 averaged over 2 must be exactly 0.15.
        let points = vec![point(0, "0.1", "1"), point(1_000, "0.2", "1")];

        let buckets = bucket_points(&points, Granularity::OneMinute);

        assert_eq!(buckets[0].avg_rate, BigDecimal::from_str("0.15").unwrap());
    }
}
