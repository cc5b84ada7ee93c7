//! PostgreSQL implementation of the `SampleStore` trait.
//!
//! One sample insert is one transaction: the sample row plus a single
//! parameterized multi-row insert of its rate observations. The schema's
//! constraints carry the invariants (unique timestamp, one rate per
//! instrument per sample, cascade delete).

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::error::{FundingDataError, Result};
use crate::store::SampleStore;
use crate::types::{InstrumentPoint, RateObservation, RateStats, ReferenceValueStats, Sample};

const TIMESTAMP_UNIQUE_CONSTRAINT: &str = "samples_timestamp_key";

/// PostgreSQL-backed sample store.
#[derive(Debug, Clone)]
pub struct PostgresSampleStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct SampleRow {
    id: i64,
    timestamp: i64,
    reference_value: BigDecimal,
}

#[derive(FromRow)]
struct RateRow {
    sample_id: i64,
    instrument_id: i32,
    rate: BigDecimal,
}

#[derive(FromRow)]
struct PointRow {
    timestamp: i64,
    rate: BigDecimal,
    reference_value: BigDecimal,
}

#[derive(FromRow)]
struct RateStatsRow {
    instrument_id: i32,
    avg_rate: BigDecimal,
    min_rate: BigDecimal,
    max_rate: BigDecimal,
    count: i64,
}

#[derive(FromRow)]
struct ReferenceStatsRow {
    avg_reference_value: Option<BigDecimal>,
    min_reference_value: Option<BigDecimal>,
    max_reference_value: Option<BigDecimal>,
    count: i64,
}

fn storage_err(context: &str, e: sqlx::Error) -> FundingDataError {
    FundingDataError::Storage(format!("{}: {}", context, e))
}

impl PostgresSampleStore {
    /// Connect a new pool to the given database.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| storage_err("Failed to connect to database", e))?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the idempotent schema setup.
    pub async fn run_migrations(&self) -> Result<()> {
        let migration_sql = include_str!("../../../../migrations/001_create_samples.sql");
        sqlx::raw_sql(migration_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_err("Migration failed", e))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    async fn rates_for_samples(&self, sample_ids: &[i64]) -> Result<HashMap<i64, Vec<RateObservation>>> {
        if sample_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, RateRow>(
            "SELECT sample_id, instrument_id, rate \
             FROM rate_observations \
             WHERE sample_id = ANY($1) \
             ORDER BY instrument_id ASC",
        )
        .bind(sample_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("Failed to fetch rate observations", e))?;

        let mut by_sample: HashMap<i64, Vec<RateObservation>> = HashMap::new();
        for row in rows {
            by_sample.entry(row.sample_id).or_default().push(RateObservation {
                instrument_id: row.instrument_id,
                rate: row.rate,
            });
        }
        Ok(by_sample)
    }
}

#[async_trait]
impl SampleStore for PostgresSampleStore {
    #[instrument(skip(self, reference_value, rates), fields(rates = rates.len()))]
    async fn insert_sample(
        &self,
        timestamp: i64,
        reference_value: &BigDecimal,
        rates: &[(i32, BigDecimal)],
    ) -> Result<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_err("Failed to open transaction", e))?;

        let sample_id: i64 = sqlx::query_scalar(
            "INSERT INTO samples (timestamp, reference_value) VALUES ($1, $2) RETURNING id",
        )
        .bind(timestamp)
        .bind(reference_value)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            let is_timestamp_conflict = e
                .as_database_error()
                .and_then(|db| db.constraint())
                .is_some_and(|c| c == TIMESTAMP_UNIQUE_CONSTRAINT);
            if is_timestamp_conflict {
                FundingDataError::DuplicateTimestamp(timestamp)
            } else {
                storage_err("Failed to insert sample", e)
            }
        })?;

        if !rates.is_empty() {
            // Multi-row insert with numbered placeholders; values are always
            // bound, never interpolated into the statement text.
            let mut query = String::from(
                "INSERT INTO rate_observations (sample_id, instrument_id, rate) VALUES ",
            );
            for i in 0..rates.len() {
                if i > 0 {
                    query.push_str(", ");
                }
                let base = i * 3;
                query.push_str(&format!("(${}, ${}, ${})", base + 1, base + 2, base + 3));
            }

            let mut q = sqlx::query(&query);
            for (instrument_id, rate) in rates {
                q = q.bind(sample_id).bind(instrument_id).bind(rate);
            }

            q.execute(&mut *tx)
                .await
                .map_err(|e| storage_err("Failed to insert rate observations", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| storage_err("Failed to commit sample", e))?;

        debug!(sample_id, timestamp, "Stored sample");
        Ok(sample_id)
    }

    #[instrument(skip(self))]
    async fn latest_sample(&self) -> Result<Option<Sample>> {
        let row = sqlx::query_as::<_, SampleRow>(
            "SELECT id, timestamp, reference_value FROM samples \
             ORDER BY timestamp DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_err("Failed to fetch latest sample", e))?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let mut rates = self.rates_for_samples(&[row.id]).await?;
        Ok(Some(Sample {
            id: row.id,
            timestamp: row.timestamp,
            reference_value: row.reference_value,
            rates: rates.remove(&row.id).unwrap_or_default(),
        }))
    }

    #[instrument(skip(self))]
    async fn range(&self, start: i64, end: i64) -> Result<Vec<Sample>> {
        let rows = sqlx::query_as::<_, SampleRow>(
            "SELECT id, timestamp, reference_value FROM samples \
             WHERE timestamp BETWEEN $1 AND $2 \
             ORDER BY timestamp DESC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("Failed to fetch sample range", e))?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut rates = self.rates_for_samples(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| Sample {
                rates: rates.remove(&row.id).unwrap_or_default(),
                id: row.id,
                timestamp: row.timestamp,
                reference_value: row.reference_value,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn instrument_range(
        &self,
        instrument_id: i32,
        start: i64,
        end: i64,
    ) -> Result<Vec<InstrumentPoint>> {
        let rows = sqlx::query_as::<_, PointRow>(
            "SELECT s.timestamp, r.rate, s.reference_value \
             FROM samples s \
             JOIN rate_observations r ON r.sample_id = s.id \
             WHERE s.timestamp BETWEEN $1 AND $2 AND r.instrument_id = $3 \
             ORDER BY s.timestamp ASC",
        )
        .bind(start)
        .bind(end)
        .bind(instrument_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("Failed to fetch instrument history", e))?;

        Ok(rows
            .into_iter()
            .map(|row| InstrumentPoint {
                timestamp: row.timestamp,
                rate: row.rate,
                reference_value: row.reference_value,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn reference_value_stats(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Option<ReferenceValueStats>> {
        let row = sqlx::query_as::<_, ReferenceStatsRow>(
            "SELECT \
                AVG(reference_value) AS avg_reference_value, \
                MIN(reference_value) AS min_reference_value, \
                MAX(reference_value) AS max_reference_value, \
                COUNT(*) AS count \
             FROM samples \
             WHERE timestamp BETWEEN $1 AND $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_err("Failed to fetch reference value stats", e))?;

        match (row.avg_reference_value, row.min_reference_value, row.max_reference_value) {
            (Some(avg), Some(min), Some(max)) => Ok(Some(ReferenceValueStats {
                avg_reference_value: avg,
                min_reference_value: min,
                max_reference_value: max,
                count: row.count,
            })),
            _ => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn rate_stats(&self, start: i64, end: i64) -> Result<Vec<RateStats>> {
        let rows = sqlx::query_as::<_, RateStatsRow>(
            "SELECT \
                r.instrument_id, \
                AVG(r.rate) AS avg_rate, \
                MIN(r.rate) AS min_rate, \
                MAX(r.rate) AS max_rate, \
                COUNT(*) AS count \
             FROM rate_observations r \
             JOIN samples s ON s.id = r.sample_id \
             WHERE s.timestamp BETWEEN $1 AND $2 \
             GROUP BY r.instrument_id \
             ORDER BY r.instrument_id ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("Failed to fetch rate stats", e))?;

        Ok(rows
            .into_iter()
            .map(|row| RateStats {
                instrument_id: row.instrument_id,
                avg_rate: row.avg_rate,
                min_rate: row.min_rate,
                max_rate: row.max_rate,
                count: row.count,
            })
            .collect())
    }
}
