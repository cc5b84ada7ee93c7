//! Periodic collection cycle: fetch a snapshot across all registered
//! instruments and commit it as one atomic sample.
//!
//! One cycle runs at a time. Timer ticks that fire while a cycle is still
//! in flight are dropped, not queued, and every cycle runs under a bounded
//! deadline so a hung upstream costs at most one missed period.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use config::{CollectorConfig, MissingRatePolicy};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use crate::error::{FundingDataError, Result};
use crate::fetch::SnapshotFetcher;
use crate::registry::InstrumentRegistry;
use crate::store::SampleStore;

/// Background worker driving the fetch -> store cycle on a fixed period.
pub struct CollectorWorker {
    store: Arc<dyn SampleStore>,
    fetcher: Arc<dyn SnapshotFetcher>,
    registry: Arc<InstrumentRegistry>,
    config: CollectorConfig,
    /// Single-flight guard: false = Idle, true = Collecting.
    collecting: AtomicBool,
}

impl CollectorWorker {
    pub fn new(
        store: Arc<dyn SampleStore>,
        fetcher: Arc<dyn SnapshotFetcher>,
        registry: Arc<InstrumentRegistry>,
        config: CollectorConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            registry,
            config,
            collecting: AtomicBool::new(false),
        }
    }

    /// Run the worker until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_seconds = self.config.interval_seconds,
            run_on_startup = self.config.run_on_startup,
            policy = ?self.config.missing_rate_policy,
            instruments = self.registry.len(),
            "Starting collector worker"
        );

        if self.config.run_on_startup {
            self.collect_once().await;
        }

        let mut timer = tokio::time::interval(Duration::from_secs(self.config.interval_seconds));
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await; // first tick completes immediately

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.collect_once().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Collector worker shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// Run one cycle if none is in flight. Failures are reported, never
    /// propagated: one bad cycle must not stop the worker.
    pub async fn collect_once(&self) {
        if self
            .collecting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Previous collection cycle still running, dropping tick");
            return;
        }

        let deadline = Duration::from_secs(self.config.cycle_timeout_seconds);
        let outcome = tokio::time::timeout(deadline, self.run_cycle()).await;
        self.collecting.store(false, Ordering::Release);

        match outcome {
            Err(_) => error!(
                timeout_seconds = self.config.cycle_timeout_seconds,
                "Collection cycle exceeded its deadline"
            ),
            Ok(Err(FundingDataError::DuplicateTimestamp(timestamp))) => {
                // Expected when cycles overlap a timestamp; skip, no retry.
                info!(timestamp, "Sample for this timestamp already stored, skipping");
            }
            Ok(Err(e)) => error!("Collection cycle failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    /// One fetch -> resolve -> store pass.
    #[instrument(skip(self))]
    async fn run_cycle(&self) -> Result<()> {
        let ids = self.registry.ids();
        let snapshot = self.fetcher.fetch(&ids).await?;

        let mut fetched: HashMap<i32, Option<BigDecimal>> = snapshot
            .rates
            .into_iter()
            .map(|r| (r.instrument_id, r.rate))
            .collect();

        let mut rates: Vec<(i32, BigDecimal)> = Vec::with_capacity(ids.len());
        let mut failed: Vec<i32> = Vec::new();

        for id in &ids {
            match fetched.remove(id).flatten() {
                Some(rate) => rates.push((*id, rate)),
                None => {
                    failed.push(*id);
                    if self.config.missing_rate_policy == MissingRatePolicy::RecordZero {
                        // Legacy behavior: indistinguishable from a measured
                        // zero. The default policy omits the row instead.
                        rates.push((*id, BigDecimal::from(0)));
                    }
                }
            }
        }

        let sample_id = self
            .store
            .insert_sample(snapshot.timestamp, &snapshot.reference_value, &rates)
            .await?;

        if !failed.is_empty() {
            warn!(
                sample_id,
                timestamp = snapshot.timestamp,
                missing = ?failed,
                policy = ?self.config.missing_rate_policy,
                "Instruments missing from this cycle"
            );
        }

        info!(
            sample_id,
            timestamp = snapshot.timestamp,
            rates = rates.len(),
            "Collected sample"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{InstrumentRate, Snapshot};
    use crate::store::InMemorySampleStore;
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn registry() -> Arc<InstrumentRegistry> {
        Arc::new(
            InstrumentRegistry::new(vec![
                (1, "BTC/USD".to_string()),
                (2, "ETH/USD".to_string()),
                (3, "SOL/USD".to_string()),
            ])
            .unwrap(),
        )
    }

    fn collector_config(policy: MissingRatePolicy) -> CollectorConfig {
        CollectorConfig {
            interval_seconds: 60,
            run_on_startup: true,
            cycle_timeout_seconds: 5,
            missing_rate_policy: policy,
        }
    }

    /// Fetcher that replays scripted responses and counts calls.
    struct ScriptedFetcher {
        responses: Mutex<Vec<Result<Snapshot>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<Snapshot>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotFetcher for ScriptedFetcher {
        async fn fetch(&self, _instrument_ids: &[i32]) -> Result<Snapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(FundingDataError::UpstreamFetch("script exhausted".into()));
            }
            responses.remove(0)
        }
    }

    fn snapshot(timestamp: i64, rates: Vec<(i32, Option<&str>)>) -> Snapshot {
        Snapshot {
            timestamp,
            reference_value: dec("1.01"),
            rates: rates
                .into_iter()
                .map(|(instrument_id, rate)| InstrumentRate {
                    instrument_id,
                    rate: rate.map(dec),
                })
                .collect(),
        }
    }

    fn worker(
        store: Arc<InMemorySampleStore>,
        fetcher: Arc<ScriptedFetcher>,
        policy: MissingRatePolicy,
    ) -> CollectorWorker {
        CollectorWorker::new(store, fetcher, registry(), collector_config(policy))
    }

    #[tokio::test]
    async fn test_omit_policy_leaves_failed_instrument_absent() {
        let store = Arc::new(InMemorySampleStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(snapshot(
            1_000,
            vec![(1, Some("0.1")), (2, None), (3, Some("0.3"))],
        ))]));
        let w = worker(store.clone(), fetcher, MissingRatePolicy::Omit);

        w.collect_once().await;

        let latest = store.latest_sample().await.unwrap().unwrap();
        let ids: Vec<i32> = latest.rates.iter().map(|r| r.instrument_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_record_zero_policy_stores_zero() {
        let store = Arc::new(InMemorySampleStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(snapshot(
            1_000,
            vec![(1, Some("0.1")), (2, None), (3, Some("0.3"))],
        ))]));
        let w = worker(store.clone(), fetcher, MissingRatePolicy::RecordZero);

        w.collect_once().await;

        let latest = store.latest_sample().await.unwrap().unwrap();
        assert_eq!(latest.rates.len(), 3);
        assert_eq!(latest.rates[1].instrument_id, 2);
        assert_eq!(latest.rates[1].rate, dec("0"));
    }

    #[tokio::test]
    async fn test_instrument_absent_from_snapshot_is_treated_as_failed() {
        let store = Arc::new(InMemorySampleStore::new());
        // Instrument 3 never comes back at all.
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(snapshot(
            1_000,
            vec![(1, Some("0.1")), (2, Some("0.2"))],
        ))]));
        let w = worker(store.clone(), fetcher, MissingRatePolicy::Omit);

        w.collect_once().await;

        let latest = store.latest_sample().await.unwrap().unwrap();
        let ids: Vec<i32> = latest.rates.iter().map(|r| r.instrument_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_wholesale_fetch_failure_writes_nothing() {
        let store = Arc::new(InMemorySampleStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(
            FundingDataError::UpstreamFetch("rpc down".into()),
        )]));
        let w = worker(store.clone(), fetcher, MissingRatePolicy::Omit);

        w.collect_once().await;

        assert!(store.latest_sample().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_timestamp_is_skipped_not_fatal() {
        let store = Arc::new(InMemorySampleStore::new());
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(snapshot(1_000, vec![(1, Some("0.1"))])),
            Ok(snapshot(1_000, vec![(1, Some("0.9"))])),
            Ok(snapshot(2_000, vec![(1, Some("0.2"))])),
        ]));
        let w = worker(store.clone(), fetcher, MissingRatePolicy::Omit);

        w.collect_once().await;
        w.collect_once().await; // duplicate, dropped
        w.collect_once().await;

        let samples = store.range(0, 10_000).await.unwrap();
        assert_eq!(samples.len(), 2);
        // First sample kept its original rate.
        assert_eq!(samples[1].rates[0].rate, dec("0.1"));
    }

    #[tokio::test]
    async fn test_single_flight_drops_overlapping_cycle() {
        let store = Arc::new(InMemorySampleStore::new());
        let fetcher = Arc::new(
            ScriptedFetcher::new(vec![Ok(snapshot(1_000, vec![(1, Some("0.1"))]))])
                .with_delay(Duration::from_millis(200)),
        );
        let w = Arc::new(worker(store, fetcher.clone(), MissingRatePolicy::Omit));

        let first = {
            let w = w.clone();
            tokio::spawn(async move { w.collect_once().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Fires while the first cycle is still collecting.
        w.collect_once().await;

        first.await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cycle_deadline_is_enforced() {
        let store = Arc::new(InMemorySampleStore::new());
        let fetcher = Arc::new(
            ScriptedFetcher::new(vec![Ok(snapshot(1_000, vec![(1, Some("0.1"))]))])
                .with_delay(Duration::from_secs(30)),
        );
        let mut config = collector_config(MissingRatePolicy::Omit);
        config.cycle_timeout_seconds = 1;
        let w = CollectorWorker::new(store.clone(), fetcher, registry(), config);

        tokio::time::pause();
        let cycle = w.collect_once();
        tokio::pin!(cycle);
        tokio::time::advance(Duration::from_secs(2)).await;
        cycle.await;

        // Timed out before the store was reached, and the guard is free
        // again for the next tick.
        assert!(store.latest_sample().await.unwrap().is_none());
        assert!(!w.collecting.load(Ordering::SeqCst));
    }
}
