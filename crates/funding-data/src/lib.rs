//! # Funding Data Crate
//!
//! Core funding rate collection and query layer for the ratewatch service.
//!
//! ## Key Components
//!
//! - **Domain Types**: `Sample`, `RateObservation`, `InstrumentPoint`, stats types
//! - **Traits**: `SampleStore` for storage abstraction, `SnapshotFetcher` for the upstream feed
//! - **Collection**: `CollectorWorker` drives the periodic fetch -> store cycle
//! - **Aggregation**: epoch-aligned bucketing over instrument history
//! - **Query**: `QueryService` validated read facade with an axum HTTP binding
//!
//! The core business logic is trait-based: `PostgresSampleStore` and
//! `InMemorySampleStore` both implement `SampleStore`, so the worker, the
//! query service, and the tests are storage-agnostic.

pub mod aggregate;
pub mod api;
pub mod error;
pub mod fetch;
pub mod registry;
pub mod service;
pub mod store;
pub mod types;
pub mod worker;

// Re-export main types for convenience
pub use aggregate::{bucket_points, Granularity, RateBucket};
pub use error::{FundingDataError, Result};
pub use fetch::{HttpSnapshotFetcher, InstrumentRate, Snapshot, SnapshotFetcher};
pub use registry::InstrumentRegistry;
pub use service::{parse_duration_token, InstrumentHistory, QueryService};
pub use store::{InMemorySampleStore, PostgresSampleStore, SampleStore};
pub use types::{InstrumentPoint, RateObservation, RateStats, ReferenceValueStats, Sample};
pub use worker::CollectorWorker;
