//! Background collection worker.

mod service;

pub use service::CollectorWorker;
