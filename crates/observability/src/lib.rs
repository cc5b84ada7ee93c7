//! Observability infrastructure for ratewatch
//!
//! Structured logging via tracing. The subscriber is installed once at
//! startup by the binary; library crates only emit events and spans.
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("ratewatch", LogFormat::Pretty)?;
//! ```

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};
