use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Top-level service configuration, loaded from YAML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub service: ServiceInfo,
    pub database: DatabaseConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// Instrument registry. Omitted means "use the reference table".
    #[serde(default = "default_instruments")]
    pub instruments: Vec<InstrumentEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(rename = "max_connections")]
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Upstream snapshot source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectorConfig {
    /// Interval between collection cycles in seconds
    #[serde(rename = "interval_seconds")]
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    /// Whether to run a collection cycle immediately on startup
    #[serde(rename = "run_on_startup")]
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
    /// Per-cycle deadline in seconds; must stay below the interval
    #[serde(rename = "cycle_timeout_seconds")]
    #[serde(default = "default_cycle_timeout_seconds")]
    pub cycle_timeout_seconds: u64,
    #[serde(rename = "missing_rate_policy")]
    #[serde(default)]
    pub missing_rate_policy: MissingRatePolicy,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            run_on_startup: default_run_on_startup(),
            cycle_timeout_seconds: default_cycle_timeout_seconds(),
            missing_rate_policy: MissingRatePolicy::default(),
        }
    }
}

/// How a failed per-instrument fetch is recorded within an otherwise
/// successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingRatePolicy {
    /// Omit the instrument's row for that sample (absence = failure).
    #[default]
    Omit,
    /// Store a zero rate, matching the legacy deployment. A stored zero is
    /// indistinguishable from a measured zero rate.
    RecordZero,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

/// One instrument in the registry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstrumentEntry {
    pub id: i32,
    pub symbol: String,
}
