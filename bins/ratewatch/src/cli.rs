use clap::{Parser, Subcommand};
use observability::LogFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ratewatch")]
#[command(about = "Funding rate collection and analytics service")]
#[command(version)]
pub struct Cli {
    /// Log output format (pretty, json, compact)
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the collector and the query API
    Start {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config/ratewatch.yaml")]
        config: PathBuf,

        /// Override the API port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate configuration without starting the service
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "config/ratewatch.yaml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "ratewatch.yaml")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
