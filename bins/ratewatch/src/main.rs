//! Ratewatch service binary.
//!
//! Entry point wiring: configuration -> logging -> storage -> collector
//! worker + query API, with graceful shutdown on Ctrl+C.

mod cli;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{generate_default_config, load_config, save_config, validate_config, ServiceConfig};
use funding_data::api::{create_router, ApiState};
use funding_data::{
    CollectorWorker, HttpSnapshotFetcher, InstrumentRegistry, PostgresSampleStore, QueryService,
    SampleStore, SnapshotFetcher,
};
use observability::init_logging;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging("ratewatch", cli.log_format)?;

    match cli.command {
        Commands::Start { config, port } => {
            info!("Executing 'start' command");
            start_command(config, port).await
        }
        Commands::Validate { config } => {
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Init { output } => {
            info!("Executing 'init' command");
            init_command(output).await
        }
    }
}

fn load_valid_config<P: AsRef<Path>>(config_path: P) -> Result<ServiceConfig> {
    let config = load_config(config_path)?;
    let report = validate_config(&config);

    if !report.warnings.is_empty() {
        warn!("Configuration warnings:");
        for warning in &report.warnings {
            warn!(field = %warning.field, message = %warning.message);
        }
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start due to configuration errors");
    }

    Ok(config)
}

async fn start_command<P: AsRef<Path>>(config_path: P, port_override: Option<u16>) -> Result<()> {
    let config = load_valid_config(config_path)?;

    let registry = Arc::new(InstrumentRegistry::from_config(&config.instruments)?);
    info!(instruments = registry.len(), "Instrument registry loaded");

    let store = PostgresSampleStore::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to the sample store")?;
    store.run_migrations().await?;
    let store: Arc<dyn SampleStore> = Arc::new(store);

    let fetcher: Arc<dyn SnapshotFetcher> =
        Arc::new(HttpSnapshotFetcher::new(config.upstream.endpoint.clone()));

    // Collector runs in the background until shutdown is signalled.
    let worker = CollectorWorker::new(
        store.clone(),
        fetcher,
        registry.clone(),
        config.collector.clone(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let service = QueryService::new(store, registry);
    let router = create_router(ApiState {
        service: Arc::new(service),
    });

    let port = port_override.unwrap_or(config.api.port);
    let addr = format!("{}:{}", config.api.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API listener on {}", addr))?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("Shutting down");
    shutdown_tx
        .send(true)
        .context("Failed to signal worker shutdown")?;
    worker_handle.await.context("Collector worker panicked")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    } else {
        info!("Ctrl+C received");
    }
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Service: {}", config.service.name);
    println!("Version: {}", config.service.version);
    println!("Instruments: {}", config.instruments.len());
    println!(
        "Collection interval: {}s (cycle timeout {}s)",
        config.collector.interval_seconds, config.collector.cycle_timeout_seconds
    );
    println!(
        "Missing rate policy: {:?}",
        config.collector.missing_rate_policy
    );

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("This configuration includes:");
    println!("  - Service metadata (name, description, version)");
    println!("  - The 57-instrument reference table");
    println!("  - Collector defaults (60s interval, omit policy)");
    println!();
    println!("Next steps:");
    println!("  1. Set DATABASE_URL (and optionally UPSTREAM_ENDPOINT)");
    println!(
        "  2. Run 'ratewatch validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'ratewatch start --config {:?}' to start the service",
        output_path
    );

    Ok(())
}
