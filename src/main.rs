//! Bookshelf health listener entry point.
//!
//! Loads configuration from TOML, initializes tracing, binds the health
//! listener and serves liveness probes until SIGTERM/SIGINT.

use std::sync::Arc;

use clap::Parser;

use bookshelf_health::config::{AppConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
use bookshelf_health::health::{HealthCheckResponder, TracingLogger};
use bookshelf_health::listener::{shutdown_signal, HealthListener};
use bookshelf_health::telemetry::init_tracing;

/// Liveness probe listener for the Bookshelf application
#[derive(Parser, Debug)]
#[command(name = "bookshelf-health", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = CONFIG_ENV_VAR, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level filter (e.g., "bookshelf_health=debug")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = AppConfig::load(&args.config)?;

    // Log filter priority: CLI > env > config default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| config.logging.default_filter().to_string());
    init_tracing(&log_filter, config.logging.is_json());

    tracing::info!(path = %args.config, "Loaded configuration");

    let responder = HealthCheckResponder::with_logger(Arc::new(TracingLogger));
    let listener = HealthListener::bind(&config.listener, Arc::new(responder)).await?;
    tracing::info!(addr = %listener.local_addr()?, "Health listener bound");

    listener.run_until_stopped(shutdown_signal()).await;

    Ok(())
}
