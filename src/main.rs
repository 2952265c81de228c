//! Submission guard service.
//!
//! ```text
//!     Portal request
//!     ─────────────▶ request id ─▶ trace ─▶ api gate ─▶ submission gate ─▶ handler
//!                                               │              │
//!                                               ▼              ▼
//!                                         RateLimiter     RateLimiter
//!                                          (sweeper)       (sweeper)
//! ```
//!
//! Configuration comes from an optional TOML file; every field has a default.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use submission_guard::config::{load_config, validation::validate_config, ConfigError, GuardConfig};
use submission_guard::observability::{logging, metrics};
use submission_guard::{GuardServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "submission-guard")]
#[command(about = "Rate limiting and submission integrity service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long, env = "GUARD_BIND")]
    bind: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<GuardConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init(&config.observability);
    tracing::info!("submission-guard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_file = ?cli.config,
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        api_max_requests = config.rate_limit.api.max_requests,
        submission_max_requests = config.rate_limit.submission.max_requests,
        similarity_threshold = config.duplicates.similarity_threshold,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = GuardServer::new(config);
    let server_shutdown = shutdown.subscribe();

    // The server drains in-flight requests once the signal task fires.
    tokio::spawn(async move { shutdown.trigger_on_signal().await });
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
