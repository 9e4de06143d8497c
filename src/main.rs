//! breaker-lb
//!
//! Round-robin HTTP dispatcher with a per-worker circuit breaker, built on
//! Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                   BREAKER-LB                      │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ───────────────────┼─▶│  http   │──▶│ dispatch │──▶│ load_balancer│   │
//!                      │  │ server  │   │ handler  │   │ pool + rr    │   │
//!                      │  └─────────┘   └────┬─────┘   └──────┬───────┘   │
//!                      │                     │                │           │
//!                      │                     ▼                ▼           │
//!   Client Response    │               ┌──────────┐   ┌──────────────┐   │
//!   ◀──────────────────┼───────────────│ rpc      │   │ resilience   │   │
//!                      │               │ client   │   │ breaker/clock│   │
//!                      │               └────┬─────┘   └──────────────┘   │
//!                      └────────────────────┼─────────────────────────────┘
//!                                           ▼
//!                                        Workers
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use breaker_lb::admin::{self, AdminState};
use breaker_lb::config::{load_config, ProxyConfig};
use breaker_lb::lifecycle::{signals, Shutdown};
use breaker_lb::observability::{logging, metrics};
use breaker_lb::HttpServer;

#[derive(Parser)]
#[command(name = "breaker-lb", version)]
#[command(about = "Round-robin dispatcher with per-worker circuit breaking", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "BREAKER_LB_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config: ProxyConfig = load_config(&cli.config)?;

    logging::init_logging(&config.observability);
    tracing::info!("breaker-lb v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        workers = config.balancer.workers.len(),
        failure_limit = config.balancer.failure_limit,
        window_secs = config.balancer.window_secs,
        path_prefix = %config.balancer.path_prefix,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let server = HttpServer::new(config.clone())?;

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState {
            handler: server.handler().clone(),
            api_key: config.admin.api_key.clone(),
        };
        let rx = shutdown.subscribe();
        Some(tokio::spawn(admin::serve(listener, state, rx)))
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    server.run(listener, shutdown.subscribe()).await?;

    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
            Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
