//! Packhorse gateway binary.
//!
//! This is the main entry point for running the gateway in front of a
//! backend application server.

use anyhow::{Context, Result};
use clap::Parser;
use packhorse_gateway::config::Config;
use packhorse_gateway::observability::init_logging;
use packhorse_gateway::router::build_router;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Packhorse - request interception gateway
#[derive(Parser, Debug)]
#[command(name = "packhorse-gateway")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "packhorse.yaml")]
    config: PathBuf,

    /// Listen address, overrides the configuration file
    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    /// Upstream backend URL, overrides the configuration file
    #[arg(long)]
    upstream_url: Option<String>,

    /// Git binary to spawn, overrides the configuration file
    #[arg(long)]
    git_binary: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log in JSON format
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(listen_addr) = args.listen_addr {
        config.listen_addr = listen_addr;
    }
    if let Some(upstream_url) = args.upstream_url {
        config.upstream_url = upstream_url;
    }
    if let Some(git_binary) = args.git_binary {
        config.git_binary = git_binary;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }
    if args.log_json {
        config.log_json = true;
    }

    init_logging(&config.log_level, config.log_json);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Packhorse gateway"
    );
    tracing::info!(
        listen_addr = %config.listen_addr,
        upstream_url = %config.upstream_url,
        git_binary = %config.git_binary,
        "Gateway configuration"
    );

    let app = build_router(&config)?;

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.listen_addr))?;
    tracing::info!("Listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Completes when the process receives an interrupt.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::process::exit(1);
    }
    tracing::info!("Received SIGINT, shutting down");
}
