//! Stormflow server binary.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use stormflow::config::ServiceConfig;
use stormflow::observability::{init_tracing, LogFormat};
use stormflow_server::{router, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Stormflow - staged research-and-write article service")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    port: u16,
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Emit one JSON object per log line
    #[arg(long)]
    json_logs: bool,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded_env = dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });
    if let Some(path) = loaded_env {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = ServiceConfig::load(args.config.as_deref()).context("loading configuration")?;
    let state = AppState::from_config(&config).context("building providers")?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Stormflow server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
