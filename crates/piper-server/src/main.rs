use clap::Parser;
use piper_core::PiperConfig;
use piper_server::{app_with_state, state::AppState};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// HTTP front end for the external Huffman compressor.
#[derive(Debug, Parser)]
#[command(name = "piper-server", version)]
struct Args {
    /// JSON config file. `PIPER_*` environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen host, overrides config and environment.
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overrides config and environment.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => PiperConfig::from_file(path)?,
        None => PiperConfig::default(),
    }
    .apply_env()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let state = AppState::from_config(&config).await?;
    let app = app_with_state(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Compression server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
