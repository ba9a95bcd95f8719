use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use oidc_gateway::Pages;
use oidc_gateway::middleware::{GatewayConfig, GatewayState};

/// OIDC login gateway in front of the chat application.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address the application listens on.
    #[arg(long, env = "GATEWAY_ADDR", default_value = "0.0.0.0:8080")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    run(args)
        .await
        .inspect_err(|e| tracing::error!(error = %format!("{e:#}"), "Gateway stopped"))
}

async fn run(args: Args) -> Result<()> {
    let config = GatewayConfig::from_env().context("Invalid gateway configuration")?;
    let issuer = config.issuer().clone();
    let pages = Pages::new().context("Failed to load page templates")?;

    // No trusted key set, no serving.
    let state = GatewayState::initialize(config, pages)
        .await
        .with_context(|| format!("Failed to resolve OIDC provider at {issuer}"))?;
    let app = oidc_gateway::app::router(state);

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    tracing::info!(addr = %args.addr, "Starting the web server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
