//! casegen binary: load configuration, wire collaborators, serve HTTP.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use casegen::api::{start_server, AppState, Gateway};
use casegen::config::Config;
use casegen::generator::GeminiGenerator;
use casegen::health::start_periodic_usage_flush;
use casegen::tracker::JiraTracker;

const DEFAULT_LOG_FILTER: &str = "casegen=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "casegen", version, about = "Issue tracker to test case gateway")]
struct Cli {
    /// Path to the JSON config file (default: ~/.casegen/config.json)
    #[arg(long, env = "CASEGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address, overrides the config file
    #[arg(long)]
    bind: Option<String>,

    /// Listen port, overrides the config file
    #[arg(long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long, env = "CASEGEN_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let tracker = JiraTracker::new(config.tracker.request_timeout_secs.map(Duration::from_secs))
        .context("Failed to build tracker client")?
        .with_search_path(&config.tracker.search_path);
    let generator =
        GeminiGenerator::from_config(&config.generator).context("Failed to build generator")?;
    info!(model = %generator.model(), "Generator ready");

    let gateway = Gateway::new(Arc::new(tracker), Arc::new(generator), &config.cache);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let flush = start_periodic_usage_flush(gateway.metrics().clone(), shutdown_rx);

    start_server(&config.server, AppState::new(gateway), shutdown_signal())
        .await
        .context("Gateway server failed")?;

    let _ = shutdown_tx.send(true);
    let _ = flush.await;
    Ok(())
}
