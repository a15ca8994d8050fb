//! Legend service.
//!
//! HTTP server answering WMS GetLegendGraphic-style requests with legends
//! composed from pre-supplied images and backend renders.

use anyhow::{Context, Result};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use legend_api::state::{AppState, ServiceSettings};

#[derive(Parser, Debug)]
#[command(name = "legend-api")]
#[command(about = "WMS legend graphic service")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:5014", env = "LEGEND_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TOKIO_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Directory with one configuration sub-directory per tenant
    #[arg(long, default_value = "config", env = "CONFIG_DIR")]
    config_dir: PathBuf,

    /// Request header selecting the tenant
    #[arg(long, env = "TENANT_HEADER")]
    tenant_header: Option<String>,

    /// Trusted request header carrying the caller identity
    #[arg(long, env = "IDENTITY_HEADER")]
    identity_header: Option<String>,

    /// Upper bound for a whole legend request, in seconds
    #[arg(long, default_value_t = 60, env = "REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: u64,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build tokio runtime with configurable worker threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!("Prometheus metrics exporter initialized");
    info!(config_dir = %args.config_dir.display(), "Starting legend service");

    let settings = ServiceSettings {
        config_dir: args.config_dir,
        tenant_header: args.tenant_header,
        identity_header: args.identity_header,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    };

    // Initialize application state
    let state = Arc::new(AppState::new(&settings, Some(prometheus_handle))?);
    let app = legend_api::router(state);

    // Parse listen address
    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
