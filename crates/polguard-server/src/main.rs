//! polguard server
//!
//! Serves two pretrained Polish classifiers (hate speech, disinformation)
//! behind `POST /classify`. Both models are loaded before the listener is
//! bound; a model that fails to load aborts startup.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use polguard_classifiers::ModelRegistry;
use polguard_server::{create_router, AppState, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "polguard-server")]
#[command(about = "Polish hate-speech and disinformation classification service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "polguard.yaml")]
    config: String,

    /// Listen address (overrides the configuration file)
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port (overrides the configuration file)
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting polguard server");

    let mut config = ServerConfig::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    info!("Configuration loaded from {}", cli.config);
    info!("Threshold: {}", config.models.threshold);
    info!("Max concurrent inferences: {}", config.max_concurrent_inferences);

    let metrics_handle = init_metrics()?;

    // Model loading downloads and memory-maps weights: keep it off the reactor.
    let models_config = config.models.clone();
    let registry = tokio::task::spawn_blocking(move || -> Result<ModelRegistry> {
        let registry = ModelRegistry::load(&models_config)?;
        if let Some(text) = &models_config.warmup_text {
            registry.warm_up(text, models_config.threshold)?;
        }
        Ok(registry)
    })
    .await??;
    info!("Model registry initialized");

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let state = AppState::new(config, Arc::new(registry), metrics_handle);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, stopping server...");
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("polguard=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polguard=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "polguard_requests_total",
        "Classification requests by model and outcome"
    );
    metrics::describe_histogram!(
        "polguard_inference_latency_us",
        metrics::Unit::Microseconds,
        "Inference latency in microseconds by model"
    );
    metrics::describe_counter!("polguard_errors_total", "Rejected or failed requests by kind");

    info!("Metrics exporter initialized");
    Ok(handle)
}
