//! Prometheus exporter for Proxmox Mail Gateway.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pmg_exporter::client::PmgApi;
use pmg_exporter::{collectors, ExporterConfig, MetricsServer, PmgClient};

/// Prometheus exporter for Proxmox Mail Gateway.
#[derive(Parser, Debug)]
#[command(name = "pmg-exporter")]
#[command(about = "Export Proxmox Mail Gateway status as Prometheus metrics")]
#[command(version)]
#[command(after_help = "Available collectors: all, exporter_status, cluster_status, \
subscription, node_status, node_postfix_queue, cluster_nodes, cluster_domains, \
cluster_backups, quarantine_spam, quarantine_virus, statistics_mailcount, version_info")]
struct Args {
    /// Path to the env configuration file (default: $PMG_EXPORTER_CONFIG_FILE, else .env).
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Comma-separated list of collectors to enable.
    #[arg(long, default_value = "all")]
    collectors: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_file = args.config_file.unwrap_or_else(|| {
        std::env::var("PMG_EXPORTER_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".env"))
    });

    // Load configuration
    let config = ExporterConfig::load(&config_file)
        .with_context(|| format!("Failed to load configuration from {}", config_file.display()))?;

    // Initialize logging
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("pmg_exporter={}", config.log_level.to_lowercase()).parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting PMG exporter");
    info!(?config, "Configuration loaded");

    if config.exporter_address.is_unspecified() {
        warn!(
            address = %config.exporter_address,
            "Exporter binds to all interfaces; metrics are readable by anyone who can reach it"
        );
    }

    // Connect to the gateway; bad credentials or an unreachable remote
    // must fail startup, not the first scrape.
    let client = PmgClient::connect(&config)
        .await
        .context("Failed to connect to the PMG API")?;
    let api: Arc<dyn PmgApi> = Arc::new(client);

    // Resolve requested collectors
    let requested: Vec<String> = args.collectors.split(',').map(str::to_string).collect();
    let registry = collectors::resolve(&requested, api);
    if registry.is_empty() {
        warn!("No collectors registered; /metrics will serve an empty exposition");
    } else {
        info!(collectors = ?registry.names(), "Registered collectors");
    }

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // Serve until shutdown; bind errors surface here
    let server = MetricsServer::new(Arc::new(registry), config.listen_addr());
    server.run(shutdown_rx).await?;

    info!("Exporter stopped");
    Ok(())
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).expect("failed to install SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
