//! Prometheus exporter for hardware-sensor telemetry.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use lhm_exporter_prometheus::config::{LogFormat, LoggingConfig};
use lhm_exporter_prometheus::{
    ExporterConfig, HttpServer, MetricRegistry, SensorMode, SensorPoller, source,
};

/// Prometheus exporter for hardware-sensor telemetry.
#[derive(Parser, Debug)]
#[command(name = "lhm-exporter-prometheus")]
#[command(about = "Export hardware-monitor sensor readings as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Sensor inclusion mode: essential, extended, diagnostic (overrides config).
    #[arg(long, value_enum)]
    mode: Option<SensorMode>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(args_level: &str, logging: &LoggingConfig) -> anyhow::Result<()> {
    let log_level = args_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("lhm_exporter_prometheus={}", log_level).parse()?)
        .add_directive(format!("hyper={}", Level::WARN).parse()?);

    match (&logging.file, logging.format) {
        (Some(path), LogFormat::Json) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .json()
                .init();
        }
        (Some(path), LogFormat::Text) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        (None, LogFormat::Json) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        (None, LogFormat::Text) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }
    if let Some(mode) = args.mode {
        config.poll.mode = mode;
    }
    config.validate()?;

    init_logging(&args.log_level, &config.logging)?;

    info!("Starting hardware-sensor Prometheus exporter");

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Shared gauge registry
    let registry = Arc::new(MetricRegistry::new());

    // Parse listen address
    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Pick a backend once; the exporter still serves (empty) metrics when
    // none is reachable so a scrape target exists immediately.
    let backend = source::select_backend(&config.source).await;
    if backend.is_none() {
        warn!("Running disconnected; restart the exporter once the daemon is up");
    }

    let poller = SensorPoller::new(
        backend,
        registry.clone(),
        config.poll.mode,
        Duration::from_secs(config.poll.interval_secs),
    );
    let http_server = HttpServer::new(
        registry.clone(),
        listen_addr,
        config.prometheus.path.clone(),
    );

    // Start poller
    let poller_shutdown = shutdown_rx.clone();
    let poller_task = tokio::spawn(poller.run(poller_shutdown));

    // Start HTTP server
    let http_shutdown = shutdown_rx.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(http_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
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

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for tasks to complete
    let mut final_stats = None;
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        if let Ok(stats) = poller_task.await {
            final_stats = Some(stats);
        }
        let _ = http_task.await;
    })
    .await;

    // Print final stats
    if let Some(stats) = final_stats {
        info!(
            cycles = stats.cycles,
            records_seen = stats.records_seen,
            exported = stats.exported,
            filtered = stats.filtered,
            dropped_invalid = stats.dropped_invalid,
            gauges = registry.gauge_count(),
            "Final statistics"
        );
    }

    info!("Exporter stopped");
    Ok(())
}
