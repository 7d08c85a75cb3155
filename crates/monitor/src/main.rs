//! Wellness Monitor - Main Entry Point

use anyhow::Context;
use monitor::{build_monitor, init_logging, install_metrics, spawn_stdin_reader, MonitorConfig};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).or_else(|| std::env::var("WELLNESS_CONFIG").ok());
    let config = MonitorConfig::load(path.as_deref()).context("loading monitor configuration")?;
    init_logging(&config)?;

    info!("=== Wellness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = &config.metrics_addr {
        install_metrics(addr)?;
    }

    let monitor = match build_monitor(&config).await {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    let (tx, rx) = mpsc::channel(64);
    spawn_stdin_reader(tx);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let summary = monitor.run(rx, shutdown).await;
    info!(
        "Session finished: {} frames, {} blinks, {} notifications",
        summary.frames, summary.snapshot.blinks, summary.notifications
    );
    if let Some(report) = &summary.report {
        info!(
            "Report {}: {:.2} min, {:.1} blinks/min, mostly {}",
            report.session_id, report.duration_minutes, report.blink_rate, report.dominant_emotion
        );
    }
    Ok(())
}
