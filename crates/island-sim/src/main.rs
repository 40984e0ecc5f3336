//! Command-line runner for the island simulation.

mod telemetry;

use anyhow::{Context, Result};
use island_core::SimulationConfig;
use island_world::{TracingReporter, TurnEngine};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_telemetry()?;

    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_json_file(&path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => {
            info!("No configuration file given, using defaults");
            SimulationConfig::default()
        }
    };

    info!(
        width = config.grid.width,
        height = config.grid.height,
        max_turns = config.engine.max_turns,
        tick_ms = config.engine.tick_period_ms,
        "Starting island simulation"
    );

    let engine = Arc::new(TurnEngine::new(
        Arc::new(config),
        Arc::new(TracingReporter),
    )?);

    let cancel = CancellationToken::new();
    let run = tokio::spawn(Arc::clone(&engine).run(cancel.clone()));

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Interrupted, stopping after the current tick");
        interrupt.cancel();
    });

    let summary = run.await??;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
