//! `run` command implementation.

use anyhow::{Context, Result};
use dispatcher::DispatcherBuilder;
use std::time::Duration;
use tracing::{info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::workload::{Workload, WorkloadConfig};

/// Execute the `run` command
pub async fn run_workload(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let config = load_config(&args.config)?;

    let metrics_port = match args.metrics_port {
        Some(0) => None,
        Some(port) => {
            info!(port, "Overriding metrics port from CLI");
            Some(port)
        }
        None => config.observability.metrics_port,
    };
    if let Some(port) = metrics_port {
        observability::init_metrics_only(port)?;
    }

    info!(
        clients = config.clients.len(),
        metrics_port = ?metrics_port,
        "Configuration loaded"
    );
    if config.clients.is_empty() {
        warn!("No clients configured, every read will return the default");
    }

    let (dispatcher, isolated) = DispatcherBuilder::new(config)
        .build_with_metrics()
        .context("Failed to build dispatcher")?;

    let workload_config = WorkloadConfig {
        workers: usize::from(args.workers),
        iterations: (args.iterations > 0).then_some(args.iterations),
        duration: (args.duration_secs > 0).then(|| Duration::from_secs(args.duration_secs)),
        event_ttl: Duration::from_millis(args.event_ttl_ms),
    };

    let stats = Workload::new(workload_config, dispatcher, isolated)
        .run(shutdown_signal())
        .await
        .context("Workload execution failed")?;

    info!(
        iterations = stats.iterations,
        failures = stats.dispatch.total_failures(),
        duration_secs = stats.duration.as_secs_f64(),
        calls_per_sec = format!("{:.0}", stats.calls_per_sec()),
        "Workload completed"
    );
    stats.print_summary();

    info!("Telemetry Hub finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
}
