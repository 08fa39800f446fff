//! Link resilience daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌────────────────────────────────────────────────┐
//!                  │              RESILIENCE CONTROLLER             │
//!                  │                                                │
//!   Starlink ◀─────┼── probe ──┐                                    │
//!   4G       ◀─────┼── probe ──┼──▶ monitor tick ──▶ selection      │
//!   LoRa     ◀─────┼── probe ──┘         │              │           │
//!                  │                     ▼              ▼           │
//!                  │              downtime/KPIs    active link      │
//!                  │                     │              │           │
//!                  │                     ▼              ▼           │
//!                  │              ┌─────────────────────────────┐   │
//!                  │              │ metrics (Prometheus)  admin │   │
//!                  │              └─────────────────────────────┘   │
//!                  └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use link_resilience::admin::{setup_admin_router, AdminState};
use link_resilience::config::{load_config, validation::validate_config, ControllerConfig};
use link_resilience::lifecycle::{wait_for_signal, Shutdown};
use link_resilience::observability::{logging, metrics};
use link_resilience::ResilienceController;

#[derive(Parser)]
#[command(name = "link-resilience")]
#[command(about = "Tiered network link resilience controller", long_about = None)]
struct Args {
    /// Path to a TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long, env = "LINK_RESILIENCE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let config = ControllerConfig::default();
            validate_config(&config)
                .map_err(|errors| format!("invalid default configuration: {:?}", errors))?;
            config
        }
    };

    logging::init(&config.observability.log_level);
    tracing::info!("link-resilience v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        links = config.links.len(),
        interval_ms = config.monitor.interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let controller = Arc::new(
        ResilienceController::from_config(&config)?
            .with_observer(Arc::new(metrics::PrometheusObserver)),
    );
    controller.start().await?;

    let shutdown = Shutdown::new();
    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");

        let router = setup_admin_router(AdminState {
            controller: controller.clone(),
            thresholds: config.kpi.clone(),
            api_key: config.admin.api_key.as_str().into(),
        });
        let mut admin_shutdown = shutdown.subscribe();
        Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await
        }))
    } else {
        None
    };

    wait_for_signal().await;
    shutdown.trigger();
    controller.stop().await;

    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API stopped with error"),
            Err(e) => tracing::error!(error = %e, "Admin API task failed"),
            Ok(Ok(())) => {}
        }
    }

    let snapshot = controller.metrics();
    tracing::info!(
        availability_percent = snapshot.availability_percent,
        failover_count = snapshot.failover_count,
        "Shutdown complete"
    );
    Ok(())
}
