//! Background monitor loop.
//!
//! # Responsibilities
//! - Drive `tick()` on a fixed cadence for the controller's lifetime
//! - Publish a metrics snapshot after every tick
//! - Stop deterministically: `stop()` returns only after the task has exited

use std::sync::Arc;

use tokio::time::{self, MissedTickBehavior};

use crate::controller::{ControllerError, ResilienceController};
use crate::observability::metrics;

impl ResilienceController {
    /// Initialize (if needed) and spawn the monitor loop.
    pub async fn start(self: &Arc<Self>) -> Result<(), ControllerError> {
        if self.shutdown.is_triggered() {
            return Err(ControllerError::Stopped);
        }

        let mut monitor = self.monitor.lock().await;
        if monitor.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(ControllerError::AlreadyRunning);
        }

        // Subscribe first so a stop() racing with initialize() is not missed.
        let shutdown = self.shutdown.subscribe();
        if self.active().is_none() {
            self.initialize().await;
        }
        if self.shutdown.is_triggered() {
            return Err(ControllerError::Stopped);
        }

        let controller = Arc::clone(self);
        *monitor = Some(tokio::spawn(async move {
            controller.run(shutdown).await;
        }));
        Ok(())
    }

    async fn run(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.settings.monitor_interval.as_millis() as u64,
            links = self.links.len(),
            "Link monitor starting"
        );

        let mut ticker = time::interval(self.settings.monitor_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; initialize() has just probed.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                report = self.tick() => {
                    if report.skipped {
                        break;
                    }
                    metrics::record_snapshot(&self.metrics());
                }
            }

            if self.shutdown.is_triggered() {
                break;
            }
        }

        tracing::info!("Link monitor received shutdown signal, exiting loop");
    }

    /// True while the monitor task is alive.
    pub async fn is_running(&self) -> bool {
        self.monitor
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the monitor loop and wait for it to exit.
    ///
    /// After this returns no tick is running and later ticks are no-ops.
    pub async fn stop(&self) {
        if self.shutdown.trigger() {
            tracing::info!("Stopping link resilience controller");
        }

        let handle = self.monitor.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Link monitor task ended abnormally");
            }
        }
    }
}
