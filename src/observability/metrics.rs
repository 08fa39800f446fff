//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Expose a Prometheus-compatible metrics endpoint
//! - Render failover events and snapshots as counters and gauges
//!
//! # Metrics
//! - `active_link{tier}` (gauge): 1 for the active tier, 0 otherwise
//! - `failover_count` (counter): completed failovers
//! - `last_failover_seconds` (gauge): duration of the most recent failover
//! - `failover_duration_seconds` (histogram): failover duration distribution
//! - `availability_percent` (gauge): derived availability
//! - `link_latency_ms{tier}` (gauge): cached probe latency per tier
//! - `link_bandwidth_mbps{tier}` (gauge): cached bandwidth per tier
//! - `link_healthy{tier}` (gauge): 1=healthy, 0=degraded or unhealthy
//! - `degraded_mode` (gauge): 1 when no healthy tier backs the active link

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::controller::snapshot::MetricsSnapshot;
use crate::link::LinkStatus;
use crate::observability::events::{FailoverEvent, FailoverObserver};

/// Install the global recorder and start the scrape endpoint.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_gauge!("active_link", "1 for the active tier, 0 otherwise");
    ::metrics::describe_counter!("failover_count", "Completed failovers");
    ::metrics::describe_gauge!("last_failover_seconds", "Duration of the most recent failover");
    ::metrics::describe_histogram!("failover_duration_seconds", "Failover duration distribution");
    ::metrics::describe_gauge!("availability_percent", "Availability derived from downtime");
    ::metrics::describe_gauge!("link_latency_ms", "Cached probe latency per tier");

    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Record a failover event.
pub fn record_failover(event: &FailoverEvent) {
    let secs = event.duration.as_secs_f64();
    ::metrics::counter!("failover_count").increment(1);
    ::metrics::gauge!("last_failover_seconds").set(secs);
    ::metrics::histogram!("failover_duration_seconds").record(secs);

    if let Some(from) = &event.from {
        ::metrics::gauge!("active_link", "tier" => from.clone()).set(0.0);
    }
    ::metrics::gauge!("active_link", "tier" => event.to.clone()).set(1.0);
}

/// Publish a full snapshot as gauges.
pub fn record_snapshot(snapshot: &MetricsSnapshot) {
    ::metrics::gauge!("availability_percent").set(snapshot.availability_percent);
    ::metrics::gauge!("degraded_mode").set(if snapshot.degraded { 1.0 } else { 0.0 });

    for link in &snapshot.links {
        let tier = link.name.clone();
        ::metrics::gauge!("active_link", "tier" => tier.clone()).set(if link.active { 1.0 } else { 0.0 });
        ::metrics::gauge!("link_latency_ms", "tier" => tier.clone()).set(link.latency_ms);
        ::metrics::gauge!("link_bandwidth_mbps", "tier" => tier.clone()).set(link.bandwidth_mbps);
        let healthy = link.status == LinkStatus::Healthy;
        ::metrics::gauge!("link_healthy", "tier" => tier).set(if healthy { 1.0 } else { 0.0 });
    }
}

/// Observer that forwards failover events to the metrics recorder.
#[derive(Debug, Default)]
pub struct PrometheusObserver;

impl FailoverObserver for PrometheusObserver {
    fn on_failover(&self, event: &FailoverEvent) {
        record_failover(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        // No global recorder installed: calls must not panic.
        let event = FailoverEvent {
            from: Some("a".to_string()),
            to: "b".to_string(),
            duration: Duration::from_millis(3),
            failover_count: 1,
            reason: crate::observability::FailoverReason::ActiveUnhealthy,
        };
        PrometheusObserver.on_failover(&event);
        record_snapshot(&MetricsSnapshot {
            active_link: Some("b".to_string()),
            active_kind: None,
            latency_ms: 10.0,
            bandwidth_mbps: 5.0,
            availability_percent: 100.0,
            failover_count: 1,
            last_failover_secs: Some(0.003),
            degraded: false,
            uptime_secs: 1.0,
            links: Vec::new(),
        });
    }
}
