//! Immutable metrics snapshot.

use serde::{Deserialize, Serialize};

use crate::link::{Link, LinkStatus, TierKind};

/// Point-in-time view of the controller, built from cached state only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub active_link: Option<String>,
    pub active_kind: Option<TierKind>,
    /// Cached latency of the active link.
    pub latency_ms: f64,
    /// Cached bandwidth of the active link.
    pub bandwidth_mbps: f64,
    /// Always within [0, 100].
    pub availability_percent: f64,
    pub failover_count: u64,
    /// `None` until the first failover completes.
    pub last_failover_secs: Option<f64>,
    /// True when the active link is a last-resort pick with no healthy tier.
    pub degraded: bool,
    pub uptime_secs: f64,
    pub links: Vec<LinkReport>,
}

/// Per-tier row of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkReport {
    pub name: String,
    pub priority: u32,
    pub kind: TierKind,
    pub status: LinkStatus,
    pub active: bool,
    pub latency_ms: f64,
    pub bandwidth_mbps: f64,
    pub packet_loss_percent: f64,
    pub last_probe_unix_ms: Option<u64>,
    pub forced: Option<LinkStatus>,
}

impl LinkReport {
    pub fn from_link(link: &Link, active: bool) -> Self {
        let metrics = link.metrics();
        Self {
            name: link.name().to_string(),
            priority: link.priority(),
            kind: link.kind(),
            status: metrics.status,
            active,
            latency_ms: metrics.latency.as_secs_f64() * 1000.0,
            bandwidth_mbps: metrics.bandwidth_mbps,
            packet_loss_percent: metrics.packet_loss_percent,
            last_probe_unix_ms: metrics.last_probe_unix_ms(),
            forced: link.forced_status(),
        }
    }
}

impl MetricsSnapshot {
    /// Report row for a tier by name.
    pub fn link(&self, name: &str) -> Option<&LinkReport> {
        self.links.iter().find(|l| l.name == name)
    }
}

/// `(uptime - downtime) / uptime * 100`, clamped, 0 for zero uptime.
pub fn availability_percent(uptime_secs: f64, downtime_secs: f64) -> f64 {
    if uptime_secs <= 0.0 {
        return 0.0;
    }
    ((uptime_secs - downtime_secs) / uptime_secs * 100.0).clamp(0.0, 100.0)
}
