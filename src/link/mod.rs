//! Link abstraction.
//!
//! # Responsibilities
//! - Represent a single ranked transport tier (satellite, cellular, LoRa, edge node)
//! - Run one bounded health probe at a time and cache its result
//! - Expose the cached result without blocking
//!
//! # Data Flow
//! ```text
//! health_check()
//!     → forced override? (chaos tooling)
//!     → probe.rs strategy under per-tier timeout
//!     → classify: Healthy / Degraded / Unhealthy
//!     → atomic swap of cached LinkMetrics
//! ```
//!
//! # Design Decisions
//! - Probe failures are ordinary state, never errors to the caller
//! - Cached metrics are swapped whole, readers never see a torn update
//! - Status override mirrors the backend state encoding (AtomicU8)

pub mod probe;

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::time;

use self::probe::{Probe, ProbeError, ProbeSample};

/// Latency reported for a tier whose last probe failed.
pub const UNREACHABLE_LATENCY: Duration = Duration::from_secs(999);

/// Lower bound applied to derived probe timeouts.
pub const MIN_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Link health status.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Healthy = 1,
    Degraded = 2,
    Unhealthy = 3,
}

impl LinkStatus {
    fn from_override(val: u8) -> Option<Self> {
        match val {
            1 => Some(LinkStatus::Healthy),
            2 => Some(LinkStatus::Degraded),
            3 => Some(LinkStatus::Unhealthy),
            _ => None,
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Healthy => write!(f, "healthy"),
            LinkStatus::Degraded => write!(f, "degraded"),
            LinkStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// What a tier physically is. Selection logic does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Satellite,
    Cellular,
    Lora,
    Mesh,
    EdgeNode,
    #[default]
    Other,
}

/// Expected performance of a tier when it is working normally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NominalProfile {
    pub latency: Duration,
    pub bandwidth_mbps: f64,
}

/// Result of the most recent health check.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkMetrics {
    pub status: LinkStatus,
    pub latency: Duration,
    pub bandwidth_mbps: f64,
    pub packet_loss_percent: f64,
    /// Wall-clock time of the probe, `None` until the first check.
    pub last_probe: Option<SystemTime>,
}

impl LinkMetrics {
    /// Metrics for a tier that could not be reached.
    pub fn unreachable(last_probe: Option<SystemTime>) -> Self {
        Self {
            status: LinkStatus::Unhealthy,
            latency: UNREACHABLE_LATENCY,
            bandwidth_mbps: 0.0,
            packet_loss_percent: 100.0,
            last_probe,
        }
    }

    /// Milliseconds since the Unix epoch of the last probe.
    pub fn last_probe_unix_ms(&self) -> Option<u64> {
        self.last_probe.map(|t| {
            t.duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64
        })
    }
}

/// A single ranked transport tier.
pub struct Link {
    name: String,
    priority: u32,
    kind: TierKind,
    nominal: NominalProfile,
    probe_timeout: Duration,
    degraded_latency: Duration,
    probe: Arc<dyn Probe>,
    metrics: ArcSwap<LinkMetrics>,
    /// Forced probe outcome (0 = none, otherwise a LinkStatus discriminant).
    forced: AtomicU8,
}

impl Link {
    /// Create a new link. The probe timeout defaults to 3x nominal latency.
    pub fn new(
        name: impl Into<String>,
        priority: u32,
        kind: TierKind,
        nominal: NominalProfile,
        probe: Arc<dyn Probe>,
    ) -> Self {
        let probe_timeout = (nominal.latency * 3).max(MIN_PROBE_TIMEOUT);
        Self {
            name: name.into(),
            priority,
            kind,
            nominal,
            probe_timeout,
            degraded_latency: nominal.latency * 2,
            probe,
            metrics: ArcSwap::from_pointee(LinkMetrics::unreachable(None)),
            forced: AtomicU8::new(0),
        }
    }

    /// Override the probe timeout.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Latency above `nominal * factor` classifies a successful probe as Degraded.
    pub fn with_degraded_factor(mut self, factor: f64) -> Self {
        self.degraded_latency = self.nominal.latency.mul_f64(factor.max(1.0));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn kind(&self) -> TierKind {
        self.kind
    }

    pub fn nominal(&self) -> NominalProfile {
        self.nominal
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Cached metrics from the last health check.
    pub fn metrics(&self) -> Arc<LinkMetrics> {
        self.metrics.load_full()
    }

    /// Cached status from the last health check.
    pub fn status(&self) -> LinkStatus {
        self.metrics.load().status
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == LinkStatus::Healthy
    }

    /// Latest successful round trip, or [`UNREACHABLE_LATENCY`].
    pub fn measure_latency(&self) -> Duration {
        let metrics = self.metrics.load();
        match metrics.status {
            LinkStatus::Unhealthy => UNREACHABLE_LATENCY,
            _ => metrics.latency,
        }
    }

    /// Force the outcome of subsequent health checks until cleared.
    pub fn force_status(&self, status: LinkStatus) {
        tracing::info!(link = %self.name, status = %status, "Link status override set");
        self.forced.store(status as u8, Ordering::Release);
    }

    /// Return to the real probe.
    pub fn clear_override(&self) {
        if self.forced.swap(0, Ordering::AcqRel) != 0 {
            tracing::info!(link = %self.name, "Link status override cleared");
        }
    }

    pub fn forced_status(&self) -> Option<LinkStatus> {
        LinkStatus::from_override(self.forced.load(Ordering::Acquire))
    }

    /// Run one bounded probe and cache the outcome. Never fails.
    ///
    /// Returns true if the link is Healthy afterwards.
    pub async fn health_check(&self) -> bool {
        let now = SystemTime::now();
        let metrics = match self.forced_status() {
            Some(status) => self.forced_metrics(status, now),
            None => {
                let started = Instant::now();
                match self.run_probe().await {
                    Ok(sample) => self.classify(sample, started.elapsed(), now),
                    Err(e) => {
                        tracing::warn!(link = %self.name, error = %e, "Link health check failed");
                        LinkMetrics::unreachable(Some(now))
                    }
                }
            }
        };

        let previous = self.metrics.swap(Arc::new(metrics));
        let current = self.status();
        if previous.status != current {
            tracing::info!(
                link = %self.name,
                from = %previous.status,
                to = %current,
                "Link status changed"
            );
        }
        current == LinkStatus::Healthy
    }

    async fn run_probe(&self) -> Result<ProbeSample, ProbeError> {
        let probe = AssertUnwindSafe(self.probe.probe()).catch_unwind();
        match time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ProbeError::Panicked),
            Err(_) => Err(ProbeError::Timeout(self.probe_timeout)),
        }
    }

    fn classify(&self, sample: ProbeSample, elapsed: Duration, now: SystemTime) -> LinkMetrics {
        let latency = sample.latency.unwrap_or(elapsed);
        let status = if latency > self.degraded_latency {
            LinkStatus::Degraded
        } else {
            LinkStatus::Healthy
        };
        LinkMetrics {
            status,
            latency,
            bandwidth_mbps: sample.bandwidth_mbps.unwrap_or(self.nominal.bandwidth_mbps),
            packet_loss_percent: sample.packet_loss_percent,
            last_probe: Some(now),
        }
    }

    fn forced_metrics(&self, status: LinkStatus, now: SystemTime) -> LinkMetrics {
        match status {
            LinkStatus::Unhealthy => LinkMetrics::unreachable(Some(now)),
            _ => LinkMetrics {
                status,
                latency: self.nominal.latency,
                bandwidth_mbps: self.nominal.bandwidth_mbps,
                packet_loss_percent: 0.0,
                last_probe: Some(now),
            },
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("kind", &self.kind)
            .field("status", &self.status())
            .field("probe", &self.probe)
            .finish()
    }
}
