//! Tiered link resilience controller.
//!
//! # Data Flow
//! ```text
//! initialize():
//!     probe all links concurrently
//!     → selection.rs (best healthy, else lowest priority)
//!     → publish ControllerState
//!
//! tick() (monitor.rs drives it on a fixed cadence):
//!     probe all links concurrently
//!     → active unhealthy?            → failover (reselect)
//!     → higher-priority link healthy? → failover (failback)
//!     → no healthy link?             → accumulate downtime
//!
//! metrics():
//!     load ControllerState + cached link metrics → snapshot.rs
//! ```
//!
//! # Design Decisions
//! - State is published through an ArcSwap; readers never take a lock
//! - Writers serialize on one async mutex, so no update to the active link is lost
//! - Total outage keeps the current active link and marks the controller degraded
//! - Redirecting real traffic is left to whoever consumes the active link

pub mod monitor;
pub mod selection;
pub mod snapshot;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::ControllerConfig;
use crate::kpi::{self, KpiReport, KpiThresholds};
use crate::lifecycle::Shutdown;
use crate::link::probe::build_probe;
use crate::link::{Link, NominalProfile};
use crate::observability::{FailoverEvent, FailoverObserver, FailoverReason};

use self::snapshot::{availability_percent, LinkReport, MetricsSnapshot};

/// Errors reported by the controller.
#[derive(Debug, Error, PartialEq)]
pub enum ControllerError {
    #[error("at least one link is required")]
    NoLinks,

    #[error("links '{first}' and '{second}' share priority {priority}")]
    DuplicatePriority {
        priority: u32,
        first: String,
        second: String,
    },

    #[error("link name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("link '{link}' has an invalid probe: {reason}")]
    InvalidProbe { link: String, reason: String },

    #[error("monitor interval must be > 0")]
    ZeroInterval,

    #[error("unknown link '{0}'")]
    UnknownLink(String),

    #[error("monitor loop is already running")]
    AlreadyRunning,

    #[error("controller has been stopped")]
    Stopped,
}

/// Runtime settings derived from configuration.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Monitor tick cadence.
    pub monitor_interval: Duration,
    /// Failovers slower than this are logged as errors.
    pub failover_time_threshold: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            monitor_interval: Duration::from_secs(2),
            failover_time_threshold: Duration::from_secs(5),
        }
    }
}

/// Mutable controller state. Replaced wholesale on every write.
#[derive(Debug, Clone, Default)]
struct ControllerState {
    active: Option<Arc<Link>>,
    failover_count: u64,
    last_failover: Option<Duration>,
    degraded: bool,
    started_at: Option<Instant>,
    downtime: Duration,
    last_tick: Option<Instant>,
}

/// Result of a failover decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FailoverOutcome {
    /// The active link was swapped (possibly to the same link).
    Switched {
        from: Option<String>,
        to: String,
        duration_secs: f64,
    },
    /// No healthy link existed; the active link was kept.
    Retained { active: String },
}

/// What a monitor tick did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickReport {
    /// True if the controller was stopped and the tick did nothing.
    pub skipped: bool,
    pub healthy_links: usize,
    pub outcome: Option<FailoverOutcome>,
}

/// Keeps the best healthy tier active.
pub struct ResilienceController {
    links: Vec<Arc<Link>>,
    settings: ControllerSettings,
    state: ArcSwap<ControllerState>,
    write_lock: Mutex<()>,
    observers: Vec<Arc<dyn FailoverObserver>>,
    shutdown: Shutdown,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl ResilienceController {
    /// Create a controller over a fixed set of links.
    ///
    /// Fails if the set is empty, priorities/names are not unique, or the
    /// monitor interval is zero.
    pub fn new(links: Vec<Link>, settings: ControllerSettings) -> Result<Self, ControllerError> {
        if links.is_empty() {
            return Err(ControllerError::NoLinks);
        }
        if settings.monitor_interval.is_zero() {
            return Err(ControllerError::ZeroInterval);
        }

        let mut by_priority: HashMap<u32, &str> = HashMap::new();
        let mut names: HashSet<&str> = HashSet::new();
        for link in &links {
            if let Some(first) = by_priority.insert(link.priority(), link.name()) {
                return Err(ControllerError::DuplicatePriority {
                    priority: link.priority(),
                    first: first.to_string(),
                    second: link.name().to_string(),
                });
            }
            if !names.insert(link.name()) {
                return Err(ControllerError::DuplicateName(link.name().to_string()));
            }
        }

        let mut links: Vec<Arc<Link>> = links.into_iter().map(Arc::new).collect();
        links.sort_by_key(|l| l.priority());

        Ok(Self {
            links,
            settings,
            state: ArcSwap::from_pointee(ControllerState::default()),
            write_lock: Mutex::new(()),
            observers: Vec::new(),
            shutdown: Shutdown::new(),
            monitor: Mutex::new(None),
        })
    }

    /// Build links and settings from a validated configuration.
    pub fn from_config(config: &ControllerConfig) -> Result<Self, ControllerError> {
        let mut links = Vec::with_capacity(config.links.len());
        for lc in &config.links {
            let probe = build_probe(&lc.probe).map_err(|reason| ControllerError::InvalidProbe {
                link: lc.name.clone(),
                reason,
            })?;
            let nominal = NominalProfile {
                latency: Duration::from_millis(lc.nominal_latency_ms),
                bandwidth_mbps: lc.nominal_bandwidth_mbps,
            };
            let mut link = Link::new(lc.name.clone(), lc.priority, lc.kind, nominal, probe)
                .with_degraded_factor(config.monitor.degraded_latency_factor);
            if let Some(ms) = lc.probe_timeout_ms {
                link = link.with_probe_timeout(Duration::from_millis(ms));
            }
            links.push(link);
        }

        let settings = ControllerSettings {
            monitor_interval: config.monitor.interval(),
            failover_time_threshold: Duration::try_from_secs_f64(config.kpi.failover_time_secs)
                .unwrap_or(ControllerSettings::default().failover_time_threshold),
        };
        Self::new(links, settings)
    }

    /// Register an observer for failover events.
    pub fn with_observer(mut self, observer: Arc<dyn FailoverObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Links ordered by priority.
    pub fn links(&self) -> &[Arc<Link>] {
        &self.links
    }

    pub fn link(&self, name: &str) -> Option<&Arc<Link>> {
        self.links.iter().find(|l| l.name() == name)
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Current active link; `None` only before `initialize()`.
    pub fn active(&self) -> Option<Arc<Link>> {
        self.state.load().active.clone()
    }

    pub fn failover_count(&self) -> u64 {
        self.state.load().failover_count
    }

    pub fn is_degraded(&self) -> bool {
        self.state.load().degraded
    }

    /// Probe every link concurrently. Returns how many are healthy.
    pub async fn probe_all(&self) -> usize {
        let results = join_all(self.links.iter().map(|link| link.health_check())).await;
        results.into_iter().filter(|healthy| *healthy).count()
    }

    /// Probe all links and pick the first active link.
    ///
    /// Picks the lowest-priority healthy link, or the lowest-priority link
    /// overall (degraded) when none is healthy. Does nothing once an active
    /// link exists; later changes go through [`failover`](Self::failover).
    pub async fn initialize(&self) {
        if self.active().is_some() {
            return;
        }
        let healthy = self.probe_all().await;

        let _guard = self.write_lock.lock().await;
        if self.state.load().active.is_some() {
            return;
        }
        let (active, degraded) = match selection::select(&self.links) {
            Some(selection) => (selection.candidate.clone(), selection.degraded),
            None => (self.last_resort(), true),
        };

        let now = Instant::now();
        let mut next = (*self.state.load_full()).clone();
        next.active = Some(active.clone());
        next.degraded = degraded;
        next.started_at = Some(now);
        next.last_tick = Some(now);
        next.downtime = Duration::ZERO;
        self.state.store(Arc::new(next));

        if degraded {
            tracing::warn!(
                link = %active.name(),
                "No healthy link found, using lowest-priority link as last resort"
            );
        } else {
            tracing::info!(
                link = %active.name(),
                priority = active.priority(),
                healthy_links = healthy,
                "Selected active link"
            );
        }
    }

    /// Run one monitor tick: probe, fail over or back, account downtime.
    ///
    /// Does nothing once the controller has been stopped.
    pub async fn tick(&self) -> TickReport {
        if self.shutdown.is_triggered() {
            return TickReport {
                skipped: true,
                ..Default::default()
            };
        }

        let healthy_links = self.probe_all().await;

        if self.shutdown.is_triggered() {
            // Probes that raced with stop() are discarded.
            return TickReport {
                skipped: true,
                healthy_links,
                outcome: None,
            };
        }

        let outcome = match self.active() {
            None => {
                self.initialize().await;
                None
            }
            Some(active) if !active.is_healthy() => {
                tracing::warn!(link = %active.name(), status = %active.status(), "Active link failed");
                Some(self.switch(None, FailoverReason::ActiveUnhealthy).await)
            }
            Some(active) => match selection::better_than(&self.links, &active).cloned() {
                Some(better) => {
                    tracing::info!(link = %better.name(), "Higher-priority link available");
                    Some(self.switch(Some(better), FailoverReason::Failback).await)
                }
                None => None,
            },
        };

        self.account_tick(healthy_links == 0).await;

        TickReport {
            skipped: false,
            healthy_links,
            outcome,
        }
    }

    /// Fail over to `target`, or reselect the best link when `None`.
    ///
    /// Uses cached link status; call [`tick`](Self::tick) for fresh probes.
    pub async fn failover(&self, target: Option<&str>) -> Result<FailoverOutcome, ControllerError> {
        let target = match target {
            Some(name) => Some(
                self.link(name)
                    .cloned()
                    .ok_or_else(|| ControllerError::UnknownLink(name.to_string()))?,
            ),
            None => None,
        };
        Ok(self.switch(target, FailoverReason::Manual).await)
    }

    async fn switch(&self, target: Option<Arc<Link>>, reason: FailoverReason) -> FailoverOutcome {
        let start = Instant::now();
        let _guard = self.write_lock.lock().await;
        let current = self.state.load_full();

        let next_active = match target {
            Some(link) => link,
            None => match selection::best_available(&self.links) {
                Some(link) => link.clone(),
                None => match &current.active {
                    Some(active) => {
                        if !current.degraded {
                            let mut next = (*current).clone();
                            next.degraded = true;
                            self.state.store(Arc::new(next));
                        }
                        tracing::warn!(
                            link = %active.name(),
                            "No healthy link available, keeping current active link"
                        );
                        return FailoverOutcome::Retained {
                            active: active.name().to_string(),
                        };
                    }
                    None => self.last_resort(),
                },
            },
        };

        let duration = start.elapsed();
        let from = current.active.as_ref().map(|l| l.name().to_string());

        let mut next = (*current).clone();
        next.active = Some(next_active.clone());
        next.failover_count += 1;
        next.last_failover = Some(duration);
        next.degraded = !next_active.is_healthy();
        if next.started_at.is_none() {
            next.started_at = Some(start);
            next.last_tick = Some(start);
        }
        let failover_count = next.failover_count;
        self.state.store(Arc::new(next));

        tracing::info!(
            from = from.as_deref().unwrap_or("none"),
            to = %next_active.name(),
            duration_ms = duration.as_secs_f64() * 1000.0,
            failover_count,
            reason = %reason,
            "Failover completed"
        );
        if duration > self.settings.failover_time_threshold {
            tracing::error!(
                duration_ms = duration.as_secs_f64() * 1000.0,
                threshold_ms = self.settings.failover_time_threshold.as_secs_f64() * 1000.0,
                "Failover time exceeds threshold"
            );
        }

        let event = FailoverEvent {
            from: from.clone(),
            to: next_active.name().to_string(),
            duration,
            failover_count,
            reason,
        };
        for observer in &self.observers {
            observer.on_failover(&event);
        }

        FailoverOutcome::Switched {
            from,
            to: event.to,
            duration_secs: duration.as_secs_f64(),
        }
    }

    async fn account_tick(&self, outage: bool) {
        let _guard = self.write_lock.lock().await;
        let now = Instant::now();
        let mut next = (*self.state.load_full()).clone();

        if outage {
            let since = next.last_tick.or(next.started_at).unwrap_or(now);
            next.downtime += now.saturating_duration_since(since);
        }
        next.last_tick = Some(now);
        next.degraded = next.active.as_ref().map_or(true, |a| !a.is_healthy());
        self.state.store(Arc::new(next));
    }

    /// Links are sorted and never empty.
    fn last_resort(&self) -> Arc<Link> {
        self.links[0].clone()
    }

    /// Snapshot of cached state. Never probes and never takes the write lock.
    pub fn metrics(&self) -> MetricsSnapshot {
        let state = self.state.load_full();
        let uptime = state.started_at.map(|t| t.elapsed()).unwrap_or_default();
        let active = state.active.as_ref();

        let links = self
            .links
            .iter()
            .map(|link| {
                let is_active = active.is_some_and(|a| Arc::ptr_eq(a, link));
                LinkReport::from_link(link, is_active)
            })
            .collect();

        let (latency_ms, bandwidth_mbps) = match active {
            Some(link) => {
                let metrics = link.metrics();
                (metrics.latency.as_secs_f64() * 1000.0, metrics.bandwidth_mbps)
            }
            None => (crate::link::UNREACHABLE_LATENCY.as_secs_f64() * 1000.0, 0.0),
        };

        MetricsSnapshot {
            active_link: active.map(|l| l.name().to_string()),
            active_kind: active.map(|l| l.kind()),
            latency_ms,
            bandwidth_mbps,
            availability_percent: availability_percent(
                uptime.as_secs_f64(),
                state.downtime.as_secs_f64(),
            ),
            failover_count: state.failover_count,
            last_failover_secs: state.last_failover.map(|d| d.as_secs_f64()),
            degraded: state.degraded,
            uptime_secs: uptime.as_secs_f64(),
            links,
        }
    }

    /// Compare the current snapshot to KPI thresholds.
    pub fn validate_kpis(&self, thresholds: &KpiThresholds) -> KpiReport {
        kpi::validate_kpis(&self.metrics(), thresholds)
    }
}

impl std::fmt::Debug for ResilienceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceController")
            .field("links", &self.links)
            .field("active", &self.active().map(|l| l.name().to_string()))
            .field("failover_count", &self.failover_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::probe::StaticProbe;
    use crate::link::{LinkStatus, TierKind};

    fn link(name: &str, priority: u32) -> Link {
        let probe = Arc::new(StaticProbe::new(Duration::from_millis(5), 10.0, 0.0));
        let nominal = NominalProfile {
            latency: Duration::from_millis(20),
            bandwidth_mbps: 10.0,
        };
        Link::new(name, priority, TierKind::Other, nominal, probe)
    }

    #[test]
    fn test_rejects_empty_set() {
        let err = ResilienceController::new(Vec::new(), ControllerSettings::default()).unwrap_err();
        assert_eq!(err, ControllerError::NoLinks);
    }

    #[test]
    fn test_rejects_duplicate_priority() {
        let err = ResilienceController::new(
            vec![link("a", 1), link("b", 1)],
            ControllerSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ControllerError::DuplicatePriority { priority: 1, .. }));
    }

    #[test]
    fn test_rejects_duplicate_name() {
        let err = ResilienceController::new(
            vec![link("a", 1), link("a", 2)],
            ControllerSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err, ControllerError::DuplicateName("a".to_string()));
    }

    #[test]
    fn test_links_sorted_by_priority() {
        let controller = ResilienceController::new(
            vec![link("c", 30), link("a", 10), link("b", 20)],
            ControllerSettings::default(),
        )
        .unwrap();
        let names: Vec<&str> = controller.links().iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_snapshot_before_initialize() {
        let controller =
            ResilienceController::new(vec![link("a", 1)], ControllerSettings::default()).unwrap();
        let snapshot = controller.metrics();
        assert!(snapshot.active_link.is_none());
        assert_eq!(snapshot.availability_percent, 0.0);
        assert_eq!(snapshot.failover_count, 0);
        assert_eq!(snapshot.links[0].status, LinkStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_initialize_prefers_healthy() {
        let controller = ResilienceController::new(
            vec![link("primary", 1), link("secondary", 2)],
            ControllerSettings::default(),
        )
        .unwrap();
        controller.links()[0].force_status(LinkStatus::Unhealthy);

        controller.initialize().await;
        assert_eq!(controller.active().unwrap().name(), "secondary");
        assert!(!controller.is_degraded());
        assert_eq!(controller.failover_count(), 0);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let settings = ControllerSettings {
            monitor_interval: Duration::ZERO,
            ..Default::default()
        };
        let err = ResilienceController::new(vec![link("a", 1)], settings).unwrap_err();
        assert_eq!(err, ControllerError::ZeroInterval);
    }

    #[test]
    fn test_from_config_rejects_zero_interval() {
        let mut config = ControllerConfig::default();
        config.monitor.interval_ms = 0;
        let err = ResilienceController::from_config(&config).unwrap_err();
        assert_eq!(err, ControllerError::ZeroInterval);
    }

    #[tokio::test]
    async fn test_second_initialize_is_noop() {
        let controller = ResilienceController::new(
            vec![link("primary", 1), link("secondary", 2)],
            ControllerSettings::default(),
        )
        .unwrap();
        controller.initialize().await;
        controller.failover(Some("secondary")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let uptime = controller.metrics().uptime_secs;

        controller.initialize().await;
        assert_eq!(controller.active().unwrap().name(), "secondary");
        assert_eq!(controller.failover_count(), 1);
        assert!(controller.metrics().uptime_secs >= uptime);
    }

    #[tokio::test]
    async fn test_unknown_failover_target() {
        let controller =
            ResilienceController::new(vec![link("a", 1)], ControllerSettings::default()).unwrap();
        controller.initialize().await;
        let err = controller.failover(Some("nope")).await.unwrap_err();
        assert_eq!(err, ControllerError::UnknownLink("nope".to_string()));
    }

    #[tokio::test]
    async fn test_from_default_config() {
        let controller = ResilienceController::from_config(&ControllerConfig::default()).unwrap();
        assert_eq!(controller.links().len(), 3);
        assert_eq!(controller.link("starlink").unwrap().probe_timeout(), Duration::from_secs(2));
        assert_eq!(controller.settings().monitor_interval, Duration::from_secs(2));
    }
}
