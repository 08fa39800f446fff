//! KPI validation against a metrics snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::controller::snapshot::MetricsSnapshot;

/// KPI targets. Defaults: availability >= 99.5%, latency < 50ms, failover < 5s.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KpiThresholds {
    /// Minimum availability percentage.
    pub availability_percent: f64,

    /// Active link latency must be strictly below this.
    pub latency_ms: f64,

    /// Last failover must complete strictly below this.
    pub failover_time_secs: f64,
}

impl Default for KpiThresholds {
    fn default() -> Self {
        Self {
            availability_percent: 99.5,
            latency_ms: 50.0,
            failover_time_secs: 5.0,
        }
    }
}

/// Which KPIs are currently met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct KpiReport {
    pub availability_met: bool,
    pub latency_met: bool,
    pub failover_met: bool,
}

impl KpiReport {
    pub fn all_met(&self) -> bool {
        self.availability_met && self.latency_met && self.failover_met
    }

    /// Named view, e.g. for exporters that want a flat map.
    pub fn as_map(&self) -> BTreeMap<&'static str, bool> {
        BTreeMap::from([
            ("availability_met", self.availability_met),
            ("latency_met", self.latency_met),
            ("failover_met", self.failover_met),
        ])
    }
}

/// Compare a snapshot to thresholds.
///
/// The failover KPI is vacuously met while no failover has happened.
pub fn validate_kpis(snapshot: &MetricsSnapshot, thresholds: &KpiThresholds) -> KpiReport {
    KpiReport {
        availability_met: snapshot.availability_percent >= thresholds.availability_percent,
        latency_met: snapshot.latency_ms < thresholds.latency_ms,
        failover_met: snapshot
            .last_failover_secs
            .map_or(true, |secs| secs < thresholds.failover_time_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(availability: f64, latency_ms: f64, failover: Option<f64>) -> MetricsSnapshot {
        MetricsSnapshot {
            active_link: Some("primary".to_string()),
            active_kind: None,
            latency_ms,
            bandwidth_mbps: 100.0,
            availability_percent: availability,
            failover_count: failover.map_or(0, |_| 1),
            last_failover_secs: failover,
            degraded: false,
            uptime_secs: 10.0,
            links: Vec::new(),
        }
    }

    #[test]
    fn test_all_met() {
        let report = validate_kpis(&snapshot(100.0, 20.0, Some(0.01)), &KpiThresholds::default());
        assert!(report.all_met());
    }

    #[test]
    fn test_failover_vacuous_without_history() {
        let report = validate_kpis(&snapshot(99.9, 20.0, None), &KpiThresholds::default());
        assert!(report.failover_met);
    }

    #[test]
    fn test_thresholds_are_strict_for_latency_and_failover() {
        let report = validate_kpis(&snapshot(99.5, 50.0, Some(5.0)), &KpiThresholds::default());
        assert!(report.availability_met);
        assert!(!report.latency_met);
        assert!(!report.failover_met);
        assert!(!report.all_met());
    }

    #[test]
    fn test_map_view() {
        let report = validate_kpis(&snapshot(50.0, 20.0, None), &KpiThresholds::default());
        let map = report.as_map();
        assert_eq!(map.get("availability_met"), Some(&false));
        assert_eq!(map.get("latency_met"), Some(&true));
        assert_eq!(map.len(), 3);
    }
}
