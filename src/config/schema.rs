//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the controller.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::kpi::KpiThresholds;
use crate::link::TierKind;

/// Root configuration for the link resilience controller.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Ranked transport tiers.
    pub links: Vec<LinkConfig>,

    /// Monitor loop settings.
    pub monitor: MonitorConfig,

    /// KPI targets.
    pub kpi: KpiThresholds,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            links: default_links(),
            monitor: MonitorConfig::default(),
            kpi: KpiThresholds::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Satellite primary, cellular secondary, LoRa always-on tertiary.
fn default_links() -> Vec<LinkConfig> {
    vec![
        LinkConfig {
            name: "starlink".to_string(),
            priority: 1,
            kind: TierKind::Satellite,
            nominal_latency_ms: 40,
            nominal_bandwidth_mbps: 150.0,
            probe_timeout_ms: Some(2000),
            probe: ProbeSpec::Tcp {
                address: "8.8.8.8:53".to_string(),
            },
        },
        LinkConfig {
            name: "4g".to_string(),
            priority: 2,
            kind: TierKind::Cellular,
            nominal_latency_ms: 60,
            nominal_bandwidth_mbps: 50.0,
            probe_timeout_ms: Some(3000),
            probe: ProbeSpec::Tcp {
                address: "8.8.4.4:53".to_string(),
            },
        },
        LinkConfig {
            name: "lora".to_string(),
            priority: 3,
            kind: TierKind::Lora,
            nominal_latency_ms: 200,
            nominal_bandwidth_mbps: 0.05,
            probe_timeout_ms: None,
            probe: ProbeSpec::Static {
                latency_ms: 180,
                bandwidth_mbps: 0.05,
                packet_loss_percent: 5.0,
            },
        },
    ]
}

/// A single transport tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkConfig {
    /// Unique tier identifier.
    pub name: String,

    /// Rank of the tier (lower = preferred). Must be unique.
    pub priority: u32,

    /// Physical kind of tier.
    #[serde(default)]
    pub kind: TierKind,

    /// Expected round trip when the tier works normally.
    pub nominal_latency_ms: u64,

    /// Expected bandwidth when the tier works normally.
    #[serde(default)]
    pub nominal_bandwidth_mbps: f64,

    /// Probe deadline. Defaults to 3x nominal latency.
    #[serde(default)]
    pub probe_timeout_ms: Option<u64>,

    /// How the tier is probed.
    pub probe: ProbeSpec,
}

/// Probe strategy for a tier.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeSpec {
    /// TCP connect to `host:port`.
    Tcp { address: String },

    /// HTTP GET, 2xx is success.
    Http { url: String },

    /// Always reachable with a fixed profile.
    Static {
        latency_ms: u64,
        bandwidth_mbps: f64,
        #[serde(default)]
        packet_loss_percent: f64,
    },

    /// Randomized synthetic tier.
    Simulated {
        latency_ms: u64,
        #[serde(default)]
        jitter_ms: u64,
        #[serde(default)]
        failure_rate: f64,
        bandwidth_mbps: f64,
    },
}

/// Monitor loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tick interval in milliseconds.
    pub interval_ms: u64,

    /// Latency above nominal times this factor marks a tier Degraded.
    pub degraded_latency_factor: f64,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            degraded_latency_factor: 2.0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let config = ControllerConfig::default();
        let priorities: Vec<u32> = config.links.iter().map(|l| l.priority).collect();
        assert_eq!(priorities, vec![1, 2, 3]);
        assert_eq!(config.monitor.interval(), Duration::from_secs(2));
        assert_eq!(config.links[2].kind, TierKind::Lora);
    }

    #[test]
    fn test_minimal_toml() {
        let toml_str = r#"
            [monitor]
            interval_ms = 500

            [[links]]
            name = "mesh"
            priority = 1
            kind = "mesh"
            nominal_latency_ms = 20
            probe = { type = "http", url = "http://10.0.0.1/health" }
        "#;
        let config: ControllerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.links.len(), 1);
        assert_eq!(config.links[0].kind, TierKind::Mesh);
        assert_eq!(config.links[0].probe_timeout_ms, None);
        assert_eq!(config.monitor.interval_ms, 500);
        assert_eq!(config.monitor.degraded_latency_factor, 2.0);
        assert_eq!(config.kpi.availability_percent, 99.5);
        assert!(matches!(config.links[0].probe, ProbeSpec::Http { .. }));
    }
}
