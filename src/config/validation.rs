//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce tier invariants (non-empty set, unique priorities and names)
//! - Validate value ranges (intervals > 0, thresholds in range)
//! - Check probe targets are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControllerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::{HashMap, HashSet};

use axum::http::Uri;
use thiserror::Error;

use crate::config::schema::{ControllerConfig, ProbeSpec};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("at least one link must be configured")]
    NoLinks,

    #[error("links '{first}' and '{second}' share priority {priority}")]
    DuplicatePriority {
        priority: u32,
        first: String,
        second: String,
    },

    #[error("link name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("link #{0} has an empty name")]
    EmptyName(usize),

    #[error("link '{0}': nominal latency must be > 0")]
    ZeroLatency(String),

    #[error("link '{0}': probe timeout must be > 0")]
    ZeroTimeout(String),

    #[error("link '{link}': {reason}")]
    InvalidProbe { link: String, reason: String },

    #[error("monitor interval must be > 0")]
    ZeroInterval,

    #[error("degraded latency factor must be >= 1.0 (got {0})")]
    DegradedFactor(f64),

    #[error("KPI {name} out of range: {value}")]
    KpiOutOfRange { name: &'static str, value: f64 },
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ControllerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.links.is_empty() {
        errors.push(ValidationError::NoLinks);
    }

    let mut priorities: HashMap<u32, &str> = HashMap::new();
    let mut names: HashSet<&str> = HashSet::new();

    for (idx, link) in config.links.iter().enumerate() {
        if link.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName(idx));
        } else if !names.insert(link.name.as_str()) {
            errors.push(ValidationError::DuplicateName(link.name.clone()));
        }

        if let Some(first) = priorities.insert(link.priority, link.name.as_str()) {
            errors.push(ValidationError::DuplicatePriority {
                priority: link.priority,
                first: first.to_string(),
                second: link.name.clone(),
            });
        }

        if link.nominal_latency_ms == 0 {
            errors.push(ValidationError::ZeroLatency(link.name.clone()));
        }

        if link.probe_timeout_ms == Some(0) {
            errors.push(ValidationError::ZeroTimeout(link.name.clone()));
        }

        if let Some(reason) = check_probe(&link.probe) {
            errors.push(ValidationError::InvalidProbe {
                link: link.name.clone(),
                reason,
            });
        }
    }

    if config.monitor.interval_ms == 0 {
        errors.push(ValidationError::ZeroInterval);
    }

    if !(config.monitor.degraded_latency_factor >= 1.0) {
        errors.push(ValidationError::DegradedFactor(config.monitor.degraded_latency_factor));
    }

    let kpi = &config.kpi;
    if !(0.0..=100.0).contains(&kpi.availability_percent) {
        errors.push(ValidationError::KpiOutOfRange {
            name: "availability_percent",
            value: kpi.availability_percent,
        });
    }
    if !(kpi.latency_ms > 0.0) {
        errors.push(ValidationError::KpiOutOfRange {
            name: "latency_ms",
            value: kpi.latency_ms,
        });
    }
    if !(kpi.failover_time_secs > 0.0) {
        errors.push(ValidationError::KpiOutOfRange {
            name: "failover_time_secs",
            value: kpi.failover_time_secs,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_probe(spec: &ProbeSpec) -> Option<String> {
    match spec {
        ProbeSpec::Tcp { address } => {
            if address.rsplit_once(':').and_then(|(_, port)| port.parse::<u16>().ok()).is_none() {
                Some(format!("TCP probe address '{}' must be host:port", address))
            } else {
                None
            }
        }
        ProbeSpec::Http { url } => match url.parse::<Uri>() {
            Ok(uri) if uri.host().is_some() => None,
            Ok(_) => Some(format!("HTTP probe URL '{}' has no host", url)),
            Err(e) => Some(format!("invalid HTTP probe URL '{}': {}", url, e)),
        },
        ProbeSpec::Static { bandwidth_mbps, .. } if *bandwidth_mbps < 0.0 => {
            Some("static probe bandwidth must be >= 0".to_string())
        }
        ProbeSpec::Simulated { failure_rate, .. } if !(0.0..=1.0).contains(failure_rate) => {
            Some(format!("simulated failure rate {} not in [0, 1]", failure_rate))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LinkConfig;
    use crate::link::TierKind;

    fn link(name: &str, priority: u32) -> LinkConfig {
        LinkConfig {
            name: name.to_string(),
            priority,
            kind: TierKind::Other,
            nominal_latency_ms: 10,
            nominal_bandwidth_mbps: 1.0,
            probe_timeout_ms: None,
            probe: ProbeSpec::Tcp {
                address: "127.0.0.1:80".to_string(),
            },
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ControllerConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_links() {
        let config = ControllerConfig {
            links: Vec::new(),
            ..Default::default()
        };
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::NoLinks]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut bad_probe = link("c", 3);
        bad_probe.probe = ProbeSpec::Tcp {
            address: "no-port".to_string(),
        };
        let mut config = ControllerConfig {
            links: vec![link("a", 1), link("a", 1), bad_probe],
            ..Default::default()
        };
        config.monitor.interval_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateName("a".to_string())));
        assert!(errors.contains(&ValidationError::DuplicatePriority {
            priority: 1,
            first: "a".to_string(),
            second: "a".to_string(),
        }));
        assert!(errors.contains(&ValidationError::ZeroInterval));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidProbe { link, .. } if link == "c")));
    }

    #[test]
    fn test_kpi_ranges() {
        let mut config = ControllerConfig::default();
        config.kpi.availability_percent = 120.0;
        config.kpi.latency_ms = 0.0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_http_probe_needs_host() {
        let mut l = link("web", 1);
        l.probe = ProbeSpec::Http {
            url: "/health".to_string(),
        };
        let config = ControllerConfig {
            links: vec![l],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
