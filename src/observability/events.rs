//! Failover events and their observers.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why a failover happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverReason {
    /// The active link stopped being healthy.
    ActiveUnhealthy,
    /// A higher-priority link recovered.
    Failback,
    /// Requested from outside the monitor loop.
    Manual,
}

impl fmt::Display for FailoverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailoverReason::ActiveUnhealthy => "active_unhealthy",
            FailoverReason::Failback => "failback",
            FailoverReason::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Emitted once per completed failover.
#[derive(Debug, Clone, PartialEq)]
pub struct FailoverEvent {
    pub from: Option<String>,
    pub to: String,
    pub duration: Duration,
    /// Failover count after this event.
    pub failover_count: u64,
    pub reason: FailoverReason,
}

/// Receives failover events. Called while the controller holds its write
/// lock, so implementations must return quickly.
pub trait FailoverObserver: Send + Sync {
    fn on_failover(&self, event: &FailoverEvent);
}
