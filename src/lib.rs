//! Tiered link resilience controller.
//!
//! Keeps a ranked set of transport tiers health-checked, designates the best
//! healthy one as active, fails over when it breaks and back when a
//! higher-priority tier recovers, and tracks availability/latency/failover KPIs.

pub mod admin;
pub mod config;
pub mod controller;
pub mod kpi;
pub mod lifecycle;
pub mod link;
pub mod observability;

pub use config::schema::ControllerConfig;
pub use controller::{ControllerError, ControllerSettings, FailoverOutcome, ResilienceController};
pub use kpi::{KpiReport, KpiThresholds};
pub use link::{Link, LinkStatus, TierKind};
