//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Controller produces:
//!     → logging.rs (structured log events)
//!     → events.rs (failover events to registered observers)
//!     → metrics.rs (gauges and counters from events and snapshots)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Observers are synchronous and must not block the failover path
//! - Metric names are stable; tiers are a label, not part of the name

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{FailoverEvent, FailoverObserver, FailoverReason};
