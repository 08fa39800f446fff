//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build links → Initialize controller → Start monitor/admin
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Trigger broadcast → Monitor loop exits → Admin server drains
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then controller, then admin surface
//! - Shutdown is idempotent; late subscribers can still poll `is_triggered`

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
