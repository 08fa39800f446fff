//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ControllerConfig (validated, immutable)
//!     → links + controller settings built once at startup
//! ```
//!
//! # Design Decisions
//! - The tier set is fixed for the process lifetime; changing it means a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ControllerConfig;
pub use schema::LinkConfig;
pub use schema::MonitorConfig;
pub use schema::ObservabilityConfig;
pub use schema::AdminConfig;
pub use schema::ProbeSpec;
