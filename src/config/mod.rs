//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply ICAP_PORT)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - All fields have defaults so the service runs with no file at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve_config, resolve_with_port, ConfigError};
pub use schema::{
    ClassifierKind, DecisionLogTarget, IcapServiceConfig, LimitsConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, ServiceConfig, TimeoutConfig,
};
