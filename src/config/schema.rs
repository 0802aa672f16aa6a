//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Well-known ICAP port, used when neither the file nor the environment set one.
pub const DEFAULT_ICAP_PORT: u16 = 1344;

/// Root configuration for the adaptation service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Service identity and classification strategy.
    pub service: IcapServiceConfig,

    /// Size limits applied while reading ICAP messages.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:1344").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{DEFAULT_ICAP_PORT}"),
            max_connections: 1024,
        }
    }
}

/// Which URL classification strategy the decision engine uses.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Origin-specific URL grammars. Self-contained.
    #[default]
    Grammar,
    /// Path substring tests. Relies on the proxy allow-listing origins.
    Substring,
}

/// Static identity of the ICAP service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IcapServiceConfig {
    /// Value of the `ISTag` header, sent unquoted here and quoted on the wire.
    pub istag: String,

    /// Value of the `Service` header.
    pub name: String,

    /// Classification strategy, fixed for the lifetime of the process.
    pub classifier: ClassifierKind,
}

impl Default for IcapServiceConfig {
    fn default() -> Self {
        Self {
            istag: "authstrip-1".to_string(),
            name: "authstrip credential stripper".to_string(),
            classifier: ClassifierKind::Grammar,
        }
    }
}

/// Size limits for ICAP and encapsulated HTTP messages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of the ICAP head and of the encapsulated HTTP head, each.
    pub max_header_bytes: usize,

    /// Maximum size of an encapsulated body buffered for echoing.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: 64 * 1024,
            max_body_bytes: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Idle time allowed between requests on a persistent connection.
    pub idle_secs: u64,

    /// How long in-flight connections may drain after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            idle_secs: 60,
            shutdown_grace_secs: 10,
        }
    }
}

/// Output format of the process log.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where decision lines are written.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecisionLogTarget {
    /// As `tracing` events on the `authstrip::decision` target.
    #[default]
    Tracing,
    Stdout,
    Stderr,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Process log format.
    pub log_format: LogFormat,

    /// Sink for per-decision lines.
    pub decision_log: DecisionLogTarget,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            decision_log: DecisionLogTarget::Tracing,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
