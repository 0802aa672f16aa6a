//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//! Decision engine produces:
//!     → decision_log.rs (one redacted line per decision, injected sink)
//! ```
//!
//! # Design Decisions
//! - Decision lines never carry credentials or query strings
//! - Metrics are cheap (atomic increments)

pub mod decision_log;
pub mod logging;
pub mod metrics;

pub use decision_log::{DecisionLogger, DecisionSink, MemorySink, TracingSink, WriterSink};
