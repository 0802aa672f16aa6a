//! Adaptation decision subsystem.
//!
//! # Data Flow
//! ```text
//! AdaptationRequest (method, Allow: 204, carried HTTP request)
//!     → engine.rs (state machine, classifier query)
//!     → carried request mutated in place on a blob match
//!     → AdaptationOutcome (status code, echo or not)
//!     → decision log line
//! ```

pub mod engine;
pub mod headers;
pub mod outcome;
pub mod request;

pub use engine::DecisionEngine;
pub use headers::{HeaderField, HeaderFields};
pub use outcome::{AdaptationOutcome, Capabilities, CAPABILITIES};
pub use request::{AdaptationMethod, AdaptationRequest, CarriedRequest};
