//! ICAP request-adaptation service that removes `Authorization` from
//! content-addressed blob fetches.

// Core decision logic
pub mod adapt;
pub mod classify;

// Transport
pub mod icap;
pub mod net;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use adapt::{AdaptationOutcome, AdaptationRequest, CarriedRequest, DecisionEngine};
pub use config::ServiceConfig;
pub use icap::IcapServer;
pub use lifecycle::Shutdown;
