//! Adaptation decision engine.
//!
//! # Decision Flow
//! ```text
//! OPTIONS                       → CapabilityAdvertisement
//! REQMOD, no carried request    → Unmodified
//! REQMOD, blob URL              → strip Authorization → Modified
//! REQMOD, other URL, Allow: 204 → NoContent
//! REQMOD, other URL             → Unmodified
//! anything else                 → MethodNotSupported
//! ```
//!
//! # Design Decisions
//! - Single synchronous pass; no I/O, no shared mutable state
//! - Unparseable targets never match (fail toward pass-through)
//! - Every decision is logged exactly once

use std::sync::Arc;

use crate::classify::Classifier;
use crate::observability::{metrics, DecisionLogger};

use super::{AdaptationMethod, AdaptationOutcome, AdaptationRequest};

/// Decides the outcome of adaptation calls. Shared across connections.
#[derive(Debug)]
pub struct DecisionEngine {
    classifier: Arc<dyn Classifier>,
    logger: DecisionLogger,
}

impl DecisionEngine {
    pub fn new(classifier: Arc<dyn Classifier>, logger: DecisionLogger) -> Self {
        Self { classifier, logger }
    }

    /// Decide the outcome, mutating the carried request in place when it is modified.
    pub fn decide(&self, request: &mut AdaptationRequest) -> AdaptationOutcome {
        let outcome = self.evaluate(request);

        self.logger.log_decision(
            request.method.as_str(),
            outcome.status_code(),
            request.carried.as_ref(),
        );
        metrics::record_decision(&request.method, outcome);

        outcome
    }

    fn evaluate(&self, request: &mut AdaptationRequest) -> AdaptationOutcome {
        match request.method {
            AdaptationMethod::Options => AdaptationOutcome::CapabilityAdvertisement,
            AdaptationMethod::Reqmod => {
                let Some(carried) = request.carried.as_mut() else {
                    return AdaptationOutcome::Unmodified;
                };

                let addressable = carried
                    .resolved()
                    .is_some_and(|target| self.classifier.is_content_addressable(target));

                if addressable {
                    let removed = carried.strip_credentials();
                    tracing::debug!(removed, "Stripped credentials from blob request");
                    AdaptationOutcome::Modified
                } else if request.allows_204 {
                    AdaptationOutcome::NoContent
                } else {
                    AdaptationOutcome::Unmodified
                }
            }
            AdaptationMethod::Other(_) => AdaptationOutcome::MethodNotSupported,
        }
    }
}
