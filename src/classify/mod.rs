//! Content-addressable URL classification.
//!
//! # Data Flow
//! ```text
//! Carried request target (TargetUrl: parsed URL plus the text as sent)
//!     → Classifier::is_content_addressable
//!         grammar.rs   (origin-specific rule table, default)
//!         substring.rs (path markers, needs proxy allow-list)
//!     → bool
//! ```
//!
//! # Design Decisions
//! - Strategy picked once at startup, never per request
//! - Rule tables are static and immutable; safe for concurrent reads
//! - Only scheme, host and path are ever inspected
//! - Grammars match the client's spelling; `url` normalization never widens a rule

pub mod grammar;
pub mod substring;
pub mod target;

use std::sync::Arc;

use crate::config::ClassifierKind;

pub use grammar::GrammarClassifier;
pub use substring::SubstringClassifier;
pub use target::TargetUrl;

/// Decides whether a URL names an immutable, hash-addressed blob.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Returns true if the target is a content-addressable blob fetch from a known origin.
    fn is_content_addressable(&self, target: &TargetUrl) -> bool;
}

/// Build the classifier selected by configuration.
pub fn from_kind(kind: ClassifierKind) -> Arc<dyn Classifier> {
    match kind {
        ClassifierKind::Grammar => Arc::new(GrammarClassifier::new()),
        ClassifierKind::Substring => {
            tracing::warn!(
                "Substring classifier selected; credentials are stripped for any host, \
                 so the proxy must only send allow-listed origins to this service"
            );
            Arc::new(SubstringClassifier::new())
        }
    }
}
