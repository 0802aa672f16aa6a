//! Origin-specific URL grammars.
//!
//! Each rule is a start-anchored regular expression describing how one
//! registry CDN lays out blob URLs. A URL is content-addressable when any
//! rule matches `scheme://host[:port]path` as the client spelled it, so
//! matching is case-sensitive on scheme and host.

use std::sync::LazyLock;

use regex::Regex;

use super::{Classifier, TargetUrl};

/// A named blob URL grammar.
struct BlobRule {
    /// Origin the rule describes (for tracing).
    name: &'static str,
    /// Compiled, start-anchored pattern.
    regex: Regex,
}

impl BlobRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("invalid blob rule pattern"),
        }
    }
}

/// Ordered rule table, built on first use and never mutated.
static BLOB_RULES: LazyLock<Vec<BlobRule>> = LazyLock::new(|| {
    vec![
        // Quay CDN, optionally sharded as cdn01..cdn99
        BlobRule::new(
            "quay",
            r"^https://cdn(?:[0-9]{2})?\.quay\.io/.+/sha256/.+/[a-f0-9]{64}",
        ),
        // Docker Hub blobs served straight from R2
        BlobRule::new(
            "docker-r2",
            r"^https://docker-images-prod\.[a-f0-9]{32}\.r2\.cloudflarestorage\.com/registry-v2/docker/registry/v2/blobs/sha256/[a-f0-9]{2}/[a-f0-9]{64}/data",
        ),
        // Docker Hub blobs behind Cloudflare
        BlobRule::new(
            "docker-cloudflare",
            r"^https://production\.cloudflare\.docker\.com/registry-v2/docker/registry/v2/blobs/sha256/[a-f0-9]{2}/[a-f0-9]{64}/data",
        ),
    ]
});

/// Classifier matching URLs against the known CDN blob grammars.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarClassifier;

impl GrammarClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for GrammarClassifier {
    fn is_content_addressable(&self, target: &TargetUrl) -> bool {
        let subject = target.match_form();
        match BLOB_RULES.iter().find(|rule| rule.regex.is_match(subject)) {
            Some(rule) => {
                tracing::trace!(rule = rule.name, "Blob rule matched");
                true
            }
            None => false,
        }
    }
}
