//! Path-substring classification.
//!
//! Broader than the grammars: any host whose path carries a digest marker
//! matches. Only sound when the proxy forwards allow-listed origins alone.

use super::{Classifier, TargetUrl};

/// Path fragments that mark a digest-addressed download.
const BLOB_MARKERS: [&str; 3] = [
    "/sha256/",
    "/blobs/sha256:",
    "/artifacts-downloads/namespaces/",
];

/// Classifier testing the URL path for digest markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringClassifier;

impl SubstringClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for SubstringClassifier {
    fn is_content_addressable(&self, target: &TargetUrl) -> bool {
        let path = target.url().path();
        BLOB_MARKERS.iter().any(|marker| path.contains(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(raw: &str) -> bool {
        SubstringClassifier::new().is_content_addressable(&TargetUrl::parse(raw).unwrap())
    }

    #[test]
    fn each_marker_matches() {
        assert!(classify("https://cdn.quay.io/repo/sha256/ab/abcdef"));
        assert!(classify("https://registry.example.com/v2/app/blobs/sha256:abcdef"));
        assert!(classify(
            "https://gitlab.example.com/artifacts-downloads/namespaces/42/projects/7"
        ));
    }

    #[test]
    fn query_is_never_inspected() {
        assert!(!classify("https://example.com/download?next=/sha256/abc"));
    }

    #[test]
    fn plain_paths_do_not_match() {
        assert!(!classify("https://example.com/some/path"));
        assert!(!classify("https://example.com/sha256"));
        assert!(!classify("https://example.com/v2/app/manifests/sha256:abc"));
    }
}
