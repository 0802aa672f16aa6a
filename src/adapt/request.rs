//! Request-scoped adaptation types.
//!
//! # Responsibilities
//! - Model the inbound adaptation call (method, 204 permission, carried request)
//! - Resolve the carried request target to an absolute URL, or mark it unparseable
//! - Remove the credential header in place
//!
//! # Design Decisions
//! - An unparseable target is kept as raw text and never classified
//! - Headers keep their original lines and order; see `headers.rs`

use http::header::{AUTHORIZATION, HOST};
use http::Method;
use url::Url;

use super::HeaderFields;
use crate::classify::TargetUrl;

/// ICAP method of an adaptation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdaptationMethod {
    /// Capability query.
    Options,
    /// Request modification.
    Reqmod,
    /// Any other token, including `RESPMOD`.
    Other(String),
}

impl AdaptationMethod {
    /// Parse a method token. ICAP methods are case-sensitive.
    pub fn parse(token: &str) -> Self {
        match token {
            "OPTIONS" => Self::Options,
            "REQMOD" => Self::Reqmod,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Options => "OPTIONS",
            Self::Reqmod => "REQMOD",
            Self::Other(token) => token,
        }
    }

    /// Bounded label for metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::Reqmod => "REQMOD",
            Self::Other(_) => "other",
        }
    }
}

impl std::fmt::Display for AdaptationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The HTTP request embedded in a REQMOD call.
#[derive(Debug, Clone)]
pub struct CarriedRequest {
    method: Method,
    target: String,
    version: String,
    resolved: Option<TargetUrl>,
    /// Header fields, mutated in place by the decision engine.
    pub headers: HeaderFields,
}

impl CarriedRequest {
    /// Build a carried request, resolving `target` against the `Host` header if needed.
    pub fn new(
        method: Method,
        target: impl Into<String>,
        version: impl Into<String>,
        headers: HeaderFields,
    ) -> Self {
        let target = target.into();
        let resolved = resolve_target(&target, &headers);
        Self {
            method,
            target,
            version: version.into(),
            resolved,
            headers,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request target exactly as received.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Absolute target, or `None` when the target could not be parsed.
    pub fn resolved(&self) -> Option<&TargetUrl> {
        self.resolved.as_ref()
    }

    /// Normalized absolute URL, or `None` when the target could not be parsed.
    pub fn url(&self) -> Option<&Url> {
        self.resolved.as_ref().map(TargetUrl::url)
    }

    /// Remove every `Authorization` field. Returns how many were removed.
    pub fn strip_credentials(&mut self) -> usize {
        self.headers.remove(AUTHORIZATION)
    }
}

/// Absolute-form targets parse directly; origin-form targets are joined to
/// `Host` with scheme `http`. Anything without a host is unparseable.
fn resolve_target(target: &str, headers: &HeaderFields) -> Option<TargetUrl> {
    if target.starts_with('/') {
        let host = headers.get(HOST)?.to_str().ok()?;
        return TargetUrl::parse(&format!("http://{host}{target}"));
    }
    TargetUrl::parse(target)
}

/// One inbound adaptation call.
#[derive(Debug, Clone)]
pub struct AdaptationRequest {
    pub method: AdaptationMethod,
    /// The client sent `Allow: 204` (or equivalent) and accepts a no-content short-circuit.
    pub allows_204: bool,
    pub carried: Option<CarriedRequest>,
}

impl AdaptationRequest {
    pub fn new(method: AdaptationMethod, allows_204: bool, carried: Option<CarriedRequest>) -> Self {
        Self {
            method,
            allows_204,
            carried,
        }
    }
}
