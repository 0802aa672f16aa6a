//! Adaptation outcomes and the capabilities this service advertises.

/// Terminal result of one adaptation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdaptationOutcome {
    /// Answer to a capability query.
    CapabilityAdvertisement,
    /// The carried request had its credential header removed and is echoed back.
    Modified,
    /// The carried request is echoed back untouched.
    Unmodified,
    /// No modification; the client keeps its own copy.
    NoContent,
    MethodNotSupported,
}

impl AdaptationOutcome {
    /// ICAP status code.
    pub fn status_code(self) -> u16 {
        match self {
            Self::CapabilityAdvertisement | Self::Modified | Self::Unmodified => 200,
            Self::NoContent => 204,
            Self::MethodNotSupported => 405,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::CapabilityAdvertisement | Self::Modified | Self::Unmodified => "OK",
            Self::NoContent => "No Content",
            Self::MethodNotSupported => "Method Not Allowed",
        }
    }

    /// Whether the (possibly mutated) carried request goes back to the client.
    pub fn echoes_request(self) -> bool {
        matches!(self, Self::Modified | Self::Unmodified)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CapabilityAdvertisement => "capabilities",
            Self::Modified => "modified",
            Self::Unmodified => "unmodified",
            Self::NoContent => "no_content",
            Self::MethodNotSupported => "method_not_supported",
        }
    }
}

/// Values declared in a capability advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Value of the `Methods` header.
    pub methods: &'static str,
    /// Whether `Allow: 204` is declared.
    pub allow_204: bool,
    /// Preview size in bytes. Decisions use headers only, so nothing is previewed.
    pub preview_bytes: usize,
}

/// The only capability set this service ever declares.
pub const CAPABILITIES: Capabilities = Capabilities {
    methods: "REQMOD",
    allow_204: true,
    preview_bytes: 0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AdaptationOutcome::CapabilityAdvertisement.status_code(), 200);
        assert_eq!(AdaptationOutcome::Modified.status_code(), 200);
        assert_eq!(AdaptationOutcome::Unmodified.status_code(), 200);
        assert_eq!(AdaptationOutcome::NoContent.status_code(), 204);
        assert_eq!(AdaptationOutcome::MethodNotSupported.status_code(), 405);
    }

    #[test]
    fn only_pass_through_outcomes_echo() {
        assert!(AdaptationOutcome::Modified.echoes_request());
        assert!(AdaptationOutcome::Unmodified.echoes_request());
        assert!(!AdaptationOutcome::NoContent.echoes_request());
        assert!(!AdaptationOutcome::CapabilityAdvertisement.echoes_request());
        assert!(!AdaptationOutcome::MethodNotSupported.echoes_request());
    }
}
