//! Transport-level errors.

/// Errors raised while reading or writing ICAP messages.
#[derive(Debug, thiserror::Error)]
pub enum IcapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed mid-message")]
    UnexpectedEof,

    #[error("malformed ICAP head: {0}")]
    MalformedHead(String),

    #[error("malformed Encapsulated header: {0}")]
    MalformedEncapsulated(String),

    #[error("malformed encapsulated HTTP head: {0}")]
    MalformedHttpHead(String),

    #[error("malformed chunked body: {0}")]
    MalformedChunk(String),

    #[error("{what} exceeds limit of {limit} bytes")]
    TooLarge { what: &'static str, limit: usize },
}

impl IcapError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::UnexpectedEof => "eof",
            Self::MalformedHead(_) => "head",
            Self::MalformedEncapsulated(_) => "encapsulated",
            Self::MalformedHttpHead(_) => "http_head",
            Self::MalformedChunk(_) => "chunk",
            Self::TooLarge { .. } => "too_large",
        }
    }

    /// Whether the peer should be told `400 Bad Request` before closing.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::UnexpectedEof)
    }
}
