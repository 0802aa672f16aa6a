//! ICAP request head and `Encapsulated` parsing.
//!
//! # Responsibilities
//! - Read a CRLF-terminated head from the stream under a size limit
//! - Parse the request line and header fields
//! - Interpret `Allow`, `Preview`, `Connection` and `Encapsulated`

use std::ops::Range;

use http::HeaderMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::IcapError;
use crate::adapt::HeaderFields;

/// Read one head, up to and including the blank line that ends it.
///
/// Returns `None` on a clean EOF before any byte of a new head. Blank lines
/// preceding a head are skipped.
pub async fn read_head<R>(reader: &mut R, limit: usize, what: &'static str) -> Result<Option<Vec<u8>>, IcapError>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::new();
    loop {
        let remaining = limit.saturating_sub(head.len());
        if remaining == 0 {
            return Err(IcapError::TooLarge { what, limit });
        }

        let start = head.len();
        let n = (&mut *reader)
            .take(remaining as u64)
            .read_until(b'\n', &mut head)
            .await?;

        if n == 0 {
            return if head.is_empty() {
                Ok(None)
            } else {
                Err(IcapError::UnexpectedEof)
            };
        }
        if head.last() != Some(&b'\n') {
            return if n == remaining {
                Err(IcapError::TooLarge { what, limit })
            } else {
                Err(IcapError::UnexpectedEof)
            };
        }

        if is_blank(&head[start..]) {
            if start == 0 {
                head.clear();
                continue;
            }
            return Ok(Some(head));
        }
    }
}

fn is_blank(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

/// Split a head into lines without their CRLF / LF terminators.
pub(crate) fn lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

/// Parse `Name: value` lines up to the first empty line.
fn parse_fields<'a>(lines: impl Iterator<Item = &'a [u8]>) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    for field in &HeaderFields::parse(lines)? {
        headers.append(field.name().clone(), field.value().clone());
    }
    Ok(headers)
}

/// Parsed ICAP request line and headers.
#[derive(Debug, Clone)]
pub struct IcapRequestHead {
    pub method: String,
    pub uri: String,
    pub version: String,
    pub headers: HeaderMap,
}

impl IcapRequestHead {
    pub fn parse(bytes: &[u8]) -> Result<Self, IcapError> {
        let mut lines = lines(bytes);
        let request_line = lines.next().unwrap_or_default();
        let request_line = std::str::from_utf8(request_line)
            .map_err(|_| IcapError::MalformedHead("request line is not UTF-8".into()))?;

        let mut parts = request_line.split(' ');
        let (Some(method), Some(uri), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(IcapError::MalformedHead(format!("bad request line: {request_line}")));
        };
        if method.is_empty() || uri.is_empty() || !version.starts_with("ICAP/") {
            return Err(IcapError::MalformedHead(format!("bad request line: {request_line}")));
        }

        let headers = parse_fields(lines).map_err(IcapError::MalformedHead)?;

        Ok(Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version: version.to_string(),
            headers,
        })
    }

    /// Client listed `204` in `Allow`.
    pub fn allows_204(&self) -> bool {
        self.header_tokens("allow").any(|token| token == "204")
    }

    /// Client asked to close the connection after this exchange.
    pub fn wants_close(&self) -> bool {
        self.header_tokens("connection")
            .any(|token| token.eq_ignore_ascii_case("close"))
    }

    /// Announced preview size, if the client is sending a preview.
    pub fn preview(&self) -> Result<Option<usize>, IcapError> {
        let Some(value) = self.headers.get("preview") else {
            return Ok(None);
        };
        value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .map(Some)
            .ok_or_else(|| IcapError::MalformedHead("invalid Preview header".into()))
    }

    /// The `Encapsulated` layout, if the header is present.
    pub fn encapsulated(&self) -> Result<Option<Encapsulated>, IcapError> {
        match self.headers.get("encapsulated") {
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| IcapError::MalformedEncapsulated("not ASCII".into()))?;
                Encapsulated::parse(value).map(Some)
            }
            None => Ok(None),
        }
    }

    fn header_tokens<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
    }
}

/// One entity named in an `Encapsulated` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    ReqHdr,
    ResHdr,
    ReqBody,
    ResBody,
    OptBody,
    NullBody,
}

impl Section {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "req-hdr" => Some(Self::ReqHdr),
            "res-hdr" => Some(Self::ResHdr),
            "req-body" => Some(Self::ReqBody),
            "res-body" => Some(Self::ResBody),
            "opt-body" => Some(Self::OptBody),
            "null-body" => Some(Self::NullBody),
            _ => None,
        }
    }

    pub fn is_body(self) -> bool {
        matches!(self, Self::ReqBody | Self::ResBody | Self::OptBody | Self::NullBody)
    }
}

/// Offsets of the encapsulated HTTP sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encapsulated {
    sections: Vec<(Section, usize)>,
}

impl Encapsulated {
    /// Layout of a message with nothing encapsulated.
    pub fn null() -> Self {
        Self {
            sections: vec![(Section::NullBody, 0)],
        }
    }

    pub fn parse(value: &str) -> Result<Self, IcapError> {
        let malformed = |msg: String| IcapError::MalformedEncapsulated(msg);

        let mut sections = Vec::new();
        for entry in value.split(',').map(str::trim) {
            let (name, offset) = entry
                .split_once('=')
                .ok_or_else(|| malformed(format!("expected name=offset, got '{entry}'")))?;
            let section = Section::parse(name.trim())
                .ok_or_else(|| malformed(format!("unknown entity '{name}'")))?;
            let offset: usize = offset
                .trim()
                .parse()
                .map_err(|_| malformed(format!("bad offset in '{entry}'")))?;
            sections.push((section, offset));
        }

        let Some(&(last, _)) = sections.last() else {
            return Err(malformed("empty".into()));
        };
        if !last.is_body() {
            return Err(malformed("must end with a body entity".into()));
        }
        if sections[..sections.len() - 1].iter().any(|(s, _)| s.is_body()) {
            return Err(malformed("body entity before the end".into()));
        }
        if sections.windows(2).any(|pair| pair[0].1 >= pair[1].1) {
            return Err(malformed("offsets must increase".into()));
        }
        if sections[0].1 != 0 {
            return Err(malformed("first offset must be 0".into()));
        }

        Ok(Self { sections })
    }

    /// Total bytes of encapsulated header sections preceding the body.
    pub fn header_bytes(&self) -> usize {
        self.sections.last().map_or(0, |&(_, offset)| offset)
    }

    /// Byte range of a header section within the header bytes.
    pub fn range(&self, section: Section) -> Option<Range<usize>> {
        let index = self.sections.iter().position(|&(s, _)| s == section)?;
        let start = self.sections[index].1;
        let end = self.sections.get(index + 1).map_or(start, |&(_, o)| o);
        Some(start..end)
    }

    /// The body entity, unless it is `null-body`.
    pub fn body(&self) -> Option<Section> {
        self.sections
            .last()
            .map(|&(s, _)| s)
            .filter(|&s| s != Section::NullBody)
    }
}
