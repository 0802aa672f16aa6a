//! Encapsulated HTTP request heads.
//!
//! # Responsibilities
//! - Parse the `req-hdr` section into a `CarriedRequest`
//! - Serialize a (possibly modified) carried request back to wire form
//!
//! # Design Decisions
//! - The request target is kept verbatim; URL resolution happens in `CarriedRequest`
//! - Header lines are echoed exactly as received, minus any removed fields

use http::Method;

use super::head::lines;
use super::IcapError;
use crate::adapt::{CarriedRequest, HeaderFields};

/// Parse an encapsulated HTTP request head.
pub fn parse_request_head(bytes: &[u8]) -> Result<CarriedRequest, IcapError> {
    let mut lines = lines(bytes);
    let request_line = lines.next().unwrap_or_default();
    let request_line = std::str::from_utf8(request_line)
        .map_err(|_| IcapError::MalformedHttpHead("request line is not UTF-8".into()))?;

    let mut parts = request_line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(IcapError::MalformedHttpHead(format!("bad request line: {request_line}")));
    };
    if target.is_empty() || !version.starts_with("HTTP/") {
        return Err(IcapError::MalformedHttpHead(format!("bad request line: {request_line}")));
    }

    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| IcapError::MalformedHttpHead(format!("bad method: {method}")))?;
    let headers = HeaderFields::parse(lines).map_err(IcapError::MalformedHttpHead)?;

    Ok(CarriedRequest::new(method, target, version, headers))
}

/// Serialize a carried request head, terminated by an empty line.
pub fn write_request_head(request: &CarriedRequest, out: &mut Vec<u8>) {
    out.extend_from_slice(
        format!("{} {} {}\r\n", request.method(), request.target(), request.version()).as_bytes(),
    );
    request.headers.write_to(out);
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::AUTHORIZATION;

    const HEAD: &[u8] = b"GET https://cdn01.quay.io/repo/sha256/ab/cd?sig=1 HTTP/1.1\r\nHost: cdn01.quay.io\r\nAuthorization: Bearer t\r\nAccept: a\r\nAccept: b\r\n\r\n";

    #[test]
    fn parses_head() {
        let request = parse_request_head(HEAD).unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.target(), "https://cdn01.quay.io/repo/sha256/ab/cd?sig=1");
        assert_eq!(request.version(), "HTTP/1.1");
        assert_eq!(request.headers.get(AUTHORIZATION).unwrap(), "Bearer t");
        assert_eq!(request.headers.get_all("accept").count(), 2);
        assert!(request.url().is_some());
    }

    #[test]
    fn writes_head_back() {
        let mut request = parse_request_head(HEAD).unwrap();
        request.strip_credentials();

        let mut out = Vec::new();
        write_request_head(&request, &mut out);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "GET https://cdn01.quay.io/repo/sha256/ab/cd?sig=1 HTTP/1.1\r\nHost: cdn01.quay.io\r\nAccept: a\r\nAccept: b\r\n\r\n"
        );
    }

    #[test]
    fn untouched_head_round_trips_exactly() {
        let raw = b"GET /v2/ HTTP/1.1\r\nHost: example.com\r\nUser-Agent: containerd\r\nX-Trace: 1\r\nauthorization:Bearer t\r\nx-trace: 2\r\n\r\n";
        let request = parse_request_head(raw).unwrap();

        let mut out = Vec::new();
        write_request_head(&request, &mut out);
        assert_eq!(out, raw);
    }

    #[test]
    fn stripping_keeps_interleaved_order() {
        let raw = b"GET /v2/ HTTP/1.1\r\nX-A: 1\r\nAuthorization: Bearer t\r\nX-B: 2\r\nX-A: 3\r\n\r\n";
        let mut request = parse_request_head(raw).unwrap();
        request.strip_credentials();

        let mut out = Vec::new();
        write_request_head(&request, &mut out);
        assert_eq!(out, b"GET /v2/ HTTP/1.1\r\nX-A: 1\r\nX-B: 2\r\nX-A: 3\r\n\r\n");
    }

    #[test]
    fn rejects_bad_heads() {
        assert!(parse_request_head(b"\r\n\r\n").is_err());
        assert!(parse_request_head(b"GET /x ICAP/1.0\r\n\r\n").is_err());
        assert!(parse_request_head(b"G(T /x HTTP/1.1\r\n\r\n").is_err());
    }

    #[test]
    fn unparseable_target_still_yields_request() {
        let request = parse_request_head(b"CONNECT cdn01.quay.io:443 HTTP/1.1\r\n\r\n").unwrap();
        assert!(request.url().is_none());
    }
}
