//! ICAP response serialization.
//!
//! # Responsibilities
//! - Status line plus the static `ISTag` and `Service` headers on every response
//! - Capability headers on OPTIONS answers
//! - `Encapsulated` offsets and the echoed HTTP request for pass-through outcomes

use super::chunked::encode_chunked;
use super::http_head::write_request_head;
use crate::adapt::{AdaptationOutcome, CarriedRequest, CAPABILITIES};

/// Static identity sent with every response.
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    pub istag: String,
    pub service: String,
    /// Advertised in OPTIONS as `Max-Connections`.
    pub max_connections: usize,
}

/// What a response carries after its head.
#[derive(Debug)]
pub enum Payload<'a> {
    /// Nothing encapsulated.
    Empty,
    /// Echo a carried request, with its body when one was declared.
    Request {
        request: &'a CarriedRequest,
        body: Option<&'a [u8]>,
    },
}

/// Interim answer asking the client to send the rest of a previewed body.
pub const CONTINUE: &[u8] = b"ICAP/1.0 100 Continue\r\n\r\n";

/// Serialize the response for an adaptation outcome.
pub fn write_outcome(
    identity: &ServiceIdentity,
    outcome: AdaptationOutcome,
    payload: Payload<'_>,
    close: bool,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(512);
    write_status_line(&mut out, outcome.status_code(), outcome.reason());
    write_identity(&mut out, identity);

    if outcome == AdaptationOutcome::CapabilityAdvertisement {
        push_header(&mut out, "Methods", CAPABILITIES.methods);
        if CAPABILITIES.allow_204 {
            push_header(&mut out, "Allow", "204");
        }
        push_header(&mut out, "Preview", &CAPABILITIES.preview_bytes.to_string());
        push_header(&mut out, "Max-Connections", &identity.max_connections.to_string());
    }
    if close {
        push_header(&mut out, "Connection", "close");
    }

    match payload {
        Payload::Request { request, body } if outcome.echoes_request() => {
            let mut http_head = Vec::with_capacity(256);
            write_request_head(request, &mut http_head);

            let encapsulated = match body {
                Some(_) => format!("req-hdr=0, req-body={}", http_head.len()),
                None => format!("req-hdr=0, null-body={}", http_head.len()),
            };
            push_header(&mut out, "Encapsulated", &encapsulated);
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&http_head);
            if let Some(body) = body {
                encode_chunked(body, &mut out);
            }
        }
        _ => {
            push_header(&mut out, "Encapsulated", "null-body=0");
            out.extend_from_slice(b"\r\n");
        }
    }
    out
}

/// Serialize a transport-level `400 Bad Request`; the connection is closed after it.
pub fn write_bad_request(identity: &ServiceIdentity) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    write_status_line(&mut out, 400, "Bad Request");
    write_identity(&mut out, identity);
    push_header(&mut out, "Connection", "close");
    push_header(&mut out, "Encapsulated", "null-body=0");
    out.extend_from_slice(b"\r\n");
    out
}

fn write_status_line(out: &mut Vec<u8>, code: u16, reason: &str) {
    out.extend_from_slice(format!("ICAP/1.0 {code} {reason}\r\n").as_bytes());
}

fn write_identity(out: &mut Vec<u8>, identity: &ServiceIdentity) {
    push_header(out, "ISTag", &format!("\"{}\"", identity.istag));
    push_header(out, "Service", &identity.service);
}

fn push_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapt::HeaderFields;
    use http::Method;

    fn identity() -> ServiceIdentity {
        ServiceIdentity {
            istag: "tag-1".into(),
            service: "test service".into(),
            max_connections: 16,
        }
    }

    fn request() -> CarriedRequest {
        let headers = HeaderFields::parse([&b"Host: example.com"[..]].into_iter()).unwrap();
        CarriedRequest::new(Method::POST, "http://example.com/", "HTTP/1.1", headers)
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn options_advertises_capabilities() {
        let out = text(write_outcome(
            &identity(),
            AdaptationOutcome::CapabilityAdvertisement,
            Payload::Empty,
            false,
        ));
        assert_eq!(
            out,
            "ICAP/1.0 200 OK\r\nISTag: \"tag-1\"\r\nService: test service\r\nMethods: REQMOD\r\nAllow: 204\r\nPreview: 0\r\nMax-Connections: 16\r\nEncapsulated: null-body=0\r\n\r\n"
        );
    }

    #[test]
    fn no_content_has_no_payload() {
        let req = request();
        let out = text(write_outcome(
            &identity(),
            AdaptationOutcome::NoContent,
            Payload::Request { request: &req, body: None },
            false,
        ));
        assert!(out.starts_with("ICAP/1.0 204 No Content\r\n"));
        assert!(out.ends_with("Encapsulated: null-body=0\r\n\r\n"));
        assert!(!out.contains("POST"));
    }

    #[test]
    fn echo_without_body() {
        let req = request();
        let out = text(write_outcome(
            &identity(),
            AdaptationOutcome::Unmodified,
            Payload::Request { request: &req, body: None },
            false,
        ));
        let http = "POST http://example.com/ HTTP/1.1\r\nHost: example.com\r\n\r\n";
        assert!(out.contains(&format!("Encapsulated: req-hdr=0, null-body={}\r\n\r\n{http}", http.len())));
        assert!(out.ends_with(http));
    }

    #[test]
    fn echo_with_body() {
        let req = request();
        let out = text(write_outcome(
            &identity(),
            AdaptationOutcome::Modified,
            Payload::Request { request: &req, body: Some(&b"hello"[..]) },
            true,
        ));
        assert!(out.contains("Connection: close\r\n"));
        assert!(out.contains("Encapsulated: req-hdr=0, req-body="));
        assert!(out.ends_with("\r\n\r\n5\r\nhello\r\n0\r\n\r\n"));
    }

    #[test]
    fn method_not_allowed() {
        let out = text(write_outcome(
            &identity(),
            AdaptationOutcome::MethodNotSupported,
            Payload::Empty,
            true,
        ));
        assert!(out.starts_with("ICAP/1.0 405 Method Not Allowed\r\nISTag: \"tag-1\"\r\n"));
    }

    #[test]
    fn bad_request_closes() {
        let out = text(write_bad_request(&identity()));
        assert!(out.starts_with("ICAP/1.0 400 Bad Request\r\n"));
        assert!(out.contains("Connection: close\r\n"));
    }
}
