//! Header fields of the carried HTTP request, kept as received.
//!
//! Every field remembers its original line, so echoing a request writes the
//! client's bytes back in the client's order. Lookups are case-insensitive.

use http::{HeaderName, HeaderValue};

/// One `Name: value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: HeaderName,
    value: HeaderValue,
    line: Vec<u8>,
}

impl HeaderField {
    /// Parse a field line (without its line terminator).
    pub fn parse(line: &[u8]) -> Result<Self, String> {
        if line.first().is_some_and(|b| *b == b' ' || *b == b'\t') {
            return Err("folded header lines are not supported".to_string());
        }
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| format!("header line without colon: {}", String::from_utf8_lossy(line)))?;

        let name = HeaderName::from_bytes(&line[..colon])
            .map_err(|_| format!("invalid header name: {}", String::from_utf8_lossy(&line[..colon])))?;
        let value = HeaderValue::from_bytes(line[colon + 1..].trim_ascii())
            .map_err(|_| format!("invalid value for header {name}"))?;

        Ok(Self {
            name,
            value,
            line: line.to_vec(),
        })
    }

    /// Lowercased field name.
    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn value(&self) -> &HeaderValue {
        &self.value
    }

    fn is(&self, name: &str) -> bool {
        self.name.as_str().eq_ignore_ascii_case(name)
    }
}

/// Ordered header fields; duplicates and interleaving are preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    fields: Vec<HeaderField>,
}

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse field lines up to the first empty line.
    pub fn parse<'a>(lines: impl Iterator<Item = &'a [u8]>) -> Result<Self, String> {
        let fields: Vec<HeaderField> = lines
            .take_while(|line| !line.is_empty())
            .map(HeaderField::parse)
            .collect::<Result<_, _>>()?;
        Ok(Self { fields })
    }

    /// First value of `name`.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        let name = name.as_ref();
        self.fields.iter().find(|f| f.is(name)).map(HeaderField::value)
    }

    /// Every value of `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.fields.iter().filter(move |f| f.is(name)).map(HeaderField::value)
    }

    /// Remove every field named `name`. Returns how many were removed.
    pub fn remove(&mut self, name: impl AsRef<str>) -> usize {
        let name = name.as_ref();
        let before = self.fields.len();
        self.fields.retain(|f| !f.is(name));
        before - self.fields.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append each original line followed by CRLF.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for field in &self.fields {
            out.extend_from_slice(&field.line);
            out.extend_from_slice(b"\r\n");
        }
    }
}

impl<'a> IntoIterator for &'a HeaderFields {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::AUTHORIZATION;

    fn fields(raw: &[&[u8]]) -> HeaderFields {
        HeaderFields::parse(raw.iter().copied()).unwrap()
    }

    #[test]
    fn lookup_ignores_case() {
        let headers = fields(&[b"User-Agent: containerd", b"X-Trace: one"]);
        assert_eq!(headers.get("user-agent").unwrap(), "containerd");
        assert_eq!(headers.get("USER-AGENT").unwrap(), "containerd");
        assert_eq!(headers.get(http::header::USER_AGENT).unwrap(), "containerd");
        assert!(headers.get("accept").is_none());
    }

    #[test]
    fn writes_lines_verbatim_in_order() {
        let headers = fields(&[b"Accept: a", b"X-Weird:  spaced ", b"accept: b"]);
        let mut out = Vec::new();
        headers.write_to(&mut out);
        assert_eq!(out, b"Accept: a\r\nX-Weird:  spaced \r\naccept: b\r\n");
        assert_eq!(headers.get_all("accept").collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn remove_drops_every_spelling() {
        let mut headers = fields(&[
            b"Authorization: Bearer a",
            b"Accept: */*",
            b"AUTHORIZATION: Basic b",
            b"authorization: Basic c",
        ]);
        assert_eq!(headers.remove(AUTHORIZATION), 3);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.remove(AUTHORIZATION), 0);
    }

    #[test]
    fn parse_stops_at_blank_line() {
        let headers = fields(&[b"Host: a", b"", b"not a header"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(HeaderField::parse(b"no colon here").is_err());
        assert!(HeaderField::parse(b" folded: value").is_err());
        assert!(HeaderField::parse(b"bad name: v").is_err());
    }
}
