//! Request targets as seen by the classifiers.

use url::Url;

/// An absolute request target: the parsed URL plus the text the client sent.
///
/// `url::Url` lowercases scheme and host, so grammar matching runs on
/// [`TargetUrl::match_form`] instead, which keeps the client's spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl {
    url: Url,
    match_form: String,
}

impl TargetUrl {
    /// Parse an absolute target. Hostless or malformed targets yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok().filter(Url::has_host)?;
        let match_form = match_form(raw)?;
        Some(Self { url, match_form })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `scheme://host[:port]path` exactly as received, without userinfo,
    /// query or fragment.
    pub fn match_form(&self) -> &str {
        &self.match_form
    }
}

fn match_form(raw: &str) -> Option<String> {
    let (scheme, rest) = raw.trim().split_once("://")?;
    let rest = rest.find(['?', '#']).map_or(rest, |end| &rest[..end]);
    let (authority, path) = rest.find('/').map_or((rest, ""), |at| rest.split_at(at));
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    Some(format!("{scheme}://{host}{path}"))
}
