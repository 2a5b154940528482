//! URI model (spec §3): scheme, authority, absolute path, query.
//!
//! `Atte-http2/src/request.rs` and `src/client.rs` both parse request
//! targets with `url::Url` (already a teacher dependency); this wraps the
//! same crate rather than hand-rolling a parser, and adds the
//! origin-form/relative-reference handling HTTP/1 request lines need that a
//! client-oriented `Url` alone doesn't give you.

use crate::config::UriParsingMode;
use crate::error::HttpError;
use std::fmt;

/// A parsed request-target. Absolute URIs (`GET http://host/path HTTP/1.1`,
/// used by the client and by proxies) and origin-form targets (`GET /path
/// HTTP/1.1`, the common server-side case) both normalize to this shape;
/// `authority` is `None` for the latter until a `Host` header fills it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    pub scheme: Option<String>,
    pub authority: Option<Authority>,
    pub path: String,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    pub host: String,
    pub port: Option<u16>,
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(p) => write!(f, "{}:{}", self.host, p),
            None => write!(f, "{}", self.host),
        }
    }
}

impl Uri {
    /// Parses an origin-form target as it appears on an HTTP/1 request line:
    /// `/path?query`, or `*` for `OPTIONS *`.
    pub fn parse_origin_form(raw: &str, mode: UriParsingMode) -> crate::error::Result<Self> {
        if raw == "*" {
            return Ok(Uri {
                scheme: None,
                authority: None,
                path: "*".to_owned(),
                query: None,
            });
        }
        if !raw.starts_with('/') {
            return match mode {
                UriParsingMode::Strict => Err(HttpError::protocol(
                    "malformed request target",
                    format!("expected origin-form starting with '/', got {raw:?}"),
                )),
                UriParsingMode::Relaxed => Ok(Uri {
                    scheme: None,
                    authority: None,
                    path: format!("/{raw}"),
                    query: None,
                }),
            };
        }
        let (path, query) = split_query(raw);
        Ok(Uri {
            scheme: None,
            authority: None,
            path: path.to_owned(),
            query: query.map(str::to_owned),
        })
    }

    /// Parses an absolute-form target (`http://host:port/path?query`), the
    /// form a client sends and the form a proxy's request line carries.
    pub fn parse_absolute(raw: &str) -> crate::error::Result<Self> {
        let parsed = url::Url::parse(raw)
            .map_err(|e| HttpError::protocol("malformed absolute URI", e.to_string()))?;
        Self::from_url(&parsed)
    }

    pub fn from_url(parsed: &url::Url) -> crate::error::Result<Self> {
        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::protocol("missing host in URI", parsed.to_string()))?
            .to_owned();
        Ok(Uri {
            scheme: Some(parsed.scheme().to_owned()),
            authority: Some(Authority {
                host,
                port: parsed.port(),
            }),
            path: if parsed.path().is_empty() {
                "/".to_owned()
            } else {
                parsed.path().to_owned()
            },
            query: parsed.query().map(str::to_owned),
        })
    }

    /// The default port for this URI's scheme, used when an explicit port is
    /// absent and a connection target must still be chosen (spec §4.6 pool
    /// keying).
    pub fn effective_port(&self) -> Option<u16> {
        self.authority.as_ref().and_then(|a| a.port).or_else(|| {
            match self.scheme.as_deref() {
                Some("https") | Some("wss") => Some(443),
                Some("http") | Some("ws") => Some(80),
                _ => None,
            }
        })
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self.scheme.as_deref(), Some("https") | Some("wss"))
    }

    /// Renders the request-target form sent on an HTTP/1 request line:
    /// origin-form for requests to an origin server, `*` for server-wide
    /// `OPTIONS`.
    pub fn request_target(&self) -> String {
        if self.path == "*" {
            return "*".to_owned();
        }
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

fn split_query(raw: &str) -> (&str, Option<&str>) {
    match raw.find('?') {
        Some(idx) => (&raw[..idx], Some(&raw[idx + 1..])),
        None => (raw, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_origin_form_with_query() {
        let uri = Uri::parse_origin_form("/a/b?x=1&y=2", UriParsingMode::Strict).unwrap();
        assert_eq!(uri.path, "/a/b");
        assert_eq!(uri.query.as_deref(), Some("x=1&y=2"));
    }

    #[test]
    fn parses_options_star() {
        let uri = Uri::parse_origin_form("*", UriParsingMode::Strict).unwrap();
        assert_eq!(uri.path, "*");
    }

    #[test]
    fn strict_mode_rejects_non_origin_form() {
        assert!(Uri::parse_origin_form("path", UriParsingMode::Strict).is_err());
    }

    #[test]
    fn parses_absolute_uri_and_default_port() {
        let uri = Uri::parse_absolute("https://example.com/foo").unwrap();
        assert_eq!(uri.authority.as_ref().unwrap().host, "example.com");
        assert_eq!(uri.effective_port(), Some(443));
        assert!(uri.is_encrypted());
    }
}
