//! HTTP/1.x start-line and header-block parsing (spec §4.1).
//!
//! `Atte-http2` has no HTTP/1 parser to ground this on directly (it speaks
//! HTTP/2 exclusively); the incremental "wait for a complete unit, then
//! parse it in place" structure instead follows the buffer-and-advance idiom
//! `h2::frame::Frame::parse` already established for this crate, and the
//! header cache integration follows `headers::HeaderCache`'s documented
//! contract.

use crate::config::{ContentTypeConflictMode, H1Config, IllegalHeaderMode};
use crate::entity::{ContentType, Entity};
use crate::error::HttpError;
use crate::headers::{well_known, Header, HeaderCache, Headers};
use crate::message::Version;
use crate::method::Method;
use crate::uri::Uri;
use bytes::{Bytes, BytesMut};

pub struct ParsedRequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: Headers,
}

pub struct ParsedResponseHead {
    pub version: Version,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
}

/// How the entity following a parsed head should be read off the wire,
/// decided by the framing-priority rules in spec §4.1.
pub enum EntityFraming {
    None,
    ContentLength(u64),
    Chunked,
    CloseDelimited,
}

/// Attempts to parse one request head out of `buf`. Returns `Ok(None)` if
/// the full head (terminated by a bare `\r\n\r\n`) hasn't arrived yet.
pub fn parse_request_head(
    buf: &mut BytesMut,
    config: &H1Config,
    cache: &mut HeaderCache,
) -> Result<Option<ParsedRequestHead>, HttpError> {
    let Some(head_len) = find_header_block_end(buf) else {
        if buf.len() > config.limits.max_uri_length + config.limits.max_method_length + 32
            && find_line_end(buf, 0).is_none()
        {
            return Err(HttpError::protocol("request line too long", buf.len().to_string()));
        }
        return Ok(None);
    };
    let raw = buf.split_to(head_len);
    let mut lines = split_lines(&raw);

    let start_line = lines.next().ok_or_else(|| HttpError::protocol("empty request", ""))?;
    let (method_raw, rest) = split_once_space(start_line)
        .ok_or_else(|| HttpError::protocol("malformed request line", lossy(start_line)))?;
    if method_raw.len() > config.limits.max_method_length {
        return Err(HttpError::protocol("method too long", method_raw.len().to_string()));
    }
    let (target_raw, version_raw) = split_once_space(rest)
        .ok_or_else(|| HttpError::protocol("malformed request line", lossy(start_line)))?;
    if target_raw.len() > config.limits.max_uri_length {
        return Err(HttpError::protocol("request target too long", target_raw.len().to_string()));
    }

    let method = Method::parse(&lossy(method_raw));
    let uri = Uri::parse_origin_form(&lossy(target_raw), config.uri_parsing_mode)?;
    let version = parse_version(version_raw)?;
    let headers = parse_header_lines(lines, config, cache)?;

    Ok(Some(ParsedRequestHead { method, uri, version, headers }))
}

pub fn parse_response_head(
    buf: &mut BytesMut,
    config: &H1Config,
    cache: &mut HeaderCache,
) -> Result<Option<ParsedResponseHead>, HttpError> {
    let Some(head_len) = find_header_block_end(buf) else { return Ok(None) };
    let raw = buf.split_to(head_len);
    let mut lines = split_lines(&raw);

    let start_line = lines.next().ok_or_else(|| HttpError::protocol("empty response", ""))?;
    let (version_raw, rest) = split_once_space(start_line)
        .ok_or_else(|| HttpError::protocol("malformed status line", lossy(start_line)))?;
    let version = parse_version(version_raw)?;
    let (status_raw, reason_raw) = split_once_space(rest).unwrap_or((rest, b""));
    let status: u16 = lossy(status_raw)
        .parse()
        .map_err(|_| HttpError::protocol("malformed status code", lossy(status_raw)))?;
    if lossy(reason_raw).len() > config.limits.max_response_reason_length {
        return Err(HttpError::protocol("reason phrase too long", reason_raw.len().to_string()));
    }

    let headers = parse_header_lines(lines, config, cache)?;
    Ok(Some(ParsedResponseHead { version, status, reason: lossy(reason_raw), headers }))
}

fn parse_header_lines<'a>(
    lines: impl Iterator<Item = &'a [u8]>,
    config: &H1Config,
    cache: &mut HeaderCache,
) -> Result<Headers, HttpError> {
    let mut headers = Headers::new();
    let mut pending_fold: Option<usize> = None;

    for line in lines {
        if line.is_empty() {
            continue;
        }
        if (line[0] == b' ' || line[0] == b'\t') && pending_fold.is_some() {
            // RFC 7230 §3.2.4 deprecates line folding but obsolete senders
            // still emit it; fold into the previous header's value.
            let idx = pending_fold.unwrap();
            if let Some(h) = headers.get_index_mut(idx) {
                let mut joined = h.value.to_vec();
                joined.push(b' ');
                joined.extend_from_slice(trim_ows(line));
                h.value = Bytes::from(joined);
            }
            continue;
        }
        if headers.len() >= config.limits.max_header_count {
            return Err(HttpError::protocol("too many headers", headers.len().to_string()));
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Err(HttpError::protocol("malformed header line", lossy(line)));
        };
        let name_raw = trim_ows(&line[..colon]);
        let value_raw = trim_ows(&line[colon + 1..]);

        if name_raw.len() > config.limits.max_header_name_length {
            return Err(HttpError::protocol("header name too long", name_raw.len().to_string()));
        }
        if value_raw.len() > config.limits.max_header_value_length {
            return Err(HttpError::protocol("header value too long", value_raw.len().to_string()));
        }

        let name = lossy(name_raw);
        if let Some(cached) = cache.lookup(&name, value_raw) {
            headers.push(cached);
        } else {
            let header = Header::new(name.as_str(), Bytes::copy_from_slice(value_raw));
            if !header.is_wire_safe() {
                match config.illegal_header_value_mode {
                    IllegalHeaderMode::Error => {
                        return Err(HttpError::protocol("illegal header value", name));
                    }
                    IllegalHeaderMode::Warn => log::warn!("dropping illegal header value for {name}"),
                    IllegalHeaderMode::Ignore => {}
                }
                continue;
            }
            cache.insert(&name, value_raw, header.clone());
            headers.push(header);
        }
        pending_fold = Some(headers.len() - 1);
    }
    Ok(headers)
}

/// Decides how the entity body following this head should be read, applying
/// the spec §4.1 priority: forced-empty cases first, then
/// Transfer-Encoding, then Content-Length, then close-delimited.
pub fn entity_framing_for_response(
    headers: &Headers,
    version: Version,
    status: u16,
    request_method: &Method,
) -> Result<EntityFraming, HttpError> {
    if request_method.forbids_response_body(status)
        || matches!(status, 204 | 304)
        || (100..200).contains(&status)
    {
        return Ok(EntityFraming::None);
    }
    entity_framing(headers, version, true)
}

pub fn entity_framing_for_request(headers: &Headers, version: Version) -> Result<EntityFraming, HttpError> {
    entity_framing(headers, version, false)
}

fn entity_framing(headers: &Headers, version: Version, allow_close_delimited: bool) -> Result<EntityFraming, HttpError> {
    if headers.contains_token(well_known::TRANSFER_ENCODING, "chunked") {
        if version == Version::Http10 {
            return Err(HttpError::protocol(
                "chunked transfer-encoding on HTTP/1.0",
                "RFC 7230 forbids this",
            ));
        }
        return Ok(EntityFraming::Chunked);
    }
    let lengths: Vec<&Header> = headers.get_all(well_known::CONTENT_LENGTH).collect();
    if lengths.len() > 1 {
        let distinct: std::collections::HashSet<_> = lengths.iter().map(|h| h.value.clone()).collect();
        if distinct.len() > 1 {
            return Err(HttpError::protocol("conflicting Content-Length headers", ""));
        }
    }
    if let Some(h) = lengths.first() {
        let n: u64 = h
            .value_str()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| HttpError::protocol("malformed Content-Length", h.value_str().unwrap_or("").to_owned()))?;
        return Ok(EntityFraming::ContentLength(n));
    }
    if allow_close_delimited {
        Ok(EntityFraming::CloseDelimited)
    } else {
        Ok(EntityFraming::None)
    }
}

/// Applies the Content-Type conflict policy (spec §3 "every entity has
/// exactly one content-type"; config §6 `content-type` conflict modes).
pub fn resolve_content_type(headers: &Headers, mode: ContentTypeConflictMode) -> Result<ContentType, HttpError> {
    let values: Vec<&Header> = headers.get_all(well_known::CONTENT_TYPE).collect();
    match values.len() {
        0 => Ok(ContentType::None),
        1 => Ok(ContentType::Known(values[0].value.clone())),
        _ => match mode {
            ContentTypeConflictMode::Error => Err(HttpError::protocol("conflicting Content-Type headers", "")),
            ContentTypeConflictMode::First => Ok(ContentType::Known(values[0].value.clone())),
            ContentTypeConflictMode::Last => Ok(ContentType::Known(values[values.len() - 1].value.clone())),
            ContentTypeConflictMode::NoContentType => Ok(ContentType::None),
        },
    }
}

pub fn empty_entity(content_type: ContentType) -> Entity {
    Entity::Strict(crate::entity::StrictEntity { content_type, body: Bytes::new() })
}

fn parse_version(raw: &[u8]) -> Result<Version, HttpError> {
    match raw {
        b"HTTP/1.1" => Ok(Version::Http11),
        b"HTTP/1.0" => Ok(Version::Http10),
        other => Err(HttpError::protocol("unsupported HTTP version", lossy(other))),
    }
}

fn find_header_block_end(buf: &BytesMut) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn find_line_end(buf: &BytesMut, from: usize) -> Option<usize> {
    buf[from..].windows(2).position(|w| w == b"\r\n")
}

/// Splits a full head block (already stripped of the trailing blank line's
/// terminator) into individual header/start lines, supporting both CRLF and
/// bare-LF line endings (spec §4.1: "supports both CRLF and bare-LF lines").
fn split_lines(raw: &[u8]) -> impl Iterator<Item = &[u8]> {
    let trimmed = &raw[..raw.len().saturating_sub(2)]; // drop the trailing blank line's CRLF
    trimmed.split(|&b| b == b'\n').map(|line| {
        if line.ends_with(b"\r") {
            &line[..line.len() - 1]
        } else {
            line
        }
    })
}

fn split_once_space(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let idx = line.iter().position(|&b| b == b' ')?;
    Some((&line[..idx], &line[idx + 1..]))
}

fn trim_ows(b: &[u8]) -> &[u8] {
    let start = b.iter().position(|&c| c != b' ' && c != b'\t').unwrap_or(b.len());
    let end = b.iter().rposition(|&c| c != b' ' && c != b'\t').map_or(start, |i| i + 1);
    &b[start..end]
}

fn lossy(b: &[u8]) -> String {
    String::from_utf8_lossy(b).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_get_request() {
        let mut buf = BytesMut::from(&b"GET /foo HTTP/1.1\r\nHost: example.com\r\n\r\n"[..]);
        let mut cache = HeaderCache::default();
        let head = parse_request_head(&mut buf, &H1Config::default(), &mut cache)
            .unwrap()
            .unwrap();
        assert_eq!(head.method, Method::Get);
        assert_eq!(head.uri.path, "/foo");
        assert_eq!(head.headers.get("host").unwrap().value_str(), Some("example.com"));
    }

    #[test]
    fn needs_more_without_terminator() {
        let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: x"[..]);
        let mut cache = HeaderCache::default();
        assert!(parse_request_head(&mut buf, &H1Config::default(), &mut cache).unwrap().is_none());
    }

    #[test]
    fn rejects_conflicting_content_length() {
        let mut headers = Headers::new();
        headers.push(Header::new("Content-Length", "1"));
        headers.push(Header::new("Content-Length", "2"));
        assert!(entity_framing_for_request(&headers, Version::Http11).is_err());
    }

    #[test]
    fn chunked_on_http10_is_rejected() {
        let mut headers = Headers::new();
        headers.push(Header::new("Transfer-Encoding", "chunked"));
        assert!(entity_framing_for_request(&headers, Version::Http10).is_err());
    }
}
