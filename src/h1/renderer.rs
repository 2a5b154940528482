//! HTTP/1.x message rendering: start line, framing headers, and body
//! (spec §4.1, §8 scenarios 2-3).
//!
//! No direct teacher precedent; the auto-inserted `Date`/`Server` headers
//! follow the `date::DateRenderer` design this crate already built
//! (SPEC_FULL.md AMBIENT-1), and the chunked-body rendering calls straight
//! into `h1::chunked`.

use crate::config::H1Config;
use crate::date::DateRenderer;
use crate::entity::Entity;
use crate::headers::{well_known, Headers};
use crate::message::{HttpRequest, HttpResponse, Version};
use bytes::{BufMut, BytesMut};

/// Whether a connection should persist after the message currently being
/// rendered, decided by the RFC 7230 §6.1/6.3 truth table: HTTP/1.1
/// defaults to persistent unless either side asked for `close`; HTTP/1.0
/// defaults to non-persistent unless both sides asked for `keep-alive`.
pub fn decide_persistence(version: Version, peer_requested_close: bool, local_wants_close: bool) -> bool {
    if local_wants_close || peer_requested_close {
        return false;
    }
    match version {
        Version::Http10 => false,
        Version::Http11 | Version::Http2 => true,
    }
}

pub fn peer_requested_close(headers: &Headers, version: Version) -> bool {
    match version {
        Version::Http10 => !headers.contains_token(well_known::CONNECTION, "keep-alive"),
        Version::Http11 | Version::Http2 => headers.contains_token(well_known::CONNECTION, "close"),
    }
}

/// Renders a request line + headers. Skips CR/LF-contaminated headers
/// rather than ever emitting them on the wire (spec §4.1).
pub fn render_request_head(request: &HttpRequest, config: &H1Config, will_close: bool, out: &mut BytesMut) {
    out.extend_from_slice(request.method.as_str().as_bytes());
    out.put_u8(b' ');
    out.extend_from_slice(request.uri.request_target().as_bytes());
    out.put_u8(b' ');
    out.extend_from_slice(request.version.as_str().as_bytes());
    out.extend_from_slice(b"\r\n");

    if !request.headers.contains(well_known::HOST) {
        if let Some(authority) = &request.uri.authority {
            write_header_line(out, well_known::HOST, authority.to_string().as_bytes());
        }
    }
    if let Some(ua) = &config.user_agent_header {
        if !request.headers.contains(well_known::USER_AGENT) {
            write_header_line(out, well_known::USER_AGENT, ua.as_bytes());
        }
    }
    write_body_headers(&request.entity, request.version, out);
    if will_close {
        write_header_line(out, well_known::CONNECTION, b"close");
    }
    for h in request.headers.iter() {
        if h.is_wire_safe() {
            write_header_line(out, h.name.as_str(), &h.value);
        } else {
            log::warn!("dropping non-wire-safe header {}", h.name);
        }
    }
    out.extend_from_slice(b"\r\n");
}

pub fn render_response_head(response: &HttpResponse, config: &H1Config, will_close: bool, out: &mut BytesMut) {
    out.extend_from_slice(response.version.as_str().as_bytes());
    out.put_u8(b' ');
    out.extend_from_slice(response.status.to_string().as_bytes());
    out.put_u8(b' ');
    let reason = response.reason.clone().unwrap_or_else(|| reason_for(response.status).to_owned());
    out.extend_from_slice(reason.as_bytes());
    out.extend_from_slice(b"\r\n");

    write_header_line(out, well_known::DATE, &DateRenderer::global().current());
    if let Some(server) = &config.server_header {
        if !response.headers.contains(well_known::SERVER) {
            write_header_line(out, well_known::SERVER, server.as_bytes());
        }
    }
    write_body_headers(&response.entity, response.version, out);
    if will_close {
        write_header_line(out, well_known::CONNECTION, b"close");
    } else if response.version == Version::Http10 {
        write_header_line(out, well_known::CONNECTION, b"keep-alive");
    }
    for h in response.headers.iter() {
        if h.is_wire_safe() {
            write_header_line(out, h.name.as_str(), &h.value);
        } else {
            log::warn!("dropping non-wire-safe header {}", h.name);
        }
    }
    out.extend_from_slice(b"\r\n");
}

fn write_body_headers(entity: &Entity, version: Version, out: &mut BytesMut) {
    match entity {
        Entity::Strict(s) => write_header_line(out, well_known::CONTENT_LENGTH, s.body.len().to_string().as_bytes()),
        Entity::Default(d) => {
            write_header_line(out, well_known::CONTENT_LENGTH, d.declared_length.to_string().as_bytes())
        }
        Entity::Chunked(_) => {
            if version == Version::Http10 {
                // HTTP/1.0 peers cannot parse chunked bodies; the connection
                // driver buffers the whole entity and rewrites this as
                // Content-Length before calling the renderer (spec §8
                // scenario 2's HTTP/1.0 degradation path).
                log::warn!("chunked entity rendered on HTTP/1.0, framing headers may be wrong");
            } else {
                write_header_line(out, well_known::TRANSFER_ENCODING, b"chunked");
            }
        }
        Entity::CloseDelimited(_) => {}
    }
    if let Some(ct) = entity.content_type().as_bytes() {
        write_header_line(out, well_known::CONTENT_TYPE, ct);
    }
}

fn write_header_line(out: &mut BytesMut, name: &str, value: &[u8]) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
}

fn reason_for(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        411 => "Length Required",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http11_defaults_persistent() {
        assert!(decide_persistence(Version::Http11, false, false));
    }

    #[test]
    fn http10_defaults_non_persistent() {
        assert!(!decide_persistence(Version::Http10, false, false));
    }

    #[test]
    fn explicit_close_wins_on_http11() {
        assert!(!decide_persistence(Version::Http11, true, false));
    }

    #[test]
    fn peer_close_detection_respects_version() {
        let mut headers = Headers::new();
        headers.push(Header::new("Connection", "close"));
        assert!(peer_requested_close(&headers, Version::Http11));
        assert!(!peer_requested_close(&headers, Version::Http10));
    }
}
