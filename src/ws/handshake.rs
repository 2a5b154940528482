//! Opening handshake (RFC 6455 §4, spec §6): client request construction,
//! server request validation + 101 response, and Sec-WebSocket-Accept.
//!
//! Grounded on `cpkb-bluezoo-tagliacarte/core/src/protocol/websocket/handshake.rs`
//! for the SHA-1 + base64 accept computation (same magic GUID, same
//! algorithm), rebuilt over this crate's own `HttpRequest`/`HttpResponse`
//! and `Headers` types instead of a bespoke response parser.

use crate::error::HttpError;
use crate::headers::{well_known, Header, Headers};
use crate::message::{HttpRequest, HttpResponse, Version};
use crate::method::Method;
use crate::uri::Uri;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha1::{Digest, Sha1};

const ACCEPT_MAGIC: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes `Sec-WebSocket-Accept` from the (already base64-encoded) client
/// key, per RFC 6455 §4.2.2.
pub fn compute_accept(key_base64: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key_base64.as_bytes());
    hasher.update(ACCEPT_MAGIC);
    STANDARD.encode(hasher.finalize())
}

/// A fresh 16-byte, base64-encoded `Sec-WebSocket-Key`.
pub fn generate_key() -> String {
    let raw: [u8; 16] = rand::random();
    STANDARD.encode(raw)
}

/// Builds the client's upgrade request and returns it together with the key
/// it generated (the caller must retain the key to verify the response).
pub fn client_request(uri: &Uri, protocols: &[String]) -> (HttpRequest, String) {
    let key = generate_key();
    let mut headers = Headers::new();
    headers.push(Header::new(well_known::UPGRADE, "websocket"));
    headers.push(Header::new(well_known::CONNECTION, "Upgrade"));
    headers.push(Header::new(well_known::SEC_WEBSOCKET_KEY, key.clone()));
    headers.push(Header::new(well_known::SEC_WEBSOCKET_VERSION, "13"));
    if !protocols.is_empty() {
        headers.push(Header::new(well_known::SEC_WEBSOCKET_PROTOCOL, protocols.join(", ")));
    }
    let request = HttpRequest::new(Method::Get, uri.clone(), Version::Http11).with_headers(headers);
    (request, key)
}

/// Validates the server's handshake response against spec §6's rejection
/// list, returning the negotiated subprotocol (if any).
pub fn verify_server_response(
    response: &HttpResponse,
    key_base64: &str,
    offered_protocols: &[String],
) -> Result<Option<String>, HttpError> {
    if response.status != 101 {
        return Err(HttpError::protocol(
            "websocket handshake rejected",
            format!("expected 101 Switching Protocols, got {}", response.status),
        ));
    }
    if !response.headers.contains_token(well_known::UPGRADE, "websocket") {
        return Err(HttpError::protocol("missing Upgrade header", "server response did not upgrade to websocket"));
    }
    if !response.headers.contains_token(well_known::CONNECTION, "upgrade") {
        return Err(HttpError::protocol("missing Connection: upgrade", "server response did not confirm the upgrade"));
    }
    let expected = compute_accept(key_base64);
    let actual = response
        .headers
        .get(well_known::SEC_WEBSOCKET_ACCEPT)
        .and_then(|h| h.value_str())
        .ok_or_else(|| HttpError::protocol("missing Sec-WebSocket-Accept", ""))?;
    if actual != expected {
        return Err(HttpError::protocol(
            "Sec-WebSocket-Accept mismatch",
            format!("expected {expected}, got {actual}"),
        ));
    }
    match response.headers.get(well_known::SEC_WEBSOCKET_PROTOCOL).and_then(|h| h.value_str()) {
        Some(chosen) if offered_protocols.iter().any(|p| p == chosen) => Ok(Some(chosen.to_owned())),
        Some(chosen) => Err(HttpError::protocol(
            "unsupported subprotocol selected",
            format!("server selected {chosen:?}, not in the offered set"),
        )),
        None => Ok(None),
    }
}

/// Validates an inbound upgrade request, returning the client's key if the
/// request is a well-formed handshake.
pub fn validate_client_request(request: &HttpRequest) -> Result<String, HttpError> {
    if request.method != Method::Get {
        return Err(HttpError::protocol("bad websocket request method", request.method.as_str().to_owned()));
    }
    if !request.headers.contains_token(well_known::UPGRADE, "websocket") {
        return Err(HttpError::protocol("missing Upgrade: websocket", ""));
    }
    if !request.headers.contains_token(well_known::CONNECTION, "upgrade") {
        return Err(HttpError::protocol("missing Connection: upgrade", ""));
    }
    let version = request.headers.get(well_known::SEC_WEBSOCKET_VERSION).and_then(|h| h.value_str());
    if version != Some("13") {
        return Err(HttpError::protocol("unsupported websocket version", format!("{version:?}")));
    }
    request
        .headers
        .get(well_known::SEC_WEBSOCKET_KEY)
        .and_then(|h| h.value_str())
        .map(str::to_owned)
        .ok_or_else(|| HttpError::protocol("missing Sec-WebSocket-Key", ""))
}

/// Builds the `101 Switching Protocols` response for an already-validated
/// client request.
pub fn accept_response(key_base64: &str, chosen_protocol: Option<&str>) -> HttpResponse {
    let mut headers = Headers::new();
    headers.push(Header::new(well_known::UPGRADE, "websocket"));
    headers.push(Header::new(well_known::CONNECTION, "Upgrade"));
    headers.push(Header::new(well_known::SEC_WEBSOCKET_ACCEPT, compute_accept(key_base64)));
    if let Some(protocol) = chosen_protocol {
        headers.push(Header::new(well_known::SEC_WEBSOCKET_PROTOCOL, protocol.to_owned()));
    }
    let mut response = HttpResponse::new(101, Version::Http11).with_headers(headers);
    response.reason = Some("Switching Protocols".to_owned());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_matches_rfc6455_example() {
        // The worked example from RFC 6455 §1.3.
        let accept = compute_accept("dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn client_then_server_round_trip_verifies() {
        let uri = Uri::parse_absolute("ws://example.com/chat").unwrap();
        let (request, key) = client_request(&uri, &["chat".to_owned()]);
        let validated_key = validate_client_request(&request).unwrap();
        assert_eq!(validated_key, key);
        let response = accept_response(&validated_key, Some("chat"));
        let protocol = verify_server_response(&response, &key, &["chat".to_owned()]).unwrap();
        assert_eq!(protocol.as_deref(), Some("chat"));
    }

    #[test]
    fn rejects_subprotocol_not_offered() {
        let response = accept_response("irrelevant-key", Some("bogus"));
        let key = "irrelevant-key";
        assert!(verify_server_response(&response, key, &["chat".to_owned()]).is_err());
    }
}
