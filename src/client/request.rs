//! Convenience constructors for outbound client requests.
//!
//! Grounded on `Atte-http2/src/request.rs::Request::{new,get,post}` (a
//! per-request id plus method-specific shorthand constructors); the id
//! counter idiom is carried over verbatim, the body now goes through
//! `Entity::Strict` instead of a bare `Bytes` field.

use crate::entity::{ContentType, Entity, StrictEntity};
use crate::headers::{Header, Headers};
use crate::message::{HttpRequest, Version};
use crate::method::Method;
use crate::uri::Uri;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};

static REQUEST_ID: AtomicUsize = AtomicUsize::new(1);

/// Every request built through this module's constructors carries a unique,
/// process-wide id, stashed in its `Attributes` side-channel for later
/// correlation (logging, pool metrics) without threading an extra field
/// through `HttpRequest` itself.
pub struct RequestId(pub usize);

fn next_id() -> RequestId {
    RequestId(REQUEST_ID.fetch_add(1, Ordering::SeqCst))
}

fn stamp_id(mut request: HttpRequest) -> HttpRequest {
    request.attributes.insert(next_id());
    request
}

pub fn get(uri: Uri) -> HttpRequest {
    stamp_id(HttpRequest::new(Method::Get, uri, Version::Http11))
}

pub fn head(uri: Uri) -> HttpRequest {
    stamp_id(HttpRequest::new(Method::Head, uri, Version::Http11))
}

pub fn delete(uri: Uri) -> HttpRequest {
    stamp_id(HttpRequest::new(Method::Delete, uri, Version::Http11))
}

pub fn post(uri: Uri, content_type: &str, body: impl Into<Bytes>) -> HttpRequest {
    with_body(Method::Post, uri, content_type, body)
}

pub fn put(uri: Uri, content_type: &str, body: impl Into<Bytes>) -> HttpRequest {
    with_body(Method::Put, uri, content_type, body)
}

pub fn patch(uri: Uri, content_type: &str, body: impl Into<Bytes>) -> HttpRequest {
    with_body(Method::Patch, uri, content_type, body)
}

fn with_body(method: Method, uri: Uri, content_type: &str, body: impl Into<Bytes>) -> HttpRequest {
    let entity = Entity::Strict(StrictEntity {
        content_type: ContentType::Known(Bytes::copy_from_slice(content_type.as_bytes())),
        body: body.into(),
    });
    stamp_id(HttpRequest::new(method, uri, Version::Http11).with_entity(entity))
}

/// Attaches a header, returning the request for chaining (the
/// `with_headers`/`with_entity` builder style `HttpRequest` already uses).
pub fn with_header(mut request: HttpRequest, name: &str, value: &str) -> HttpRequest {
    request.headers.push(Header::new(name, Bytes::copy_from_slice(value.as_bytes())));
    request
}

pub fn with_headers(mut request: HttpRequest, headers: Headers) -> HttpRequest {
    for header in headers.into_vec() {
        request.headers.push(header);
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uri::Uri;

    #[test]
    fn get_request_carries_a_unique_id() {
        let uri = Uri::parse_absolute("https://example.com/a").unwrap();
        let a = get(uri.clone());
        let b = get(uri);
        let id_a = a.attributes.get::<RequestId>().unwrap().0;
        let id_b = b.attributes.get::<RequestId>().unwrap().0;
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn post_request_carries_strict_entity() {
        let uri = Uri::parse_absolute("https://example.com/a").unwrap();
        let request = post(uri, "text/plain", Bytes::from_static(b"hi"));
        match request.entity {
            Entity::Strict(s) => assert_eq!(s.body, Bytes::from_static(b"hi")),
            _ => panic!("expected a strict entity"),
        }
    }
}
