//! Request/response message model (spec §3) and the typed attributes
//! side-channel from SPEC_FULL.md SUPPLEMENT-1.
//!
//! Grounded on `Atte-http2/src/request.rs::Request` and
//! `src/response.rs::Response`, which pair a status/method with a header map
//! and body; generalized here to the richer `Uri`/`Headers`/`Entity` types
//! and given an extension point (`Attributes`) for out-of-band data such as
//! the negotiated protocol version or TLS peer identity, the same role the
//! spec's "polymorphic extension registry" plays, re-expressed as an
//! explicit owned map instead (spec §9 re-architecture note).

use crate::entity::Entity;
use crate::headers::Headers;
use crate::method::Method;
use crate::uri::Uri;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// HTTP protocol version of a parsed or about-to-be-rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
    Http2,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
            Version::Http2 => "HTTP/2",
        }
    }
}

/// A type-keyed side-channel for out-of-band values that aren't part of the
/// wire message itself (negotiated ALPN protocol, TLS session info, pool
/// routing hints, ...). One value per concrete type, last write wins.
#[derive(Default)]
pub struct Attributes {
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|b| *b)
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }
}

impl std::fmt::Debug for Attributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Attributes({} values)", self.values.len())
    }
}

pub struct HttpRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: Headers,
    pub entity: Entity,
    pub attributes: Attributes,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri, version: Version) -> Self {
        Self {
            method,
            uri,
            version,
            headers: Headers::new(),
            entity: Entity::empty(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = entity;
        self
    }
}

pub struct HttpResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub version: Version,
    pub headers: Headers,
    pub entity: Entity,
    pub attributes: Attributes,
}

impl HttpResponse {
    pub fn new(status: u16, version: Version) -> Self {
        Self {
            status,
            reason: None,
            version,
            headers: Headers::new(),
            entity: Entity::empty(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = entity;
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_round_trip_by_type() {
        #[derive(Debug, PartialEq)]
        struct PeerCertFingerprint(String);

        let mut attrs = Attributes::new();
        assert!(!attrs.contains::<PeerCertFingerprint>());
        attrs.insert(PeerCertFingerprint("abc".into()));
        assert_eq!(
            attrs.get::<PeerCertFingerprint>(),
            Some(&PeerCertFingerprint("abc".into()))
        );
        assert_eq!(attrs.remove::<PeerCertFingerprint>(), Some(PeerCertFingerprint("abc".into())));
        assert!(!attrs.contains::<PeerCertFingerprint>());
    }

    #[test]
    fn response_status_classification() {
        let r = HttpResponse::new(204, Version::Http11);
        assert!(r.is_success());
        assert!(!r.is_informational());
    }
}
