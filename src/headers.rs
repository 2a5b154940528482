//! Header model and the per-connection header cache described in spec §4.1.
//!
//! `Atte-http2`'s own header handling was a flat `HashMap<String, String>`
//! (`connection.rs::Request`); this crate needs the richer model spec §3
//! describes (case-preserving names, case-insensitive equality, modeled vs.
//! raw values) so it is grounded instead on the header abstractions visible
//! in `examples/other_examples/71fd812e_swindon-rs-tk-http__src-server-headers.rs.rs`
//! and `42eebdf7_killercup-tk-http__src-server-headers.rs.rs` (a headers list
//! plus a small modeled/raw split), re-expressed over `bytes::Bytes`.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

/// A header name: case-insensitive equality/hash, case-preserving storage.
#[derive(Debug, Clone, Eq)]
pub struct HeaderName {
    raw: Box<str>,
    lower: Box<str>,
}

impl HeaderName {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref();
        Self {
            raw: raw.into(),
            lower: raw.to_ascii_lowercase().into_boxed_str(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn canonical(&self) -> &str {
        &self.lower
    }
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        self.lower == other.lower
    }
}

impl std::hash::Hash for HeaderName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.lower.hash(state);
    }
}

impl PartialEq<str> for HeaderName {
    fn eq(&self, other: &str) -> bool {
        self.lower.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl From<&str> for HeaderName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Well-known header names the modeled layer special-cases (spec §3, §6
/// `modeled-header-parsing`).
pub mod well_known {
    pub const CONNECTION: &str = "connection";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const TRANSFER_ENCODING: &str = "transfer-encoding";
    pub const HOST: &str = "host";
    pub const EXPECT: &str = "expect";
    pub const DATE: &str = "date";
    pub const SERVER: &str = "server";
    pub const USER_AGENT: &str = "user-agent";
    pub const UPGRADE: &str = "upgrade";
    pub const SEC_WEBSOCKET_KEY: &str = "sec-websocket-key";
    pub const SEC_WEBSOCKET_ACCEPT: &str = "sec-websocket-accept";
    pub const SEC_WEBSOCKET_VERSION: &str = "sec-websocket-version";
    pub const SEC_WEBSOCKET_PROTOCOL: &str = "sec-websocket-protocol";
}

/// A single header. Whether a header renders on requests, responses, or
/// both is a property of where it is placed in a `Headers` list + the
/// renderer's own hop-by-hop stripping, not of this type (spec §3: "each
/// header either renders in requests, in responses, or both; custom headers
/// specify this explicitly" is enforced by the renderer, see `h1::renderer`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: HeaderName,
    pub value: Bytes,
}

impl Header {
    pub fn new(name: impl Into<HeaderName>, value: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// Headers whose name or value contain CR or LF after parsing must never
    /// be rendered or surfaced to the application (spec §4.1).
    pub fn is_wire_safe(&self) -> bool {
        !self.name.as_str().bytes().any(|b| b == b'\r' || b == b'\n')
            && !self.value.iter().any(|&b| b == b'\r' || b == b'\n')
    }
}

impl From<(&str, &str)> for Header {
    fn from((name, value): (&str, &str)) -> Self {
        Header::new(name, Bytes::copy_from_slice(value.as_bytes()))
    }
}

/// An ordered header list, with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<Header>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, header: Header) {
        self.0.push(header);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First value for `name` (case-insensitive), as in HTTP/1 "first header
    /// wins" conventions used by e.g. Content-Type conflict resolution.
    pub fn get(&self, name: &str) -> Option<&Header> {
        self.0.iter().find(|h| h.name == *name)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Header> {
        self.0.iter().filter(move |h| h.name == *name)
    }

    pub fn remove_all(&mut self, name: &str) {
        self.0.retain(|h| h.name != *name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// True if any header named `name` has a value containing `token` as a
    /// comma-separated, case-insensitive element (used for `Connection:
    /// close`, `Transfer-Encoding: chunked`, ...).
    pub fn contains_token(&self, name: &str, token: &str) -> bool {
        self.get_all(name).any(|h| {
            h.value_str()
                .map(|v| {
                    v.split(',')
                        .any(|part| part.trim().eq_ignore_ascii_case(token))
                })
                .unwrap_or(false)
        })
    }

    pub fn into_vec(self) -> Vec<Header> {
        self.0
    }

    /// Mutable access by insertion order, used by the HTTP/1 parser to
    /// append folded continuation lines onto the previous header's value.
    pub fn get_index_mut(&mut self, idx: usize) -> Option<&mut Header> {
        self.0.get_mut(idx)
    }
}

impl IntoIterator for Headers {
    type Item = Header;
    type IntoIter = std::vec::IntoIter<Header>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A parsed header cache entry: the raw bytes the line was parsed from
/// (without the trailing CRLF) and the resulting `Header`.
#[derive(Debug, Clone)]
struct CacheEntry {
    raw_value: Box<[u8]>,
    header: Header,
}

/// Per-connection header cache (spec §4.1): "a trie keyed by raw bytes maps
/// header bytes to pre-parsed header instances; cache has per-header-name
/// capacity (default 12) and an overall node budget; on overflow, parsing
/// continues without caching."
///
/// Implemented as a two-level structure — outer map keyed by the lower-cased
/// header name, inner small vector of raw-value -> parsed-header entries —
/// rather than a literal byte-trie; this gives the same externally observable
/// behavior (bounded per-name capacity, a global node budget, graceful
/// fallback to uncached parsing on overflow) with far less code, and is
/// never shared across connections (mutation makes that unsound, spec §5).
pub struct HeaderCache {
    by_name: HashMap<Box<str>, Vec<CacheEntry>>,
    capacity_per_name: usize,
    node_budget: usize,
    nodes_used: usize,
}

impl HeaderCache {
    pub fn new(capacity_per_name: usize, node_budget: usize) -> Self {
        Self {
            by_name: HashMap::new(),
            capacity_per_name,
            node_budget,
            nodes_used: 0,
        }
    }

    /// Look up a previously cached parse of `name: raw_value`.
    pub fn lookup(&self, name: &str, raw_value: &[u8]) -> Option<Header> {
        self.by_name
            .get(name)
            .and_then(|entries| entries.iter().find(|e| &*e.raw_value == raw_value))
            .map(|e| e.header.clone())
    }

    /// Remember a freshly parsed header for this raw name/value pair.
    /// Silently does nothing once the node budget or the per-name capacity
    /// for this header name is exhausted (spec: "on overflow, parsing
    /// continues without caching").
    pub fn insert(&mut self, name: &str, raw_value: &[u8], header: Header) {
        if self.nodes_used >= self.node_budget {
            return;
        }
        let entries = self.by_name.entry(name.to_ascii_lowercase().into_boxed_str()).or_default();
        if entries.len() >= self.capacity_per_name {
            return;
        }
        entries.push(CacheEntry {
            raw_value: raw_value.into(),
            header,
        });
        self.nodes_used += 1;
    }
}

impl Default for HeaderCache {
    fn default() -> Self {
        Self::new(12, 512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_name_equality() {
        let a = HeaderName::new("Content-Type");
        let b = HeaderName::new("content-type");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Content-Type");
    }

    #[test]
    fn rejects_crlf_in_value() {
        let h = Header::new("X-Evil", Bytes::from_static(b"a\r\nSet-Cookie: evil=1"));
        assert!(!h.is_wire_safe());
    }

    #[test]
    fn header_cache_respects_per_name_capacity() {
        let mut cache = HeaderCache::new(2, 100);
        for i in 0..5 {
            let value = format!("v{i}");
            cache.insert("x-test", value.as_bytes(), Header::new("X-Test", value.clone()));
        }
        assert!(cache.lookup("x-test", b"v0").is_some());
        assert!(cache.lookup("x-test", b"v1").is_some());
        // Third distinct value for the same name overflowed the per-name cap.
        assert!(cache.lookup("x-test", b"v2").is_none());
    }

    #[test]
    fn header_cache_respects_node_budget() {
        let mut cache = HeaderCache::new(12, 1);
        cache.insert("a", b"1", Header::new("a", "1"));
        cache.insert("b", b"2", Header::new("b", "2"));
        assert!(cache.lookup("a", b"1").is_some());
        assert!(cache.lookup("b", b"2").is_none());
    }
}
