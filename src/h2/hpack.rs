//! HPACK header compression, wrapping the `hpack` crate (already a teacher
//! dependency in `Atte-http2/Cargo.toml`).
//!
//! `Atte-http2/src/hpack.rs` sketched its own encoder/decoder but left both
//! bodies unimplemented (`Bytes::new()`/`Vec::new()` stubs) and fell back to
//! the real `hpack` crate in its own tests. This module does the wrapping
//! the teacher's stub never finished: a thin, connection-scoped adapter over
//! `hpack::{Encoder, Decoder}` that speaks in this crate's `Headers` type and
//! tracks the dynamic-table-size-update acknowledgment flow (spec §4.3).

use crate::error::HttpError;
use crate::headers::{Header, Headers};
use bytes::Bytes;

pub struct HpackEncoder {
    inner: hpack::Encoder<'static>,
    pending_table_size_update: Option<usize>,
}

impl HpackEncoder {
    pub fn new() -> Self {
        Self {
            inner: hpack::Encoder::new(),
            pending_table_size_update: None,
        }
    }

    /// Called when our peer's SETTINGS_HEADER_TABLE_SIZE changes; the update
    /// is applied as a dynamic-table-size-update entry at the start of the
    /// next header block we emit (RFC 7541 §6.3).
    pub fn notify_peer_table_size(&mut self, new_size: usize) {
        self.pending_table_size_update = Some(new_size);
    }

    pub fn encode(&mut self, headers: &Headers, pseudo: &[(&str, &str)]) -> Bytes {
        if let Some(size) = self.pending_table_size_update.take() {
            self.inner.set_max_table_size(size);
        }
        let mut pairs: Vec<(&[u8], &[u8])> = Vec::with_capacity(pseudo.len() + headers.len());
        for (k, v) in pseudo {
            pairs.push((k.as_bytes(), v.as_bytes()));
        }
        for h in headers.iter() {
            pairs.push((h.name.canonical().as_bytes(), &h.value));
        }
        Bytes::from(self.inner.encode(pairs))
    }
}

impl Default for HpackEncoder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HpackDecoder {
    inner: hpack::Decoder<'static>,
}

/// A decoded header block, split into HTTP/2 pseudo-headers (`:method`,
/// `:path`, ...) and regular headers, since the two land in different parts
/// of this crate's message model (spec §4.3).
#[derive(Debug, Default)]
pub struct DecodedBlock {
    pub pseudo: Vec<(String, String)>,
    pub headers: Headers,
}

impl HpackDecoder {
    pub fn new() -> Self {
        Self {
            inner: hpack::Decoder::new(),
        }
    }

    pub fn decode(&mut self, block: &[u8]) -> Result<DecodedBlock, HttpError> {
        let mut out = DecodedBlock::default();
        self.inner
            .decode_with_cb(block, |name, value| {
                let name = String::from_utf8_lossy(&name).into_owned();
                let value = String::from_utf8_lossy(&value).into_owned();
                if let Some(stripped) = name.strip_prefix(':') {
                    out.pseudo.push((format!(":{stripped}"), value));
                } else {
                    out.headers
                        .push(Header::new(name.as_str(), Bytes::from(value)));
                }
            })
            .map_err(|e| HttpError::hpack("HPACK decode error", format!("{e:?}")))?;
        Ok(out)
    }
}

impl Default for HpackDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_headers() {
        let mut enc = HpackEncoder::new();
        let mut dec = HpackDecoder::new();

        let mut headers = Headers::new();
        headers.push(Header::new("x-test", Bytes::from_static(b"value")));
        let block = enc.encode(&headers, &[(":method", "GET"), (":path", "/")]);

        let decoded = dec.decode(&block).unwrap();
        assert!(decoded.pseudo.contains(&(":method".to_owned(), "GET".to_owned())));
        assert!(decoded.pseudo.contains(&(":path".to_owned(), "/".to_owned())));
        assert_eq!(decoded.headers.get("x-test").unwrap().value_str(), Some("value"));
    }
}
