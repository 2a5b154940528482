//! The `Entity` data model (spec §3): the four framing strategies an
//! HTTP message body can use, plus the lazy byte-sequence abstraction they
//! share.
//!
//! Grounded on the "Source/Sink/Flow" re-architecture note in spec §9:
//! "map to async reader/writer traits and transform functions over byte
//! streams. Back-pressure is modeled by bounded channels with explicit
//! capacities." `ByteSource` is exactly that — a bounded `tokio::sync::mpsc`
//! receiver, the same channel-as-backpressure idiom `Atte-http2` uses for
//! its request queue (`connection.rs`, `std::sync::mpsc::channel`), lifted to
//! async.

use crate::error::{HttpError, Result};
use crate::headers::Headers;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Every entity has exactly one content-type, possibly the "no content-type"
/// sentinel (spec §3 invariant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Known(Bytes),
    None,
}

impl ContentType {
    pub fn from_header(value: Option<&Bytes>) -> Self {
        match value {
            Some(v) => Self::Known(v.clone()),
            None => Self::None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Known(b) => Some(b),
            Self::None => None,
        }
    }
}

/// A pull-based, backpressured, at-most-once-consumable byte sequence.
/// The channel itself enforces "consumed at most once": once a receiver's
/// stream ends (or the struct is dropped), there is no way to read it again.
pub struct ByteSource {
    rx: mpsc::Receiver<Result<Bytes>>,
}

impl ByteSource {
    pub fn new(rx: mpsc::Receiver<Result<Bytes>>) -> Self {
        Self { rx }
    }

    /// A channel pair sized `capacity` deep — the producer blocks once the
    /// consumer falls `capacity` chunks behind, which is the whole of the
    /// back-pressure story for lazy entities (spec §5).
    pub fn channel(capacity: usize) -> (mpsc::Sender<Result<Bytes>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    /// A `ByteSource` that immediately yields a single materialized buffer;
    /// used when adapting already-available bytes (e.g. a `Strict` entity)
    /// to code that wants the lazy interface uniformly.
    pub fn from_bytes(bytes: Bytes) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(Ok(bytes));
        drop(tx);
        Self { rx }
    }

    pub async fn next(&mut self) -> Option<Result<Bytes>> {
        self.rx.recv().await
    }

    /// Drain the whole source into one buffer. Used by `Strict` consumers
    /// and by tests; not used on the hot streaming path.
    pub async fn collect(mut self) -> Result<Bytes> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(out))
    }
}

/// One chunk of a `Chunked` entity body (spec §3, §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub data: Bytes,
    pub extension: Option<Bytes>,
}

/// The terminal zero-size chunk, carrying optional extension and trailers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastChunk {
    pub extension: Option<Bytes>,
    pub trailers: Headers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkEvent {
    Chunk(Chunk),
    Last(LastChunk),
}

/// Lazy sequence of chunk events, the `Chunked` analogue of `ByteSource`.
pub struct ChunkSource {
    rx: mpsc::Receiver<Result<ChunkEvent>>,
}

impl ChunkSource {
    pub fn new(rx: mpsc::Receiver<Result<ChunkEvent>>) -> Self {
        Self { rx }
    }

    pub fn channel(capacity: usize) -> (mpsc::Sender<Result<ChunkEvent>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }

    pub async fn next(&mut self) -> Option<Result<ChunkEvent>> {
        self.rx.recv().await
    }
}

/// A fully materialized entity: content-type plus a complete buffer.
pub struct StrictEntity {
    pub content_type: ContentType,
    pub body: Bytes,
}

/// An entity with a declared `Content-Length`. The declared length must
/// match the bytes actually produced; mismatches are distinct underflow vs.
/// overflow framing errors (spec §3, §8 invariant).
pub struct DefaultEntity {
    pub content_type: ContentType,
    pub declared_length: u64,
    pub body: ByteSource,
}

impl DefaultEntity {
    /// Reads the whole body while enforcing the declared length, the
    /// concrete realization of the §8 invariant ("the rendered body contains
    /// exactly L bytes; mismatches raise the specified exception").
    pub async fn read_verified(mut self) -> Result<Bytes> {
        let mut produced = 0u64;
        let mut out = Vec::with_capacity(self.declared_length.min(1 << 20) as usize);
        while let Some(chunk) = self.body.next().await {
            let chunk = chunk?;
            produced += chunk.len() as u64;
            if produced > self.declared_length {
                return Err(HttpError::framing(
                    "entity length overflow",
                    format!(
                        "produced {produced} bytes, declared Content-Length {}",
                        self.declared_length
                    ),
                ));
            }
            out.extend_from_slice(&chunk);
        }
        if produced < self.declared_length {
            return Err(HttpError::framing(
                "entity length underflow",
                format!(
                    "produced {produced} bytes, declared Content-Length {}",
                    self.declared_length
                ),
            ));
        }
        Ok(Bytes::from(out))
    }
}

/// An entity terminated by transport close; forbidden in HTTP/2 (spec §3).
pub struct CloseDelimitedEntity {
    pub content_type: ContentType,
    pub body: ByteSource,
}

/// A chunked-transfer-encoded entity.
pub struct ChunkedEntity {
    pub content_type: ContentType,
    pub chunks: ChunkSource,
}

pub enum Entity {
    Strict(StrictEntity),
    Default(DefaultEntity),
    CloseDelimited(CloseDelimitedEntity),
    Chunked(ChunkedEntity),
}

impl Entity {
    pub fn empty() -> Self {
        Entity::Strict(StrictEntity {
            content_type: ContentType::None,
            body: Bytes::new(),
        })
    }

    pub fn content_type(&self) -> &ContentType {
        match self {
            Entity::Strict(e) => &e.content_type,
            Entity::Default(e) => &e.content_type,
            Entity::CloseDelimited(e) => &e.content_type,
            Entity::Chunked(e) => &e.content_type,
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, Entity::Chunked(_))
    }

    pub fn is_close_delimited(&self) -> bool {
        matches!(self, Entity::CloseDelimited(_))
    }
}
