//! HTTP/1.x connection drivers: the client request/response round trip and
//! the server request-handling loop, both over the shared byte-stream
//! substrate (`io::Connection`, AMBIENT-1) and both built from
//! `h1::parser`/`h1::renderer`.
//!
//! Keep-alive/close lifecycle management has no direct teacher precedent
//! (`Atte-http2` only speaks HTTP/2, which has no such notion); it follows
//! directly from `h1::renderer::decide_persistence`'s truth table.

use super::chunked::{self, ChunkedDecoder, DecodeOutcome};
use super::parser::{self, EntityFraming};
use super::renderer;
use crate::config::H1Config;
use crate::entity::{ByteSource, ChunkedEntity, CloseDelimitedEntity, DefaultEntity, Entity};
use crate::error::HttpError;
use crate::headers::HeaderCache;
use crate::message::{HttpRequest, HttpResponse};
use crate::method::Method;
use bytes::{Bytes, BytesMut};
use std::future::Future;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Streams whichever entity framing a message used onto the wire, the
/// outgoing counterpart to `read_entity`. `Default` bodies are verified
/// against their declared length as they're written (spec §4.2, §8
/// invariant); a mismatched chunk is never written, and a short body is
/// rejected once the source is exhausted.
async fn write_entity<IO: AsyncWrite + Unpin>(io: &mut IO, entity: Entity) -> Result<(), HttpError> {
    match entity {
        Entity::Strict(s) => {
            io.write_all(&s.body).await?;
        }
        Entity::Default(mut d) => {
            let mut produced = 0u64;
            while let Some(chunk) = d.body.next().await {
                let chunk = chunk?;
                produced += chunk.len() as u64;
                if produced > d.declared_length {
                    return Err(HttpError::framing(
                        "entity length overflow",
                        format!("produced {produced} bytes, declared Content-Length {}", d.declared_length),
                    ));
                }
                io.write_all(&chunk).await?;
            }
            if produced < d.declared_length {
                return Err(HttpError::framing(
                    "entity length underflow",
                    format!("produced {produced} bytes, declared Content-Length {}", d.declared_length),
                ));
            }
        }
        Entity::CloseDelimited(mut c) => {
            while let Some(chunk) = c.body.next().await {
                io.write_all(&chunk?).await?;
            }
        }
        Entity::Chunked(mut c) => {
            let mut out = BytesMut::new();
            while let Some(event) = c.chunks.next().await {
                out.clear();
                match event? {
                    crate::entity::ChunkEvent::Chunk(chunk) => {
                        chunked::encode_chunk(&mut out, &chunk.data, chunk.extension.as_deref());
                    }
                    crate::entity::ChunkEvent::Last(last) => {
                        chunked::encode_last_chunk(&mut out, last.extension.as_deref(), &last.trailers);
                    }
                }
                io.write_all(&out).await?;
            }
        }
    }
    Ok(())
}

/// Reads a complete entity body off `buf`/`io` per the framing decided by
/// `h1::parser`. For simplicity this crate materializes the body instead of
/// handing callers a lazy `ByteSource` across the connection's own read
/// loop; `ByteSource`/`ChunkSource` remain the public type for entities that
/// arrive already fully formed (spec §3).
async fn read_entity<IO: AsyncRead + Unpin>(
    io: &mut IO,
    buf: &mut BytesMut,
    framing: EntityFraming,
    content_type: crate::entity::ContentType,
    config: &H1Config,
) -> Result<Entity, HttpError> {
    match framing {
        EntityFraming::None => Ok(parser::empty_entity(content_type)),
        EntityFraming::ContentLength(n) => {
            let body = read_exact_growing(io, buf, n as usize).await?;
            Ok(Entity::Default(DefaultEntity {
                content_type,
                declared_length: n,
                body: ByteSource::from_bytes(body),
            }))
        }
        EntityFraming::Chunked => {
            let mut decoder = ChunkedDecoder::new(config.limits.max_chunk_size as usize, config.limits.max_chunk_ext_length as usize);
            let mut chunks = Vec::new();
            let mut trailers = crate::headers::Headers::new();
            loop {
                match decoder.feed(buf)? {
                    DecodeOutcome::NeedMore => fill_more(io, buf).await?,
                    DecodeOutcome::Event(crate::entity::ChunkEvent::Chunk(c)) => chunks.push(c.data),
                    DecodeOutcome::Event(crate::entity::ChunkEvent::Last(last)) => {
                        trailers = last.trailers;
                    }
                    DecodeOutcome::Done => break,
                }
            }
            let total: usize = chunks.iter().map(|c| c.len()).sum();
            let mut joined = Vec::with_capacity(total);
            for c in chunks {
                joined.extend_from_slice(&c);
            }
            let (tx, chunk_source) = crate::entity::ChunkSource::channel(1);
            let _ = tx
                .send(Ok(crate::entity::ChunkEvent::Chunk(crate::entity::Chunk {
                    data: Bytes::from(joined),
                    extension: None,
                })))
                .await;
            let _ = tx
                .send(Ok(crate::entity::ChunkEvent::Last(crate::entity::LastChunk {
                    extension: None,
                    trailers,
                })))
                .await;
            Ok(Entity::Chunked(ChunkedEntity { content_type, chunks: chunk_source }))
        }
        EntityFraming::CloseDelimited => {
            // Read until EOF; the caller's loop will observe the resulting
            // connection close and not attempt to reuse it (spec §3: close
            // delimited bodies forbid keep-alive).
            let mut all = std::mem::take(buf);
            let mut chunk = [0u8; 8192];
            loop {
                let n = io.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                all.extend_from_slice(&chunk[..n]);
            }
            Ok(Entity::CloseDelimited(CloseDelimitedEntity {
                content_type,
                body: ByteSource::from_bytes(all.freeze()),
            }))
        }
    }
}

async fn read_exact_growing<IO: AsyncRead + Unpin>(io: &mut IO, buf: &mut BytesMut, n: usize) -> Result<Bytes, HttpError> {
    while buf.len() < n {
        fill_more(io, buf).await?;
    }
    Ok(buf.split_to(n).freeze())
}

async fn fill_more<IO: AsyncRead + Unpin>(io: &mut IO, buf: &mut BytesMut) -> Result<(), HttpError> {
    let mut chunk = [0u8; 8192];
    let n = io.read(&mut chunk).await?;
    if n == 0 {
        return Err(HttpError::transport("connection closed mid-body", ""));
    }
    buf.extend_from_slice(&chunk[..n]);
    Ok(())
}

/// Drives one client connection: send a request, read back the response,
/// and report whether the connection remains reusable.
pub struct ClientConnection<IO> {
    io: IO,
    config: H1Config,
    read_buf: BytesMut,
    cache: HeaderCache,
}

impl<IO: AsyncRead + AsyncWrite + Unpin + Send> ClientConnection<IO> {
    pub fn new(io: IO, config: H1Config) -> Self {
        Self {
            io,
            cache: HeaderCache::new(config.limits.header_cache_capacity_per_name, config.limits.header_cache_node_budget),
            config,
            read_buf: BytesMut::with_capacity(8192),
        }
    }

    /// Returns the response plus whether this connection may be reused for
    /// another request.
    pub async fn roundtrip(&mut self, request: HttpRequest) -> Result<(HttpResponse, bool), HttpError> {
        let method = request.method.clone();
        let local_wants_close = renderer::peer_requested_close(&request.headers, request.version);
        let mut out = BytesMut::new();
        renderer::render_request_head(&request, &self.config, local_wants_close, &mut out);
        self.io.write_all(&out).await?;
        write_entity(&mut self.io, request.entity).await?;

        let head = loop {
            if let Some(head) = parser::parse_response_head(&mut self.read_buf, &self.config, &mut self.cache)? {
                break head;
            }
            fill_more(&mut self.io, &mut self.read_buf).await?;
        };

        let content_type = parser::resolve_content_type(&head.headers, self.config.conflicting_content_type)?;
        let framing = parser::entity_framing_for_response(&head.headers, head.version, head.status, &method)?;
        let peer_close = renderer::peer_requested_close(&head.headers, head.version);
        let entity = read_entity(&mut self.io, &mut self.read_buf, framing, content_type, &self.config).await?;

        let mut response = HttpResponse::new(head.status, head.version);
        response.reason = Some(head.reason);
        response.headers = head.headers;
        response.entity = entity;

        let persistent = renderer::decide_persistence(head.version, peer_close, local_wants_close);
        Ok((response, persistent))
    }
}

/// Drives one server connection, calling `handler` for each pipelined
/// request in sequence until either side closes the connection.
pub struct ServerConnection<IO> {
    io: IO,
    config: H1Config,
    read_buf: BytesMut,
    cache: HeaderCache,
}

impl<IO: AsyncRead + AsyncWrite + Unpin + Send> ServerConnection<IO> {
    pub fn new(io: IO, config: H1Config) -> Self {
        Self {
            io,
            cache: HeaderCache::new(config.limits.header_cache_capacity_per_name, config.limits.header_cache_node_budget),
            config,
            read_buf: BytesMut::with_capacity(8192),
        }
    }

    pub async fn serve<F, Fut>(&mut self, mut handler: F) -> Result<(), HttpError>
    where
        F: FnMut(HttpRequest) -> Fut,
        Fut: Future<Output = HttpResponse>,
    {
        loop {
            let head = loop {
                if let Some(head) = parser::parse_request_head(&mut self.read_buf, &self.config, &mut self.cache)? {
                    break head;
                }
                let mut chunk = [0u8; 8192];
                let n = self.io.read(&mut chunk).await?;
                if n == 0 {
                    return Ok(());
                }
                self.read_buf.extend_from_slice(&chunk[..n]);
            };

            let content_type = parser::resolve_content_type(&head.headers, self.config.conflicting_content_type)?;
            let framing = parser::entity_framing_for_request(&head.headers, head.version)?;
            let peer_close = renderer::peer_requested_close(&head.headers, head.version);
            let entity = read_entity(&mut self.io, &mut self.read_buf, framing, content_type, &self.config).await?;

            let mut request = HttpRequest::new(head.method.clone(), head.uri, head.version);
            request.headers = head.headers;
            request.entity = entity;
            let suppress_body = matches!(head.method, Method::Head);

            let response = handler(request).await;
            let persistent = renderer::decide_persistence(head.version, peer_close, false) && !suppress_body_forces_close(&response);

            let mut out = BytesMut::new();
            renderer::render_response_head(&response, &self.config, !persistent, &mut out);
            self.io.write_all(&out).await?;
            if suppress_body {
                drop(response.entity);
            } else {
                write_entity(&mut self.io, response.entity).await?;
            }

            if !persistent {
                return Ok(());
            }
        }
    }
}

fn suppress_body_forces_close(_response: &HttpResponse) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ByteSource, Chunk, ChunkEvent, ChunkSource, ContentType, LastChunk};
    use crate::headers::Header;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn write_entity_streams_chunked_body_with_extensions() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let (tx, chunks) = ChunkSource::channel(4);
        let entity = Entity::Chunked(ChunkedEntity { content_type: ContentType::None, chunks });

        tx.send(Ok(ChunkEvent::Chunk(Chunk {
            data: Bytes::from_static(b"body123"),
            extension: Some(Bytes::from_static(b"key=value;another=\"tl;dr\"")),
        })))
        .await
        .unwrap();
        let mut trailers = crate::headers::Headers::new();
        trailers.push(Header::new("Age", "30"));
        tx.send(Ok(ChunkEvent::Last(LastChunk { extension: Some(Bytes::from_static(b"foo=bar")), trailers })))
            .await
            .unwrap();
        drop(tx);

        write_entity(&mut client, entity).await.unwrap();
        drop(client);

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(&received[..], &b"7;key=value;another=\"tl;dr\"\r\nbody123\r\n0;foo=bar\r\nAge: 30\r\n\r\n"[..]);
    }

    #[tokio::test]
    async fn write_entity_streams_close_delimited_body() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let (tx, body) = ByteSource::channel(4);
        let entity = Entity::CloseDelimited(CloseDelimitedEntity { content_type: ContentType::None, body });
        tx.send(Ok(Bytes::from_static(b"part one "))).await.unwrap();
        tx.send(Ok(Bytes::from_static(b"part two"))).await.unwrap();
        drop(tx);

        write_entity(&mut client, entity).await.unwrap();
        drop(client);

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(&received[..], &b"part one part two"[..]);
    }

    #[tokio::test]
    async fn write_entity_verifies_declared_length_on_underflow() {
        let (mut client, _server) = tokio::io::duplex(4096);
        let (tx, body) = ByteSource::channel(4);
        let entity = Entity::Default(DefaultEntity { content_type: ContentType::None, declared_length: 10, body });
        tx.send(Ok(Bytes::from_static(b"short"))).await.unwrap();
        drop(tx);

        let err = write_entity(&mut client, entity).await.unwrap_err();
        assert!(matches!(err, HttpError::Framing(_)));
    }

    #[tokio::test]
    async fn write_entity_rejects_overflow_before_writing_excess_chunk() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let (tx, body) = ByteSource::channel(4);
        let entity = Entity::Default(DefaultEntity { content_type: ContentType::None, declared_length: 4, body });
        tx.send(Ok(Bytes::from_static(b"four"))).await.unwrap();
        tx.send(Ok(Bytes::from_static(b"extra"))).await.unwrap();
        drop(tx);

        let err = write_entity(&mut client, entity).await.unwrap_err();
        assert!(matches!(err, HttpError::Framing(_)));
        drop(client);

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(&received[..], &b"four"[..]);
    }
}
