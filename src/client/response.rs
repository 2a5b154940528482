//! Convenience accessors for inbound client responses.
//!
//! Grounded on `Atte-http2/src/response.rs::Response::{header,status}`;
//! generalized from its flat `Vec<(String,String)>` header list to this
//! crate's `Headers`, and extended with a body-materializing helper since
//! `HttpResponse::entity` can be any of the four lazy/strict framings.

use crate::entity::Entity;
use crate::error::HttpError;
use crate::message::HttpResponse;
use bytes::Bytes;

/// Header lookup on `HttpResponse` mirroring the teacher's
/// `Response::header` accessor.
pub trait HttpResponseExt {
    fn header(&self, name: &str) -> Option<&str>;
}

impl HttpResponseExt for HttpResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|h| h.value_str())
    }
}

/// Drains whichever entity framing a response used into one contiguous
/// buffer (spec §3: all four entity kinds expose a byte sequence, this just
/// picks the right consumption path for each). A free function rather than
/// a trait method since it consumes the response by value and async trait
/// methods need either nightly support or an extra dependency this crate's
/// stack doesn't carry.
pub async fn into_body_bytes(response: HttpResponse) -> Result<Bytes, HttpError> {
    match response.entity {
        Entity::Strict(s) => Ok(s.body),
        Entity::Default(d) => d.read_verified().await,
        Entity::CloseDelimited(c) => c.body.collect().await,
        Entity::Chunked(c) => {
            let mut out = Vec::new();
            let mut source = c.chunks;
            while let Some(event) = source.next().await {
                match event? {
                    crate::entity::ChunkEvent::Chunk(chunk) => out.extend_from_slice(&chunk.data),
                    crate::entity::ChunkEvent::Last(_) => break,
                }
            }
            Ok(Bytes::from(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ContentType, StrictEntity};
    use crate::message::Version;

    #[tokio::test]
    async fn strict_body_drains_directly() {
        let mut response = HttpResponse::new(200, Version::Http11);
        response.entity = Entity::Strict(StrictEntity { content_type: ContentType::None, body: Bytes::from_static(b"ok") });
        assert_eq!(into_body_bytes(response).await.unwrap(), Bytes::from_static(b"ok"));
    }
}
