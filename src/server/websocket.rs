//! Server-side WebSocket upgrade (spec §4.5 handshake, server half).
//!
//! No teacher precedent (`Atte-http2` speaks neither HTTP/1 nor
//! WebSocket); grounded on `ws::handshake::validate_client_request`/
//! `accept_response` plus `h1::renderer::render_response_head`, the same
//! head-rendering function the ordinary HTTP/1 server path uses, since a
//! 101 response is rendered exactly like any other response head.

use crate::config::{H1Config, WebSocketConfig};
use crate::error::HttpError;
use crate::h1::renderer;
use crate::h2::multiplexer::Role;
use crate::message::HttpRequest;
use crate::ws::{self, WebSocketConnection};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Validates `request` as a WebSocket upgrade, writes the 101 response, and
/// hands back a connection driver over the same transport. `io` must not
/// have been read from since `request`'s head was parsed off it — any bytes
/// already in flight belong to the WebSocket framing, not HTTP.
pub async fn accept<IO>(
    mut io: IO,
    request: &HttpRequest,
    h1_config: &H1Config,
    ws_config: WebSocketConfig,
    chosen_protocol: Option<&str>,
) -> Result<WebSocketConnection<IO>, HttpError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send,
{
    let key = ws::handshake::validate_client_request(request)?;
    let response = ws::handshake::accept_response(&key, chosen_protocol);
    let mut out = BytesMut::new();
    renderer::render_response_head(&response, h1_config, false, &mut out);
    io.write_all(&out).await?;
    Ok(WebSocketConnection::new(io, Role::Server, ws_config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::H1Config;
    use crate::ws::handshake;

    #[tokio::test]
    async fn accept_upgrades_a_valid_handshake_request() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let uri = crate::uri::Uri::parse_absolute("ws://example.com/chat").unwrap();
        let (request, key) = handshake::client_request(&uri, &[]);

        let server_task = tokio::spawn(async move {
            accept(server_io, &request, &H1Config::default(), WebSocketConfig::default(), None).await
        });

        let mut client_io = client_io;
        let mut buf = [0u8; 4096];
        use tokio::io::AsyncReadExt;
        let n = client_io.read(&mut buf).await.unwrap();
        let response_text = String::from_utf8_lossy(&buf[..n]);
        assert!(response_text.starts_with("HTTP/1.1 101"));

        let ws_conn = server_task.await.unwrap();
        assert!(ws_conn.is_ok());
        let _ = key;
    }
}
