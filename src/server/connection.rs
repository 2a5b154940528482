//! Per-connection server drivers: HTTP/1 request handling and HTTP/2
//! request handling, unified behind one `serve` entry point that dispatches
//! on the negotiated protocol.
//!
//! No direct teacher precedent — `Atte-http2` has no server side at all —
//! so this follows spec §4.6/SUPPLEMENT-3 directly: a thin wrapper around
//! `h1::ServerConnection::serve` for HTTP/1, and a channel pump around
//! `h2::connection::Connection::run` with `Role::Server` for HTTP/2.

use crate::client::connection::Protocol;
use crate::config::{H1Config, H2Config};
use crate::error::HttpError;
use crate::h1;
use crate::h2::connection::{Connection as H2Connection, InboundRequest};
use crate::h2::multiplexer::Role;
use crate::message::{HttpRequest, HttpResponse};
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

/// Drives one accepted connection to completion, calling `handler` for every
/// request it receives until the peer disconnects.
pub async fn serve<IO, F, Fut>(io: IO, protocol: Protocol, h1_config: H1Config, h2_config: H2Config, handler: F) -> Result<(), HttpError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    F: FnMut(HttpRequest) -> Fut,
    Fut: Future<Output = HttpResponse>,
{
    match protocol {
        Protocol::Http1 => serve_http1(io, h1_config, handler).await,
        Protocol::Http2 => serve_http2(io, h2_config, handler).await,
    }
}

async fn serve_http1<IO, F, Fut>(io: IO, config: H1Config, handler: F) -> Result<(), HttpError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send,
    F: FnMut(HttpRequest) -> Fut,
    Fut: Future<Output = HttpResponse>,
{
    let mut conn = h1::ServerConnection::new(io, config);
    conn.serve(handler).await
}

async fn serve_http2<IO, F, Fut>(io: IO, config: H2Config, mut handler: F) -> Result<(), HttpError>
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    F: FnMut(HttpRequest) -> Fut,
    Fut: Future<Output = HttpResponse>,
{
    let conn = H2Connection::handshake(io, Role::Server, config).await?;
    let (req_tx, mut req_rx) = mpsc::channel::<InboundRequest>(32);
    let (resp_tx, resp_rx) = mpsc::channel::<(u32, HttpResponse)>(32);
    let (_discard_tx, discard_rx) = mpsc::channel::<crate::h2::connection::PendingRequest>(1);

    let driver = tokio::spawn(conn.run(discard_rx, Some(req_tx), Some(resp_rx)));

    while let Some(inbound) = req_rx.recv().await {
        let response = handler(inbound.request).await;
        if resp_tx.send((inbound.stream_id, response)).await.is_err() {
            break;
        }
    }
    drop(resp_tx);

    driver
        .await
        .map_err(|e| HttpError::transport("h2 server task panicked", e.to_string()))?
}
