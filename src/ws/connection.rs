//! Post-handshake WebSocket connection driver: frame I/O, message
//! aggregation, auto-pong, and the close handshake (spec §4.5).
//!
//! Grounded on `cpkb-bluezoo-tagliacarte/core/src/protocol/websocket/connection.rs`'s
//! `WebSocketConnection` (owns the stream after handshake, `run()` read
//! loop, `send_text`/`send_binary`/`send_ping`/`send_pong`/`send_close`
//! helpers) and on `fastwebsockets`'s auto-pong/auto-close defaults
//! (`examples/other_examples/...fastwebsockets...lib.rs`), reworked around
//! this crate's `Frame`/`MessageAssembler` sans-IO pair instead of a
//! callback-based `FrameHandler`.

use super::close::{self, CloseState};
use super::frame::{self, Opcode, RawFrame};
use super::message::{AssembledMessage, MessageAssembler};
use crate::config::WebSocketConfig;
use crate::error::HttpError;
use crate::h2::multiplexer::Role;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub enum IncomingMessage {
    Text(String),
    Binary(Bytes),
}

impl From<AssembledMessage> for IncomingMessage {
    fn from(m: AssembledMessage) -> Self {
        match m {
            AssembledMessage::Text(s) => IncomingMessage::Text(s),
            AssembledMessage::Binary(b) => IncomingMessage::Binary(b),
        }
    }
}

/// One event surfaced by `WebSocketConnection::next_event`. Ping/Pong are
/// surfaced for visibility even though Ping is auto-answered internally.
pub enum WsEvent {
    Message(IncomingMessage),
    Ping(Bytes),
    Pong(Bytes),
    Closed { code: Option<u16>, reason: String },
}

pub struct WebSocketConnection<IO> {
    io: IO,
    role: Role,
    config: WebSocketConfig,
    read_buf: BytesMut,
    assembler: MessageAssembler,
    close_state: CloseState,
}

impl<IO: AsyncRead + AsyncWrite + Unpin + Send> WebSocketConnection<IO> {
    pub fn new(io: IO, role: Role, config: WebSocketConfig) -> Self {
        Self {
            io,
            role,
            assembler: MessageAssembler::new(config.max_message_size),
            config,
            read_buf: BytesMut::with_capacity(8192),
            close_state: CloseState::Active,
        }
    }

    pub fn close_state(&self) -> CloseState {
        self.close_state
    }

    pub async fn send_text(&mut self, text: &str) -> Result<(), HttpError> {
        self.send_frame(Opcode::Text, text.as_bytes()).await
    }

    pub async fn send_binary(&mut self, data: &[u8]) -> Result<(), HttpError> {
        self.send_frame(Opcode::Binary, data).await
    }

    pub async fn send_ping(&mut self, data: &[u8]) -> Result<(), HttpError> {
        self.send_frame(Opcode::Ping, data).await
    }

    pub async fn send_pong(&mut self, data: &[u8]) -> Result<(), HttpError> {
        self.send_frame(Opcode::Pong, data).await
    }

    async fn send_frame(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), HttpError> {
        let mask_key = match self.role {
            Role::Client => Some(rand::random::<[u8; 4]>()),
            Role::Server => None,
        };
        let mut out = BytesMut::with_capacity(payload.len() + 14);
        frame::encode(&mut out, opcode, true, payload, mask_key);
        self.io.write_all(&out).await?;
        Ok(())
    }

    /// Initiates the local half of the close handshake (spec §4.5): sends
    /// Close, then waits up to `close-timeout` for the peer's echo before
    /// forcing the state to `FullyClosed` regardless.
    pub async fn initiate_close(&mut self, code: u16, reason: &str) -> Result<(), HttpError> {
        if self.close_state != CloseState::Active {
            return Ok(());
        }
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        self.send_frame(Opcode::Close, &payload).await?;
        self.close_state = self.close_state.on_local_close_sent();

        let deadline = tokio::time::sleep(self.config.close_timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => {
                    self.close_state = CloseState::FullyClosed;
                    return Ok(());
                }
                event = self.next_event() => {
                    match event {
                        Ok(WsEvent::Closed { .. }) => return Ok(()),
                        Ok(_) => continue,
                        Err(_) => {
                            self.close_state = CloseState::FullyClosed;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Reads and dispatches frames until one produces an application-visible
    /// event. Frames received once `close_state` has left `Active` (other
    /// than the peer's own Close) are ignored per spec §4.5.
    pub async fn next_event(&mut self) -> Result<WsEvent, HttpError> {
        loop {
            let raw = self.read_frame().await?;
            if self.close_state != CloseState::Active && raw.opcode != Opcode::Close {
                continue;
            }
            match raw.opcode {
                Opcode::Close => return self.handle_close(raw).await,
                Opcode::Ping => {
                    self.send_frame(Opcode::Pong, &raw.payload).await?;
                    return Ok(WsEvent::Ping(raw.payload));
                }
                Opcode::Pong => return Ok(WsEvent::Pong(raw.payload)),
                Opcode::Text | Opcode::Binary | Opcode::Continuation => {
                    if let Some(msg) = self.assembler.on_frame(raw.opcode, raw.fin, raw.payload)? {
                        return Ok(WsEvent::Message(msg.into()));
                    }
                }
            }
        }
    }

    async fn handle_close(&mut self, raw: RawFrame) -> Result<WsEvent, HttpError> {
        let (code, reason) = close::parse_payload(&raw.payload)?;
        let was_active = self.close_state == CloseState::Active;
        self.close_state = self.close_state.on_peer_close_received();
        if was_active {
            let echo = code.unwrap_or(close::code::NORMAL);
            let mut payload = Vec::with_capacity(2);
            payload.extend_from_slice(&echo.to_be_bytes());
            self.send_frame(Opcode::Close, &payload).await?;
        }
        Ok(WsEvent::Closed { code, reason })
    }

    async fn read_frame(&mut self) -> Result<RawFrame, HttpError> {
        loop {
            if let Some(raw) = frame::parse(&mut self.read_buf, self.role, self.config.max_message_size)? {
                return Ok(raw);
            }
            let mut chunk = [0u8; 8192];
            let n = self.io.read(&mut chunk).await?;
            if n == 0 {
                return Err(HttpError::transport(
                    "websocket transport closed",
                    "peer closed the connection without sending a Close frame",
                ));
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebSocketConfig;

    #[tokio::test]
    async fn client_server_exchange_text_message() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let mut client = WebSocketConnection::new(client_io, Role::Client, WebSocketConfig::default());
        let mut server = WebSocketConnection::new(server_io, Role::Server, WebSocketConfig::default());

        client.send_text("hello").await.unwrap();
        match server.next_event().await.unwrap() {
            WsEvent::Message(IncomingMessage::Text(s)) => assert_eq!(s, "hello"),
            _ => panic!("expected text message"),
        }
    }

    #[tokio::test]
    async fn close_handshake_completes_on_both_sides() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let mut client = WebSocketConnection::new(client_io, Role::Client, WebSocketConfig::default());
        let mut server = WebSocketConnection::new(server_io, Role::Server, WebSocketConfig::default());

        let server_task = tokio::spawn(async move {
            let event = server.next_event().await.unwrap();
            matches!(event, WsEvent::Closed { .. })
        });
        client.initiate_close(close::code::NORMAL, "done").await.unwrap();
        assert!(server_task.await.unwrap());
        assert_eq!(client.close_state(), CloseState::FullyClosed);
    }
}
