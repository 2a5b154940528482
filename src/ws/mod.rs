//! WebSocket framing, message aggregation, handshake, and the close
//! handshake (spec [WS] module, spec.md §4.5).
//!
//! Reuses `h2::multiplexer::Role` for client/server masking direction
//! rather than a second copy of the same enum, per SPEC_FULL.md
//! SUPPLEMENT-3 ("this crate's WebSocket layer also reuses it directly").

pub mod close;
pub mod connection;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod message;

pub use connection::{IncomingMessage, WebSocketConnection, WsEvent};
