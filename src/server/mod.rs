//! Server-side connection driving and WebSocket upgrade (spec §4.6,
//! SUPPLEMENT-3's client/server symmetry note).
//!
//! `Atte-http2` has no server side to ground this on directly; `connection`
//! follows from this crate's own `h1::ServerConnection`/`h2::connection`
//! drivers, and `websocket` from this crate's own `ws::handshake`.

pub mod connection;
pub mod websocket;

pub use connection::serve;
