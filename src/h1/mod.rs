//! HTTP/1.1 message framing (spec [H1] module): start-line/header parsing,
//! chunked transfer-coding, rendering, and the per-connection keep-alive
//! driver.

pub mod chunked;
pub mod connection;
pub mod parser;
pub mod renderer;

pub use connection::{ClientConnection, ServerConnection};
