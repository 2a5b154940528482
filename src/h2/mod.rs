//! HTTP/2 multiplexed framing (spec [H2] module): frame codec, HPACK, flow
//! control, the per-stream state machine, and the connection driver that
//! ties them together. See `Atte-http2/src/{connection,stream,
//! stream_coordinator,types,flags,hpack}.rs` for the teacher modules this
//! generalizes.

pub mod connection;
pub mod flags;
pub mod flow_control;
pub mod frame;
pub mod hpack;
pub mod multiplexer;
pub mod settings;
pub mod stream;
pub mod types;

pub use connection::Connection;
pub use multiplexer::Role;
