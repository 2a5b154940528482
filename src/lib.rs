#![warn(future_incompatible, nonstandard_style, rust_2018_idioms, unused)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::similar_names,
    clippy::cast_possible_truncation
)]

//! A protocol-layer HTTP stack: HTTP/1.1 framing, HTTP/2 multiplexed
//! framing with HPACK, WebSocket framing, and a client connection pool, all
//! built over `tokio::io::{AsyncRead, AsyncWrite}` (spec §OVERVIEW, AMBIENT-1).
//!
//! Grounded on `Atte-http2`, a single-purpose HTTP/2 client; this crate
//! keeps its HPACK/frame/flow-control/multiplexer core (`h2`) and adds the
//! HTTP/1 (`h1`) and WebSocket (`ws`) framing layers plus the pooling and
//! server-side connection drivers (`client`, `server`) the teacher never
//! needed.

pub mod client;
pub mod config;
pub mod date;
pub mod entity;
pub mod error;
pub mod h1;
pub mod h2;
pub mod headers;
pub mod message;
pub mod method;
pub mod server;
pub mod uri;
pub mod ws;

pub use bytes::Bytes;
pub use config::StackConfig;
pub use entity::Entity;
pub use error::{HttpError, Result};
pub use message::{HttpRequest, HttpResponse, Version};
pub use method::Method;
pub use uri::Uri;
