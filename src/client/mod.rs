//! Client-side connection, pooling, and request/response convenience API
//! (spec §4.6), grounded on `Atte-http2`'s `client.rs`/`connection.rs`
//! single-connection client, generalized to pool multiple connections per
//! endpoint and to run either HTTP/1 or HTTP/2 underneath.

pub mod connection;
pub mod pool;
pub mod registry;
pub mod request;
pub mod response;

pub use connection::{ConnectionHandle, Protocol};
pub use pool::{Connector, IoStream, Pool, PoolId};
pub use registry::PoolRegistry;
pub use response::{into_body_bytes, HttpResponseExt};
