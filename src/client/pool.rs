//! Per-(host, port, encryption, settings) connection pool (spec §4.6).
//!
//! No direct teacher precedent — `Atte-http2` opens exactly one connection
//! per `Client::get` call (`client.rs`) — so the admission-control and
//! response-correlation shape here follows spec.md §4.6 directly, reusing
//! the channel/oneshot correlation idiom this crate already built for
//! `h2::connection::Connection` and `client::connection::ConnectionHandle`.

use super::connection::{ConnectionHandle, Protocol};
use crate::config::{H1Config, H2Config, PoolConfig};
use crate::error::HttpError;
use crate::message::{HttpRequest, HttpResponse};
use crate::uri::Uri;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, Semaphore};

/// Anything the pool can drive a connection over, type-erased so a `Pool`
/// doesn't need to be generic over a concrete transport.
pub trait IoStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IoStream for T {}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Establishes new transport connections for a pool. TLS/TCP setup itself
/// is out of scope (spec §1 Non-goals); this is the seam a caller plugs a
/// `tokio::net::TcpStream` or `tokio_rustls::client::TlsStream` connector
/// into (spec §AMBIENT-1).
pub trait Connector: Send + Sync {
    fn connect(&self, host: String, port: u16, encrypted: bool) -> BoxFuture<'static, Result<Box<dyn IoStream>, HttpError>>;
}

/// The key spec §4.6 groups connections by: host, port, whether the
/// transport is encrypted, and a fingerprint of the settings that would
/// otherwise make two connections with the same host/port incompatible to
/// share (differing HTTP/2 SETTINGS, differing H1 pipelining limits, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolId {
    pub host: String,
    pub port: u16,
    pub encrypted: bool,
    pub settings_fingerprint: u64,
}

impl PoolId {
    pub fn new(host: impl Into<String>, port: u16, encrypted: bool, settings_fingerprint: u64) -> Self {
        Self { host: host.into(), port, encrypted, settings_fingerprint }
    }

    /// Derives a pool id from a request's absolute URI. Requests without an
    /// absolute URI and no usable authority fail fast (spec §4.6 `submit`).
    pub fn from_uri(uri: &Uri, settings_fingerprint: u64) -> Result<Self, HttpError> {
        let authority = uri
            .authority
            .as_ref()
            .ok_or_else(|| HttpError::configuration("non-absolute URI submitted to pool", uri.path.clone()))?;
        let port = uri
            .effective_port()
            .ok_or_else(|| HttpError::configuration("no resolvable port for pool URI", authority.host.clone()))?;
        Ok(Self::new(authority.host.clone(), port, uri.is_encrypted(), settings_fingerprint))
    }
}

/// Hashes the fields of an `H2Config`/`H1Config` pair that make two
/// connections incompatible to share within the same pool id.
pub fn settings_fingerprint(h1: &H1Config, h2: &H2Config) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    h1.pipelining_limit.hash(&mut hasher);
    h2.max_concurrent_streams.hash(&mut hasher);
    h2.initial_window_size.hash(&mut hasher);
    h2.max_frame_size.hash(&mut hasher);
    h2.header_table_size.hash(&mut hasher);
    hasher.finish()
}

struct Slot {
    handle: ConnectionHandle,
    in_flight: AtomicUsize,
    last_used: Mutex<Instant>,
}

/// One pool: up to `max_connections` connections to the same (host, port,
/// encryption, settings) endpoint, each accepting up to `pipelining_limit`
/// concurrent in-flight requests.
pub struct Pool {
    id: PoolId,
    connector: Arc<dyn Connector>,
    protocol: Protocol,
    config: PoolConfig,
    h1_config: H1Config,
    h2_config: H2Config,
    slots: Mutex<Vec<Arc<Slot>>>,
    admission: Semaphore,
}

impl Pool {
    pub fn new(
        id: PoolId,
        connector: Arc<dyn Connector>,
        protocol: Protocol,
        config: PoolConfig,
        h1_config: H1Config,
        h2_config: H2Config,
    ) -> Self {
        let permits = config.max_connections.saturating_mul(config.pipelining_limit).max(1);
        Self {
            id,
            connector,
            protocol,
            config,
            h1_config,
            h2_config,
            slots: Mutex::new(Vec::new()),
            admission: Semaphore::new(permits),
        }
    }

    pub fn id(&self) -> &PoolId {
        &self.id
    }

    /// Submits one request, returning its response paired with the opaque
    /// `user_ctx` the caller supplied (spec §4.6 response correlation: the
    /// pool never needs to interpret `user_ctx`, only hand it back).
    pub async fn submit<C>(&self, request: HttpRequest, user_ctx: C) -> (Result<HttpResponse, HttpError>, C) {
        let method = request.method.clone();
        let _permit = match self.admission.acquire().await {
            Ok(p) => p,
            Err(_) => return (Err(HttpError::transport("pool shut down", "")), user_ctx),
        };

        let mut attempt = 0u32;
        let mut last_request = Some(request);
        loop {
            let slot = match self.acquire_slot().await {
                Ok(s) => s,
                Err(e) => return (Err(e), user_ctx),
            };
            slot.in_flight.fetch_add(1, Ordering::SeqCst);
            let request = last_request.take().expect("request retained across retries");
            let request_for_retry_clone = clone_request_if_retryable(&request);
            let result = slot.handle.submit(request).await;
            slot.in_flight.fetch_sub(1, Ordering::SeqCst);
            *slot.last_used.lock().await = Instant::now();

            match result {
                Err(e) if e.is_retryable() && method.is_idempotent() && attempt < self.config.max_retries => {
                    attempt += 1;
                    self.drop_dead_slots().await;
                    last_request = request_for_retry_clone;
                    if last_request.is_none() {
                        return (Err(e), user_ctx);
                    }
                    continue;
                }
                other => return (other, user_ctx),
            }
        }
    }

    /// Opens a single-connection transport outside the pool (spec §4.6
    /// `newConnection`): not cached, not admission-controlled, torn down
    /// once the caller drops it.
    pub async fn new_connection(&self) -> Result<ConnectionHandle, HttpError> {
        let io = self.connector.connect(self.id.host.clone(), self.id.port, self.id.encrypted).await?;
        ConnectionHandle::spawn(io, self.protocol, self.h1_config.clone(), self.h2_config.clone()).await
    }

    async fn acquire_slot(&self) -> Result<Arc<Slot>, HttpError> {
        self.drop_dead_slots().await;
        let mut slots = self.slots.lock().await;
        let least_loaded = slots
            .iter()
            .filter(|s| s.in_flight.load(Ordering::SeqCst) < self.config.pipelining_limit)
            .min_by_key(|s| s.in_flight.load(Ordering::SeqCst))
            .cloned();
        if let Some(slot) = least_loaded {
            return Ok(slot);
        }
        if slots.len() >= self.config.max_connections {
            // All connections are at their pipelining limit; reuse the
            // least-loaded one rather than queue indefinitely (the
            // semaphore already bounds total in-flight submissions).
            return slots
                .iter()
                .min_by_key(|s| s.in_flight.load(Ordering::SeqCst))
                .cloned()
                .ok_or_else(|| HttpError::transport("pool exhausted", "no connections available"));
        }
        let io = self.connector.connect(self.id.host.clone(), self.id.port, self.id.encrypted).await?;
        let handle = ConnectionHandle::spawn(io, self.protocol, self.h1_config.clone(), self.h2_config.clone()).await?;
        let slot = Arc::new(Slot { handle, in_flight: AtomicUsize::new(0), last_used: Mutex::new(Instant::now()) });
        slots.push(slot.clone());
        Ok(slot)
    }

    /// Idle-timeout and dead-connection sweeping (spec §4.6 "idle
    /// shutdown"). Swept lazily on each acquisition rather than by a
    /// dedicated ticking task, since every `submit` already takes the slots
    /// lock.
    async fn drop_dead_slots(&self) {
        let mut slots = self.slots.lock().await;
        let idle_timeout = self.config.idle_timeout;
        let mut keep = Vec::with_capacity(slots.len());
        for slot in slots.drain(..) {
            let idle_for = slot.last_used.lock().await.elapsed();
            let in_flight = slot.in_flight.load(Ordering::SeqCst);
            if slot.handle.is_dead() || (in_flight == 0 && idle_for >= idle_timeout) {
                continue;
            }
            keep.push(slot);
        }
        *slots = keep;
    }

    /// Idempotent graceful shutdown (spec §4.6 `shutdown`): drops every
    /// connection handle, which closes each submission channel and lets
    /// already-dispatched requests finish delivering their responses.
    pub async fn shutdown(&self) {
        let mut slots = self.slots.lock().await;
        slots.clear();
    }

    /// True once this pool holds no live connections, i.e. it is safe for
    /// the registry to deregister it (spec §4.6 idle-pool lifecycle).
    pub async fn is_idle(&self) -> bool {
        self.drop_dead_slots().await;
        self.slots.lock().await.is_empty()
    }
}

/// Idempotent methods never carry a body that can't be resent; non-
/// idempotent ones fail fast instead of retrying (spec §4.6 Retry policy).
/// Since this crate materializes entity bodies (see `h1::connection`), a
/// retried idempotent request is only safe to resend when it has no body
/// left to consume twice.
fn clone_request_if_retryable(request: &HttpRequest) -> Option<HttpRequest> {
    if !request.method.is_idempotent() {
        return None;
    }
    match &request.entity {
        crate::entity::Entity::Strict(s) => {
            let mut clone = HttpRequest::new(request.method.clone(), request.uri.clone(), request.version);
            clone.headers = request.headers.clone();
            clone.entity = crate::entity::Entity::Strict(crate::entity::StrictEntity {
                content_type: s.content_type.clone(),
                body: s.body.clone(),
            });
            Some(clone)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uri::UriParsingMode;

    #[test]
    fn pool_id_from_absolute_uri() {
        let uri = Uri::parse_absolute("https://example.com:8443/a").unwrap();
        let id = PoolId::from_uri(&uri, 0).unwrap();
        assert_eq!(id.host, "example.com");
        assert_eq!(id.port, 8443);
        assert!(id.encrypted);
    }

    #[test]
    fn pool_id_rejects_origin_form_uri() {
        let uri = Uri::parse_origin_form("/a", UriParsingMode::Strict).unwrap();
        assert!(PoolId::from_uri(&uri, 0).is_err());
    }
}
