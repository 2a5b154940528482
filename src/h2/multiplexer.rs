//! Stream table, ID allocation and admission control for one HTTP/2
//! connection.
//!
//! Grounded on `Atte-http2/src/stream_coordinator.rs::StreamCoordinator`,
//! which already used a `DashMap<NonZeroStreamId, Stream>` keyed map with an
//! atomic ID counter; generalized here to take a `Role` (client IDs are odd,
//! server IDs are even, RFC 7540 §5.1.1) and to enforce
//! SETTINGS_MAX_CONCURRENT_STREAMS admission control, which the teacher's
//! coordinator never did.

use super::stream::Stream;
use crate::error::HttpError;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

pub struct Multiplexer {
    role: Role,
    next_local_id: AtomicU32,
    streams: DashMap<u32, Stream>,
    max_concurrent_streams: u32,
}

impl Multiplexer {
    pub fn new(role: Role, max_concurrent_streams: u32) -> Self {
        Self {
            role,
            next_local_id: AtomicU32::new(match role {
                Role::Client => 1,
                Role::Server => 2,
            }),
            streams: DashMap::new(),
            max_concurrent_streams,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn active_count(&self) -> usize {
        self.streams.iter().filter(|s| !s.is_closed()).count()
    }

    /// Allocates the next locally-initiated stream ID, enforcing
    /// SETTINGS_MAX_CONCURRENT_STREAMS before a request is even framed
    /// (spec §8 scenario 5).
    pub fn open_local_stream(
        &self,
        initial_send_window: u32,
        initial_recv_window: u32,
    ) -> Result<u32, HttpError> {
        if self.active_count() as u32 >= self.max_concurrent_streams {
            return Err(HttpError::protocol(
                "stream refused",
                "SETTINGS_MAX_CONCURRENT_STREAMS reached",
            ));
        }
        let id = self.next_local_id.fetch_add(2, Ordering::SeqCst);
        self.streams
            .insert(id, Stream::new(id, initial_send_window, initial_recv_window));
        Ok(id)
    }

    pub fn admit_remote_stream(
        &self,
        id: u32,
        initial_send_window: u32,
        initial_recv_window: u32,
    ) -> Result<(), HttpError> {
        if self.active_count() as u32 >= self.max_concurrent_streams {
            return Err(HttpError::protocol(
                "stream refused",
                "local SETTINGS_MAX_CONCURRENT_STREAMS reached",
            ));
        }
        self.streams
            .entry(id)
            .or_insert_with(|| Stream::new(id, initial_send_window, initial_recv_window));
        Ok(())
    }

    pub fn with_stream<T>(&self, id: u32, f: impl FnOnce(&mut Stream) -> T) -> Option<T> {
        self.streams.get_mut(&id).map(|mut s| f(&mut s))
    }

    pub fn remove_closed(&self) {
        self.streams.retain(|_, s| !s.is_closed());
    }

    pub fn contains(&self, id: u32) -> bool {
        self.streams.contains_key(&id)
    }

    /// Whether `id` was initiated by the remote peer, used to validate
    /// frames arriving for streams we've never heard of (RFC 7540 §5.1.1).
    pub fn is_remote_initiated(&self, id: u32) -> bool {
        let remote_is_odd = self.role == Role::Server;
        (id % 2 == 1) == remote_is_odd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_allocates_odd_stream_ids() {
        let mux = Multiplexer::new(Role::Client, 100);
        assert_eq!(mux.open_local_stream(65_535, 65_535).unwrap(), 1);
        assert_eq!(mux.open_local_stream(65_535, 65_535).unwrap(), 3);
    }

    #[test]
    fn admission_control_rejects_past_limit() {
        let mux = Multiplexer::new(Role::Client, 1);
        mux.open_local_stream(65_535, 65_535).unwrap();
        assert!(mux.open_local_stream(65_535, 65_535).is_err());
    }
}
