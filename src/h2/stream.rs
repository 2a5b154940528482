//! Per-stream state and the RFC 7540 §5.1 state machine.
//!
//! The transition table is carried over from
//! `Atte-http2/src/stream.rs::Stream::transition_state`, generalized to
//! drive off the already-decoded `Frame`/`Flags` from `h2::frame` instead of
//! the teacher's own frame/flag types, and to apply to both client- and
//! server-initiated streams (spec SUPPLEMENT-3).

use super::flow_control::Window;
use super::frame::Frame;
use crate::entity::ChunkEvent;
use crate::error::HttpError;
use crate::message::{HttpRequest, HttpResponse};
use bytes::BytesMut;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StreamState {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuing {
    Headers,
    PushPromise,
}

pub struct Stream {
    pub id: u32,
    pub state: StreamState,
    pub send_window: Window,
    pub recv_window: Window,
    continuing: Option<Continuing>,
    headers_buffer: BytesMut,
    pub data_tx: Option<mpsc::Sender<Result<bytes::Bytes, HttpError>>>,
    pub request: Option<HttpRequest>,
    pub response: Option<HttpResponse>,
    pub body_channel: Option<mpsc::Sender<Result<ChunkEvent, HttpError>>>,
}

impl Stream {
    pub fn new(id: u32, initial_send_window: u32, initial_recv_window: u32) -> Self {
        Self {
            id,
            state: StreamState::Idle,
            send_window: Window::new(initial_send_window),
            recv_window: Window::new(initial_recv_window),
            continuing: None,
            headers_buffer: BytesMut::new(),
            data_tx: None,
            request: None,
            response: None,
            body_channel: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    pub fn buffer_header_fragment(&mut self, fragment: &[u8], max_header_block_size: usize) -> Result<(), HttpError> {
        if self.headers_buffer.len() + fragment.len() > max_header_block_size {
            return Err(HttpError::protocol(
                "header block too large",
                format!("exceeds {max_header_block_size} bytes across CONTINUATION frames"),
            ));
        }
        self.headers_buffer.extend_from_slice(fragment);
        Ok(())
    }

    pub fn take_header_block(&mut self) -> bytes::Bytes {
        std::mem::take(&mut self.headers_buffer).freeze()
    }

    /// Applies one frame's effect on this stream's state, per RFC 7540
    /// Figure 2. `send` is true when we originated the frame, false when the
    /// peer did.
    pub fn transition(&mut self, send: bool, frame: &Frame) -> Result<(), HttpError> {
        let recv = !send;
        let original = self.state;

        if let Frame::ResetStream { .. } = frame {
            if self.state == StreamState::Idle {
                return Err(HttpError::protocol("RST_STREAM on idle stream", self.id.to_string()));
            }
            self.state = StreamState::Closed;
            return Ok(());
        }

        let (is_push_promise, push_end_headers) = match frame {
            Frame::PushPromise { end_headers, .. } => (true, *end_headers),
            Frame::Continuation { end_headers, .. } if self.continuing == Some(Continuing::PushPromise) => {
                (true, *end_headers)
            }
            _ => (false, false),
        };
        let (is_headers, headers_end_headers) = match frame {
            Frame::Headers { end_headers, .. } => (true, *end_headers),
            Frame::Continuation { end_headers, .. } if self.continuing == Some(Continuing::Headers) => {
                (true, *end_headers)
            }
            _ => (false, false),
        };
        if is_headers {
            self.continuing = if headers_end_headers { None } else { Some(Continuing::Headers) };
        }
        if is_push_promise {
            self.continuing = if push_end_headers { None } else { Some(Continuing::PushPromise) };
        }

        let end_stream = match frame {
            Frame::Data { end_stream, .. } | Frame::Headers { end_stream, .. } => *end_stream,
            _ => false,
        };

        if self.state == StreamState::Idle {
            if send && is_push_promise {
                self.state = StreamState::ReservedLocal;
            } else if recv && is_push_promise {
                self.state = StreamState::ReservedRemote;
            } else if is_headers {
                self.state = StreamState::Open;
            }
        }

        if self.state == StreamState::ReservedLocal && send && is_headers {
            self.state = StreamState::HalfClosedRemote;
        }
        if self.state == StreamState::ReservedRemote && recv && is_headers {
            self.state = StreamState::HalfClosedLocal;
        }
        if self.state == StreamState::Open && send && end_stream {
            self.state = StreamState::HalfClosedLocal;
        }
        if self.state == StreamState::Open && recv && end_stream {
            self.state = StreamState::HalfClosedRemote;
        }
        if self.state == StreamState::HalfClosedRemote && send && end_stream {
            self.state = StreamState::Closed;
        }
        if self.state == StreamState::HalfClosedLocal && recv && end_stream {
            self.state = StreamState::Closed;
        }

        if self.state != original {
            log::trace!("h2 stream {} {:?} -> {:?}", self.id, original, self.state);
        }
        Ok(())
    }
}
