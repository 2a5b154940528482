//! Typed error model for the whole stack.
//!
//! Mirrors the exception taxonomy in spec §7: framing, protocol, flow-control,
//! HPACK, transport, application and configuration errors are distinct
//! variants so callers can match on them instead of parsing strings, the same
//! shape as `Atte-http2`'s `FrameDecodeError` (`types.rs`) but covering the
//! whole stack rather than just HTTP/2 frame decoding.

use std::fmt;

/// A human-facing summary/detail pair, optionally rendered into an error
/// response body when `verbose-error-messages` is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub summary: String,
    pub detail: String,
}

impl ErrorInfo {
    pub fn new(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

/// HTTP/2 / WebSocket connection-level error codes that a `HttpError` maps to
/// when it needs to be rendered onto the wire as GOAWAY or a close frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireErrorCode {
    Http2(crate::h2::types::ErrorType),
    WebSocketClose(u16),
    None,
}

#[derive(thiserror::Error, Debug)]
pub enum HttpError {
    /// Bad start line, oversized field, illegal character, framing conflict,
    /// invalid chunked encoding. Fatal: the connection must close after the
    /// current message.
    #[error("framing error: {0}")]
    Framing(ErrorInfo),

    /// Invalid frame in current state, reserved bits set, size limits
    /// exceeded, mid-stream headers, etc.
    #[error("protocol error: {0}")]
    Protocol(ErrorInfo),

    /// WINDOW_UPDATE of 0 or causing overflow.
    #[error("flow control error: {0}")]
    FlowControl(ErrorInfo),

    /// HPACK decode failure.
    #[error("hpack error: {0}")]
    Hpack(ErrorInfo),

    /// Connection closed, idle timeout, or other I/O failure. The pool may
    /// retry these for idempotent requests.
    #[error("transport error: {0}")]
    Transport(ErrorInfo),

    /// Application/handler error (surfaces as 500 on the server, or fails the
    /// response future on the client).
    #[error("application error: {0}")]
    Application(ErrorInfo),

    /// Usage/configuration error caught before entering the protocol layers
    /// (wrong scheme for a WebSocket endpoint, non-absolute pool URI, ...).
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),

    /// A WebSocket protocol violation that carries the close code the
    /// connection driver must send (spec §4.5, §7 "Close(1002)"/"Close(1007)").
    #[error("websocket error ({code}): {info}")]
    WebSocket { code: u16, info: ErrorInfo },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HttpError {
    pub fn framing(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Framing(ErrorInfo::new(summary, detail))
    }

    pub fn protocol(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Protocol(ErrorInfo::new(summary, detail))
    }

    pub fn flow_control(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::FlowControl(ErrorInfo::new(summary, detail))
    }

    pub fn hpack(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Hpack(ErrorInfo::new(summary, detail))
    }

    pub fn transport(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Transport(ErrorInfo::new(summary, detail))
    }

    pub fn configuration(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Configuration(ErrorInfo::new(summary, detail))
    }

    pub fn websocket(code: u16, summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::WebSocket { code, info: ErrorInfo::new(summary, detail) }
    }

    /// The close code a WebSocket connection driver should send for this
    /// error, falling back to 1002 (protocol error) for non-WebSocket
    /// variants that still terminate a WebSocket connection (e.g. a
    /// transport I/O failure).
    pub fn websocket_close_code(&self) -> u16 {
        match self {
            Self::WebSocket { code, .. } => *code,
            _ => crate::ws::close::code::PROTOCOL_ERROR,
        }
    }

    /// Is this error one the connection pool should retry an idempotent
    /// request against (spec §4.6 Retry policy / §7 propagation policy)?
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }

    pub fn info(&self) -> Option<&ErrorInfo> {
        match self {
            Self::Framing(i)
            | Self::Protocol(i)
            | Self::FlowControl(i)
            | Self::Hpack(i)
            | Self::Transport(i)
            | Self::Application(i)
            | Self::Configuration(i) => Some(i),
            Self::WebSocket { info, .. } => Some(info),
            Self::Io(_) => None,
        }
    }
}

pub type Result<T, E = HttpError> = std::result::Result<T, E>;
