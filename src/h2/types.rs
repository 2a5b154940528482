//! HTTP/2 wire constants: frame types, error codes, settings parameters,
//! stream IDs.
//!
//! Carried over near-verbatim from `Atte-http2/src/types.rs`, which already
//! modeled every one of these as a `#[repr(...)]` enum driven by
//! `num_derive::{FromPrimitive, ToPrimitive}` for wire (de)serialization.

use num_derive::{FromPrimitive, ToPrimitive};
use std::num::NonZeroU32;

pub const U31_MAX: NonZeroU32 = unsafe { NonZeroU32::new_unchecked(u32::MAX >> 1) };

pub type StreamId = u32;
pub type NonZeroStreamId = std::num::NonZeroU32;

/// https://httpwg.org/specs/rfc7540.html#FrameTypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    ResetStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    GoAway = 0x7,
    WindowUpdate = 0x8,
    Continuation = 0x9,
}

/// https://httpwg.org/specs/rfc7540.html#ErrorCodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ErrorType {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

/// https://httpwg.org/specs/rfc7540.html#SettingValues
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive, enum_map::Enum,
)]
#[repr(u16)]
pub enum SettingsParameter {
    HeaderTableSize = 0x1,
    EnablePush = 0x2,
    MaxConcurrentStreams = 0x3,
    InitialWindowSize = 0x4,
    MaxFrameSize = 0x5,
    MaxHeaderListSize = 0x6,
}

#[derive(thiserror::Error, Debug)]
pub enum FrameDecodeError {
    #[error("unknown frame type {0}")]
    UnknownType(u8),
    #[error("payload is shorter than the declared length")]
    PayloadTooShort,
    #[error("unexpected zero stream ID")]
    ZeroStreamId,
    #[error("unexpected zero window increment")]
    ZeroWindowIncrement,
    #[error("unknown error type {0}")]
    UnknownErrorType(u32),
    #[error("frame exceeds max frame size: {0} octets")]
    FrameTooLarge(usize),
    #[error("header block exceeds configured max size")]
    HeaderBlockTooLarge,
}
