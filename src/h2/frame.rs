//! Sans-IO HTTP/2 frame codec: pure `&[u8] -> Frame` parsing and
//! `Frame -> Vec<u8>` rendering, with no knowledge of sockets or tasks.
//!
//! Grounded on the `H2FrameHeader`/`H2Event` split in
//! `examples/ariel42-h2-sans-io/src/h2_codec.rs` (decode the 9-octet header
//! first, then dispatch on frame type) and on the payload shapes carried by
//! `Atte-http2/src/frame.rs`'s `Frame`/`SettingsFrame`. PADDED-flag stripping
//! and CONTINUATION accumulation follow `carllerche-h2`'s `framed_read.rs`
//! pattern of buffering header fragments until `END_HEADERS`.

use super::types::{ErrorType, FrameDecodeError, FrameType, SettingsParameter};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_traits::{FromPrimitive, ToPrimitive};
use std::convert::TryFrom;

pub const FRAME_HEADER_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    pub dependency: u32,
    pub exclusive: bool,
    pub weight: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data {
        stream_id: u32,
        end_stream: bool,
        data: Bytes,
    },
    Headers {
        stream_id: u32,
        end_stream: bool,
        end_headers: bool,
        priority: Option<Priority>,
        fragment: Bytes,
    },
    Priority {
        stream_id: u32,
        priority: Priority,
    },
    ResetStream {
        stream_id: u32,
        error: ErrorType,
    },
    Settings {
        ack: bool,
        params: Vec<(SettingsParameter, u32)>,
    },
    PushPromise {
        stream_id: u32,
        promised_stream_id: u32,
        end_headers: bool,
        fragment: Bytes,
    },
    Ping {
        ack: bool,
        payload: [u8; 8],
    },
    GoAway {
        last_stream_id: u32,
        error: ErrorType,
        debug: Bytes,
    },
    WindowUpdate {
        stream_id: u32,
        increment: u32,
    },
    Continuation {
        stream_id: u32,
        end_headers: bool,
        fragment: Bytes,
    },
}

impl Frame {
    pub fn stream_id(&self) -> u32 {
        match self {
            Frame::Data { stream_id, .. }
            | Frame::Headers { stream_id, .. }
            | Frame::Priority { stream_id, .. }
            | Frame::ResetStream { stream_id, .. }
            | Frame::PushPromise { stream_id, .. }
            | Frame::WindowUpdate { stream_id, .. }
            | Frame::Continuation { stream_id, .. } => *stream_id,
            Frame::Settings { .. } | Frame::Ping { .. } | Frame::GoAway { .. } => 0,
        }
    }

    /// Parses one frame from `buf` if a complete frame is present, honoring
    /// `max_frame_size` (SETTINGS_MAX_FRAME_SIZE, spec §4.3). Returns `Ok(None)`
    /// when more bytes are needed; never consumes a partial frame.
    pub fn parse(buf: &mut BytesMut, max_frame_size: u32) -> Result<Option<Frame>, FrameDecodeError> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }
        let length = u32::from_be_bytes([0, buf[0], buf[1], buf[2]]) as usize;
        if length > max_frame_size as usize {
            return Err(FrameDecodeError::FrameTooLarge(length));
        }
        if buf.len() < FRAME_HEADER_LEN + length {
            return Ok(None);
        }

        let frame_type_raw = buf[3];
        let flags = buf[4];
        let stream_id = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]) & 0x7FFF_FFFF;

        buf.advance(FRAME_HEADER_LEN);
        let mut payload = buf.split_to(length).freeze();

        let frame_type = FrameType::from_u8(frame_type_raw)
            .ok_or(FrameDecodeError::UnknownType(frame_type_raw))?;

        let frame = match frame_type {
            FrameType::Data => {
                let data = strip_padding(&mut payload, flags)?;
                Frame::Data {
                    stream_id,
                    end_stream: flags & 0x1 != 0,
                    data,
                }
            }
            FrameType::Headers => {
                let mut data = strip_padding(&mut payload, flags)?;
                let priority = if flags & 0x20 != 0 {
                    Some(parse_priority(&mut data)?)
                } else {
                    None
                };
                Frame::Headers {
                    stream_id,
                    end_stream: flags & 0x1 != 0,
                    end_headers: flags & 0x4 != 0,
                    priority,
                    fragment: data,
                }
            }
            FrameType::Priority => {
                if payload.len() != 5 {
                    return Err(FrameDecodeError::PayloadTooShort);
                }
                Frame::Priority {
                    stream_id,
                    priority: parse_priority(&mut payload)?,
                }
            }
            FrameType::ResetStream => {
                if payload.len() != 4 {
                    return Err(FrameDecodeError::PayloadTooShort);
                }
                let code = payload.get_u32();
                Frame::ResetStream {
                    stream_id,
                    error: ErrorType::from_u32(code).ok_or(FrameDecodeError::UnknownErrorType(code))?,
                }
            }
            FrameType::Settings => {
                if stream_id != 0 {
                    return Err(FrameDecodeError::ZeroStreamId);
                }
                let ack = flags & 0x1 != 0;
                let mut params = Vec::with_capacity(payload.len() / 6);
                while payload.len() >= 6 {
                    let id = payload.get_u16();
                    let value = payload.get_u32();
                    if let Some(param) = SettingsParameter::from_u16(id) {
                        params.push((param, value));
                    }
                }
                Frame::Settings { ack, params }
            }
            FrameType::PushPromise => {
                let mut data = strip_padding(&mut payload, flags)?;
                if data.len() < 4 {
                    return Err(FrameDecodeError::PayloadTooShort);
                }
                let promised_stream_id = data.get_u32() & 0x7FFF_FFFF;
                Frame::PushPromise {
                    stream_id,
                    promised_stream_id,
                    end_headers: flags & 0x4 != 0,
                    fragment: data,
                }
            }
            FrameType::Ping => {
                if payload.len() != 8 {
                    return Err(FrameDecodeError::PayloadTooShort);
                }
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&payload);
                Frame::Ping {
                    ack: flags & 0x1 != 0,
                    payload: arr,
                }
            }
            FrameType::GoAway => {
                if payload.len() < 8 {
                    return Err(FrameDecodeError::PayloadTooShort);
                }
                let last_stream_id = payload.get_u32() & 0x7FFF_FFFF;
                let code = payload.get_u32();
                Frame::GoAway {
                    last_stream_id,
                    error: ErrorType::from_u32(code).ok_or(FrameDecodeError::UnknownErrorType(code))?,
                    debug: payload,
                }
            }
            FrameType::WindowUpdate => {
                if payload.len() != 4 {
                    return Err(FrameDecodeError::PayloadTooShort);
                }
                let increment = payload.get_u32() & 0x7FFF_FFFF;
                if increment == 0 {
                    return Err(FrameDecodeError::ZeroWindowIncrement);
                }
                Frame::WindowUpdate { stream_id, increment }
            }
            FrameType::Continuation => Frame::Continuation {
                stream_id,
                end_headers: flags & 0x4 != 0,
                fragment: payload,
            },
        };
        Ok(Some(frame))
    }

    pub fn encode(&self, out: &mut BytesMut) {
        match self {
            Frame::Data { stream_id, end_stream, data } => {
                write_header(out, data.len(), FrameType::Data, if *end_stream { 0x1 } else { 0 }, *stream_id);
                out.extend_from_slice(data);
            }
            Frame::Headers { stream_id, end_stream, end_headers, priority, fragment } => {
                let mut flags = 0u8;
                if *end_stream {
                    flags |= 0x1;
                }
                if *end_headers {
                    flags |= 0x4;
                }
                let mut len = fragment.len();
                if let Some(_) = priority {
                    flags |= 0x20;
                    len += 5;
                }
                write_header(out, len, FrameType::Headers, flags, *stream_id);
                if let Some(p) = priority {
                    encode_priority(out, p);
                }
                out.extend_from_slice(fragment);
            }
            Frame::Priority { stream_id, priority } => {
                write_header(out, 5, FrameType::Priority, 0, *stream_id);
                encode_priority(out, priority);
            }
            Frame::ResetStream { stream_id, error } => {
                write_header(out, 4, FrameType::ResetStream, 0, *stream_id);
                out.put_u32(error.to_u32().unwrap());
            }
            Frame::Settings { ack, params } => {
                write_header(out, params.len() * 6, FrameType::Settings, if *ack { 0x1 } else { 0 }, 0);
                for (param, value) in params {
                    out.put_u16(param.to_u16().unwrap());
                    out.put_u32(*value);
                }
            }
            Frame::PushPromise { stream_id, promised_stream_id, end_headers, fragment } => {
                write_header(
                    out,
                    4 + fragment.len(),
                    FrameType::PushPromise,
                    if *end_headers { 0x4 } else { 0 },
                    *stream_id,
                );
                out.put_u32(*promised_stream_id & 0x7FFF_FFFF);
                out.extend_from_slice(fragment);
            }
            Frame::Ping { ack, payload } => {
                write_header(out, 8, FrameType::Ping, if *ack { 0x1 } else { 0 }, 0);
                out.extend_from_slice(payload);
            }
            Frame::GoAway { last_stream_id, error, debug } => {
                write_header(out, 8 + debug.len(), FrameType::GoAway, 0, 0);
                out.put_u32(*last_stream_id & 0x7FFF_FFFF);
                out.put_u32(error.to_u32().unwrap());
                out.extend_from_slice(debug);
            }
            Frame::WindowUpdate { stream_id, increment } => {
                write_header(out, 4, FrameType::WindowUpdate, 0, *stream_id);
                out.put_u32(*increment & 0x7FFF_FFFF);
            }
            Frame::Continuation { stream_id, end_headers, fragment } => {
                write_header(out, fragment.len(), FrameType::Continuation, if *end_headers { 0x4 } else { 0 }, *stream_id);
                out.extend_from_slice(fragment);
            }
        }
    }
}

fn write_header(out: &mut BytesMut, length: usize, ty: FrameType, flags: u8, stream_id: u32) {
    out.reserve(FRAME_HEADER_LEN + length);
    out.put_slice(&(length as u32).to_be_bytes()[1..]);
    out.put_u8(ty.to_u8().unwrap());
    out.put_u8(flags);
    out.put_u32(stream_id & 0x7FFF_FFFF);
}

fn parse_priority(data: &mut Bytes) -> Result<Priority, FrameDecodeError> {
    if data.len() < 5 {
        return Err(FrameDecodeError::PayloadTooShort);
    }
    let raw = data.get_u32();
    let weight = data.get_u8();
    Ok(Priority {
        dependency: raw & 0x7FFF_FFFF,
        exclusive: raw & 0x8000_0000 != 0,
        weight,
    })
}

fn encode_priority(out: &mut BytesMut, p: &Priority) {
    let mut raw = p.dependency & 0x7FFF_FFFF;
    if p.exclusive {
        raw |= 0x8000_0000;
    }
    out.put_u32(raw);
    out.put_u8(p.weight);
}

/// Strips the PADDED flag's pad-length prefix and trailing padding, per
/// RFC 7540 §6.1/§6.2.
fn strip_padding(payload: &mut Bytes, flags: u8) -> Result<Bytes, FrameDecodeError> {
    if flags & 0x8 == 0 {
        return Ok(std::mem::take(payload));
    }
    if payload.is_empty() {
        return Err(FrameDecodeError::PayloadTooShort);
    }
    let pad_len = payload.get_u8() as usize;
    if pad_len > payload.len() {
        return Err(FrameDecodeError::PayloadTooShort);
    }
    let data_len = payload.len() - pad_len;
    Ok(payload.split_to(data_len))
}

impl TryFrom<&[u8]> for Priority {
    type Error = FrameDecodeError;
    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let mut b = Bytes::copy_from_slice(data);
        parse_priority(&mut b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_data_frame() {
        let frame = Frame::Data {
            stream_id: 1,
            end_stream: true,
            data: Bytes::from_static(b"hello"),
        };
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        let parsed = Frame::parse(&mut buf, 16_384).unwrap().unwrap();
        assert_eq!(parsed, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn round_trips_settings_frame() {
        let frame = Frame::Settings {
            ack: false,
            params: vec![(SettingsParameter::InitialWindowSize, 65_535)],
        };
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        let parsed = Frame::parse(&mut buf, 16_384).unwrap().unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn incomplete_frame_returns_none() {
        let mut buf = BytesMut::from(&b"\x00\x00"[..]);
        assert!(Frame::parse(&mut buf, 16_384).unwrap().is_none());
    }

    #[test]
    fn rejects_frame_over_max_size() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x00, 0xFF, 0xFF]); // length = 65535
        buf.extend_from_slice(&[0x0, 0x0, 0, 0, 0, 1]);
        assert!(matches!(
            Frame::parse(&mut buf, 16_384),
            Err(FrameDecodeError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn strips_padding_from_data_frame() {
        let mut payload = BytesMut::new();
        payload.put_u8(2); // pad length
        payload.extend_from_slice(b"hi");
        payload.extend_from_slice(b"\x00\x00");
        let mut bytes = payload.freeze();
        let stripped = strip_padding(&mut bytes, 0x8).unwrap();
        assert_eq!(&stripped[..], b"hi");
    }
}
