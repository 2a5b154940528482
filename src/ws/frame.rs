//! WebSocket frame format (RFC 6455 §5): sans-IO parser and encoder.
//!
//! Grounded on `cpkb-bluezoo-tagliacarte/core/src/protocol/websocket/frame.rs`'s
//! `FrameParser`/`encode_frame` (header-then-length-then-payload state
//! machine, masking by direction) but reworked into the buffer-and-advance
//! style `h2::frame::Frame::parse` already uses in this crate, so both
//! framing layers share one parsing idiom.

use super::mask;
use crate::error::HttpError;
use crate::h2::multiplexer::Role;
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Opcode {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xA,
        }
    }

    pub fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// A fully parsed, already-unmasked frame.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub opcode: Opcode,
    pub fin: bool,
    pub payload: Bytes,
}

const MAX_CONTROL_PAYLOAD: usize = 125;

/// Parses one frame off the front of `buf`, returning `Ok(None)` if `buf`
/// does not yet hold a complete frame. `role` decides which direction of
/// masking is mandatory: a server must reject unmasked frames, a client
/// must reject masked ones (spec §4.5).
pub fn parse(buf: &mut BytesMut, role: Role, max_payload: usize) -> Result<Option<RawFrame>, HttpError> {
    if buf.len() < 2 {
        return Ok(None);
    }
    let b0 = buf[0];
    let b1 = buf[1];
    let fin = b0 & 0x80 != 0;
    let rsv = b0 & 0x70;
    if rsv != 0 {
        return Err(HttpError::websocket(
            super::close::code::PROTOCOL_ERROR,
            "reserved bits set",
            "no extension negotiates non-zero RSV1/2/3 in this implementation",
        ));
    }
    let opcode = Opcode::from_u8(b0 & 0x0f).ok_or_else(|| {
        HttpError::websocket(super::close::code::PROTOCOL_ERROR, "unknown opcode", format!("{:#x}", b0 & 0x0f))
    })?;
    let masked = b1 & 0x80 != 0;
    match role {
        Role::Server if !masked => {
            return Err(HttpError::websocket(
                super::close::code::PROTOCOL_ERROR,
                "unmasked client frame",
                "frames from a client to a server must be masked",
            ))
        }
        Role::Client if masked => {
            return Err(HttpError::websocket(
                super::close::code::PROTOCOL_ERROR,
                "masked server frame",
                "frames from a server to a client must not be masked",
            ))
        }
        _ => {}
    }

    let len7 = b1 & 0x7f;
    let mut header_len = 2usize;
    let payload_len: u64 = if len7 < 126 {
        len7 as u64
    } else if len7 == 126 {
        if buf.len() < header_len + 2 {
            return Ok(None);
        }
        let v = u16::from_be_bytes([buf[header_len], buf[header_len + 1]]) as u64;
        header_len += 2;
        v
    } else {
        if buf.len() < header_len + 8 {
            return Ok(None);
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[header_len..header_len + 8]);
        let v = u64::from_be_bytes(bytes);
        if v & (1 << 63) != 0 {
            return Err(HttpError::websocket(
                super::close::code::PROTOCOL_ERROR,
                "reserved length bit set",
                "the high bit of a 64-bit payload length must be zero",
            ));
        }
        header_len += 8;
        v
    };

    if opcode.is_control() && (!fin || payload_len as usize > MAX_CONTROL_PAYLOAD) {
        return Err(HttpError::websocket(
            super::close::code::PROTOCOL_ERROR,
            "fragmented or oversized control frame",
            "control frames must be unfragmented and at most 125 bytes",
        ));
    }
    if payload_len as usize > max_payload {
        return Err(HttpError::websocket(
            super::close::code::MESSAGE_TOO_BIG,
            "frame payload too large",
            format!("{payload_len} exceeds configured max-message-size"),
        ));
    }

    let mask_key_len = if masked { 4 } else { 0 };
    let total = header_len + mask_key_len + payload_len as usize;
    if buf.len() < total {
        return Ok(None);
    }

    buf.advance(header_len);
    let mask_key = if masked {
        let mut key = [0u8; 4];
        key.copy_from_slice(&buf[..4]);
        buf.advance(4);
        Some(key)
    } else {
        None
    };
    let mut payload = buf.split_to(payload_len as usize);
    if let Some(key) = mask_key {
        mask::apply(&mut payload, key);
    }

    Ok(Some(RawFrame { opcode, fin, payload: payload.freeze() }))
}

/// Encodes one frame into `out`. `mask_key` must be `Some` for client-role
/// traffic and `None` for server-role traffic (spec §4.5: "client-side
/// outgoing frames are masked with a fresh 32-bit random mask per frame").
pub fn encode(out: &mut BytesMut, opcode: Opcode, fin: bool, payload: &[u8], mask_key: Option<[u8; 4]>) {
    let b0 = (if fin { 0x80 } else { 0 }) | opcode.as_u8();
    out.put_u8(b0);
    let mask_bit = if mask_key.is_some() { 0x80 } else { 0 };
    let len = payload.len();
    if len < 126 {
        out.put_u8(mask_bit | len as u8);
    } else if len <= u16::MAX as usize {
        out.put_u8(mask_bit | 126);
        out.put_u16(len as u16);
    } else {
        out.put_u8(mask_bit | 127);
        out.put_u64(len as u64);
    }
    match mask_key {
        Some(key) => {
            out.put_slice(&key);
            let start = out.len();
            out.put_slice(payload);
            mask::apply(&mut out[start..], key);
        }
        None => out.put_slice(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_unmasked_server_frame() {
        let mut out = BytesMut::new();
        encode(&mut out, Opcode::Text, true, b"hello", None);
        let frame = parse(&mut out, Role::Client, 1 << 20).unwrap().unwrap();
        assert_eq!(frame.opcode, Opcode::Text);
        assert!(frame.fin);
        assert_eq!(&frame.payload[..], b"hello");
    }

    #[test]
    fn round_trips_masked_client_frame() {
        let mut out = BytesMut::new();
        encode(&mut out, Opcode::Binary, false, b"partial", Some([1, 2, 3, 4]));
        let frame = parse(&mut out, Role::Server, 1 << 20).unwrap().unwrap();
        assert_eq!(frame.opcode, Opcode::Binary);
        assert!(!frame.fin);
        assert_eq!(&frame.payload[..], b"partial");
    }

    #[test]
    fn server_rejects_unmasked_client_frame() {
        let mut out = BytesMut::new();
        encode(&mut out, Opcode::Text, true, b"hi", None);
        assert!(parse(&mut out, Role::Server, 1 << 20).is_err());
    }

    #[test]
    fn client_rejects_masked_server_frame() {
        let mut out = BytesMut::new();
        encode(&mut out, Opcode::Text, true, b"hi", Some([9, 9, 9, 9]));
        assert!(parse(&mut out, Role::Client, 1 << 20).is_err());
    }

    #[test]
    fn incomplete_frame_yields_none() {
        let mut buf = BytesMut::from(&[0x81u8][..]);
        assert!(parse(&mut buf, Role::Client, 1 << 20).unwrap().is_none());
    }

    #[test]
    fn fragmented_control_frame_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u8(0x09); // PING, fin=0
        buf.put_u8(0x00); // len 0, unmasked
        assert!(parse(&mut buf, Role::Client, 1 << 20).is_err());
    }
}
