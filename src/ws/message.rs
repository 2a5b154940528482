//! Message aggregation: joins Text/Binary + Continuation frames into whole
//! messages, with incremental UTF-8 validation across frame boundaries
//! (spec §3 WebSocket message, §4.5, §8 scenario 6).
//!
//! `std::str::from_utf8`'s `Utf8Error::valid_up_to` already distinguishes
//! "definitely invalid" from "valid prefix, incomplete tail" without any
//! hand-rolled decoder; Rust's own validator also rejects the encoded forms
//! of surrogate code points (U+D800-DFFF) as invalid UTF-8, so no separate
//! surrogate check is needed to satisfy the scenario 6 requirement.

use super::close;
use super::frame::Opcode;
use crate::error::HttpError;
use bytes::{Bytes, BytesMut};

/// Buffers the undecodable tail of a UTF-8 byte stream across pushes.
#[derive(Default)]
pub struct Utf8Incremental {
    pending: Vec<u8>,
}

impl Utf8Incremental {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `data` (plus any buffered tail from the previous
    /// call) as forms complete UTF-8, returning it as a `String` and
    /// retaining any trailing incomplete sequence for the next call.
    pub fn push(&mut self, data: &[u8]) -> Result<String, HttpError> {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(data);
        match std::str::from_utf8(&buf) {
            Ok(s) => Ok(s.to_owned()),
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                if e.error_len().is_some() {
                    return Err(HttpError::websocket(
                        close::code::INVALID_PAYLOAD,
                        "invalid utf-8 in text message",
                        format!("invalid byte sequence at offset {valid_up_to}"),
                    ));
                }
                let (good, tail) = buf.split_at(valid_up_to);
                let s = std::str::from_utf8(good).expect("prefix validated by from_utf8").to_owned();
                self.pending = tail.to_vec();
                Ok(s)
            }
        }
    }

    /// Called when the message's final frame (`fin = true`) has been fed:
    /// any still-buffered bytes form a code point truncated at the message
    /// boundary, which is itself invalid (spec §4.5).
    pub fn finish(&mut self) -> Result<(), HttpError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(HttpError::websocket(
                close::code::INVALID_PAYLOAD,
                "truncated utf-8 sequence",
                "message ended in the middle of a multi-byte code point",
            ))
        }
    }
}

pub enum AssembledMessage {
    Text(String),
    Binary(Bytes),
}

enum InProgress {
    Text { utf8: Utf8Incremental, text: String },
    Binary { bytes: BytesMut },
}

/// Drives the "data opcode starts a message, Continuation frames extend it
/// until fin" rule (spec §4.5). Control frames never reach this type; the
/// connection driver handles them separately and they do not fragment the
/// data message in progress.
pub struct MessageAssembler {
    in_progress: Option<InProgress>,
    max_message_size: usize,
    accumulated: usize,
}

impl MessageAssembler {
    pub fn new(max_message_size: usize) -> Self {
        Self { in_progress: None, max_message_size, accumulated: 0 }
    }

    pub fn on_frame(&mut self, opcode: Opcode, fin: bool, payload: Bytes) -> Result<Option<AssembledMessage>, HttpError> {
        match opcode {
            Opcode::Text if self.in_progress.is_none() => {
                let mut utf8 = Utf8Incremental::new();
                self.accumulated = payload.len();
                self.check_size()?;
                let text = utf8.push(&payload)?;
                self.in_progress = Some(InProgress::Text { utf8, text });
            }
            Opcode::Binary if self.in_progress.is_none() => {
                self.accumulated = payload.len();
                self.check_size()?;
                let mut bytes = BytesMut::new();
                bytes.extend_from_slice(&payload);
                self.in_progress = Some(InProgress::Binary { bytes });
            }
            Opcode::Text | Opcode::Binary => {
                return Err(HttpError::websocket(
                    close::code::PROTOCOL_ERROR,
                    "data frame while continuation pending",
                    "a new Text/Binary frame arrived before the prior message's fin",
                ));
            }
            Opcode::Continuation => {
                self.accumulated += payload.len();
                self.check_size()?;
                match self.in_progress.as_mut() {
                    Some(InProgress::Text { utf8, text }) => text.push_str(&utf8.push(&payload)?),
                    Some(InProgress::Binary { bytes }) => bytes.extend_from_slice(&payload),
                    None => {
                        return Err(HttpError::websocket(
                            close::code::PROTOCOL_ERROR,
                            "continuation without data frame",
                            "a Continuation frame arrived with no message in progress",
                        ))
                    }
                }
            }
            Opcode::Close | Opcode::Ping | Opcode::Pong => unreachable!("control frames never reach the assembler"),
        }

        if !fin {
            return Ok(None);
        }
        match self.in_progress.take().expect("set above") {
            InProgress::Text { mut utf8, text } => {
                utf8.finish()?;
                self.accumulated = 0;
                Ok(Some(AssembledMessage::Text(text)))
            }
            InProgress::Binary { bytes } => {
                self.accumulated = 0;
                Ok(Some(AssembledMessage::Binary(bytes.freeze())))
            }
        }
    }

    fn check_size(&self) -> Result<(), HttpError> {
        if self.accumulated > self.max_message_size {
            Err(HttpError::websocket(
                close::code::MESSAGE_TOO_BIG,
                "message exceeds configured size limit",
                format!("{} bytes buffered, limit {}", self.accumulated, self.max_message_size),
            ))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_text_message() {
        let mut a = MessageAssembler::new(1 << 20);
        let out = a.on_frame(Opcode::Text, true, Bytes::from_static(b"hi")).unwrap().unwrap();
        match out {
            AssembledMessage::Text(s) => assert_eq!(s, "hi"),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn utf8_character_split_across_two_frames() {
        // U+00E9 'é' encodes as 0xC3 0xA9; split the two bytes across frames.
        let mut a = MessageAssembler::new(1 << 20);
        let none = a.on_frame(Opcode::Text, false, Bytes::from_static(&[0xC3])).unwrap();
        assert!(none.is_none());
        let out = a.on_frame(Opcode::Continuation, true, Bytes::from_static(&[0xA9])).unwrap().unwrap();
        match out {
            AssembledMessage::Text(s) => assert_eq!(s, "\u{e9}"),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn surrogate_encoding_is_rejected() {
        let mut a = MessageAssembler::new(1 << 20);
        // 0xED 0xA0 0x80 is the (invalid) 3-byte encoding of U+D800.
        let err = a.on_frame(Opcode::Text, true, Bytes::from_static(&[0xED, 0xA0, 0x80]));
        assert!(err.is_err());
    }

    #[test]
    fn continuation_without_start_is_rejected() {
        let mut a = MessageAssembler::new(1 << 20);
        assert!(a.on_frame(Opcode::Continuation, true, Bytes::from_static(b"x")).is_err());
    }

    #[test]
    fn oversized_message_is_rejected() {
        let mut a = MessageAssembler::new(4);
        assert!(a.on_frame(Opcode::Binary, true, Bytes::from_static(b"too long")).is_err());
    }
}
