//! Close codes and the per-direction close FSM (spec §4.5).
//!
//! No direct teacher precedent (`Atte-http2` speaks only HTTP/2); the state
//! names follow spec.md's own FSM diagram verbatim.

use crate::error::HttpError;

/// RFC 6455 §7.4 close codes this crate assigns or recognizes.
pub mod code {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const UNSUPPORTED_DATA: u16 = 1003;
    pub const INVALID_PAYLOAD: u16 = 1007;
    pub const POLICY_VIOLATION: u16 = 1008;
    pub const MESSAGE_TOO_BIG: u16 = 1009;
    pub const MANDATORY_EXTENSION: u16 = 1010;
    pub const UNEXPECTED_CONDITION: u16 = 1011;
}

/// A close code is permitted on the wire iff it falls in 1000-1011 (minus
/// the three codes reserved for internal-only use: 1004, 1005, 1006) or in
/// the application-defined 3000-4999 range (spec §4.5).
pub fn is_permitted(value: u16) -> bool {
    match value {
        1004 | 1005 | 1006 => false,
        1000..=1011 => true,
        3000..=4999 => true,
        _ => false,
    }
}

/// Parses a Close frame payload: empty, or a 2-byte big-endian code followed
/// by an optional UTF-8 reason (spec §4.5).
pub fn parse_payload(payload: &[u8]) -> Result<(Option<u16>, String), HttpError> {
    if payload.is_empty() {
        return Ok((None, String::new()));
    }
    if payload.len() == 1 {
        return Err(HttpError::protocol(
            "malformed close frame",
            "close payload of length 1 cannot carry a code",
        ));
    }
    let value = u16::from_be_bytes([payload[0], payload[1]]);
    if !is_permitted(value) {
        return Err(HttpError::protocol(
            "disallowed close code",
            format!("close code {value} is not in the permitted set"),
        ));
    }
    let reason = std::str::from_utf8(&payload[2..])
        .map_err(|_| HttpError::protocol("invalid utf-8 in close reason", "close reason is not valid UTF-8"))?
        .to_owned();
    Ok((Some(value), reason))
}

/// Per-direction close state (spec §4.5 FSM). Both sides start `Active`;
/// `LocalClosing` means this side has sent Close and awaits the peer's
/// echo, `PeerClosing` the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseState {
    Active,
    LocalClosing,
    PeerClosing,
    FullyClosed,
}

impl CloseState {
    /// True once no further frames should be read from or written to the
    /// peer — the transport may be torn down.
    pub fn is_terminal(self) -> bool {
        matches!(self, CloseState::FullyClosed)
    }

    pub fn on_local_close_sent(self) -> Self {
        match self {
            CloseState::Active => CloseState::LocalClosing,
            CloseState::PeerClosing => CloseState::FullyClosed,
            other => other,
        }
    }

    pub fn on_peer_close_received(self) -> Self {
        match self {
            CloseState::Active => CloseState::PeerClosing,
            CloseState::LocalClosing => CloseState::FullyClosed,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reserved_codes() {
        assert!(!is_permitted(1005));
        assert!(is_permitted(1000));
        assert!(is_permitted(3500));
        assert!(!is_permitted(2000));
    }

    #[test]
    fn empty_payload_has_no_code() {
        let (code, reason) = parse_payload(&[]).unwrap();
        assert_eq!(code, None);
        assert_eq!(reason, "");
    }

    #[test]
    fn one_byte_payload_is_malformed() {
        assert!(parse_payload(&[0x03]).is_err());
    }

    #[test]
    fn local_then_peer_close_reaches_fully_closed() {
        let s = CloseState::Active.on_local_close_sent();
        assert_eq!(s, CloseState::LocalClosing);
        let s = s.on_peer_close_received();
        assert_eq!(s, CloseState::FullyClosed);
    }

    #[test]
    fn peer_then_local_close_reaches_fully_closed() {
        let s = CloseState::Active.on_peer_close_received();
        assert_eq!(s, CloseState::PeerClosing);
        let s = s.on_local_close_sent();
        assert_eq!(s, CloseState::FullyClosed);
    }
}
