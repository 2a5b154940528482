//! Connection- and stream-level flow control windows (spec §4.4).
//!
//! `Atte-http2/src/connection.rs::spawn_response_receiver` tracked a single
//! `window_remaining: u64` for the connection and auto-replenished it on
//! every DATA frame (`stream.rs::handle_frame`'s unconditional WINDOW_UPDATE
//! echo); this generalizes that to separate connection and per-stream
//! windows with a configurable low-water mark instead of replenishing on
//! every single frame.

use crate::error::HttpError;

/// One flow-control window, either the connection's or one stream's.
/// `available` can go negative transiently after a SETTINGS-driven shrink
/// (RFC 7540 §6.9.2) — represented with `i64` for exactly that reason.
pub struct Window {
    available: i64,
    consumed_since_update: u32,
    initial: u32,
}

impl Window {
    pub fn new(initial: u32) -> Self {
        Self {
            available: i64::from(initial),
            consumed_since_update: 0,
            initial,
        }
    }

    pub fn available(&self) -> i64 {
        self.available
    }

    /// Accounts for locally-initiated sends draining the window.
    pub fn consume_outbound(&mut self, n: u32) -> Result<(), HttpError> {
        if i64::from(n) > self.available {
            return Err(HttpError::flow_control(
                "send exceeds available window",
                format!("tried to send {n}, {} available", self.available),
            ));
        }
        self.available -= i64::from(n);
        Ok(())
    }

    /// Accounts for inbound DATA bytes; returns bytes credits should be
    /// granted back for once they cross `low_water_fraction` of the initial
    /// window (spec §4.4: "buffer/replenish policy governed by a low-water
    /// mark rather than per-frame").
    pub fn consume_inbound(&mut self, n: u32) -> Option<u32> {
        self.consumed_since_update += n;
        let low_water = self.initial / 2;
        if self.consumed_since_update >= low_water.max(1) {
            let credit = self.consumed_since_update;
            self.consumed_since_update = 0;
            Some(credit)
        } else {
            None
        }
    }

    pub fn grant(&mut self, increment: u32) {
        self.available += i64::from(increment);
    }

    /// A SETTINGS_INITIAL_WINDOW_SIZE change shifts every open stream's
    /// window by the delta (RFC 7540 §6.9.2), which can drive `available`
    /// negative.
    pub fn apply_initial_window_delta(&mut self, delta: i64) {
        self.available += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_consume_respects_window() {
        let mut w = Window::new(10);
        assert!(w.consume_outbound(10).is_ok());
        assert!(w.consume_outbound(1).is_err());
    }

    #[test]
    fn inbound_consume_grants_credit_past_low_water() {
        let mut w = Window::new(100);
        assert_eq!(w.consume_inbound(40), None);
        assert_eq!(w.consume_inbound(40), Some(80));
    }

    #[test]
    fn settings_delta_can_go_negative() {
        let mut w = Window::new(100);
        w.consume_outbound(100).unwrap();
        w.apply_initial_window_delta(-50);
        assert_eq!(w.available(), -50);
    }
}
