//! SETTINGS frame bookkeeping: our own advertised settings, the peer's last
//! acknowledged settings, and the single-outstanding-ACK rule of RFC 7540
//! §6.5.3.
//!
//! Grounded on `Atte-http2/src/connection.rs::spawn_response_receiver`,
//! which keeps the peer's settings in an `EnumMap<SettingsParameter, u32>`
//! behind a lock and ACKs every non-ACK SETTINGS frame it receives.

use super::types::SettingsParameter;
use crate::config::H2Config;
use crate::error::HttpError;
use enum_map::{enum_map, EnumMap};

#[derive(Debug, Clone, Copy)]
pub struct PeerSettings {
    pub header_table_size: u32,
    pub enable_push: bool,
    pub max_concurrent_streams: u32,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: u32,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            header_table_size: 4096,
            enable_push: true,
            max_concurrent_streams: u32::MAX,
            initial_window_size: 65_535,
            max_frame_size: 16_384,
            max_header_list_size: u32::MAX,
        }
    }
}

impl PeerSettings {
    fn apply(&mut self, param: SettingsParameter, value: u32) -> Result<(), HttpError> {
        match param {
            SettingsParameter::HeaderTableSize => self.header_table_size = value,
            SettingsParameter::EnablePush => {
                if value > 1 {
                    return Err(HttpError::protocol("invalid SETTINGS_ENABLE_PUSH", value.to_string()));
                }
                self.enable_push = value == 1;
            }
            SettingsParameter::MaxConcurrentStreams => self.max_concurrent_streams = value,
            SettingsParameter::InitialWindowSize => {
                if value > super::types::U31_MAX.get() {
                    return Err(HttpError::flow_control(
                        "SETTINGS_INITIAL_WINDOW_SIZE out of range",
                        value.to_string(),
                    ));
                }
                self.initial_window_size = value;
            }
            SettingsParameter::MaxFrameSize => {
                if !(16_384..=16_777_215).contains(&value) {
                    return Err(HttpError::protocol("SETTINGS_MAX_FRAME_SIZE out of range", value.to_string()));
                }
                self.max_frame_size = value;
            }
            SettingsParameter::MaxHeaderListSize => self.max_header_list_size = value,
        }
        Ok(())
    }
}

/// Tracks the handshake for both directions of SETTINGS exchange: what we
/// advertised, what the peer last acknowledged, and whether we're waiting on
/// an ACK of our own.
pub struct SettingsState {
    pub local: EnumMap<SettingsParameter, u32>,
    pub peer: PeerSettings,
    awaiting_ack: bool,
}

impl SettingsState {
    pub fn new(config: &H2Config) -> Self {
        Self {
            local: enum_map! {
                SettingsParameter::HeaderTableSize => config.header_table_size,
                SettingsParameter::EnablePush => 0,
                SettingsParameter::MaxConcurrentStreams => config.max_concurrent_streams,
                SettingsParameter::InitialWindowSize => config.initial_window_size,
                SettingsParameter::MaxFrameSize => config.max_frame_size,
                SettingsParameter::MaxHeaderListSize => config.max_header_list_size,
            },
            peer: PeerSettings::default(),
            awaiting_ack: false,
        }
    }

    pub fn mark_sent(&mut self) {
        self.awaiting_ack = true;
    }

    pub fn on_ack(&mut self) -> Result<(), HttpError> {
        if !self.awaiting_ack {
            return Err(HttpError::protocol(
                "unexpected SETTINGS ACK",
                "no SETTINGS frame was outstanding",
            ));
        }
        self.awaiting_ack = false;
        Ok(())
    }

    pub fn apply_peer_settings(&mut self, params: &[(SettingsParameter, u32)]) -> Result<(), HttpError> {
        for (param, value) in params {
            self.peer.apply(*param, *value)?;
        }
        Ok(())
    }
}
