//! Packetizer and depacketizer settings.
//!
//! Both configs deserialize from JSON with every field optional:
//!
//! ```
//! use gdp_protocol::config::{DepayConfig, PayConfig};
//! use gdp_protocol::protocol::{flags, ProtocolVersion};
//!
//! let pay = PayConfig::from_json(r#"{ "crc_payload": true, "version": "0.2" }"#).unwrap();
//! assert_eq!(pay.flags(), flags::CRC);
//! assert_eq!(pay.version, ProtocolVersion::Legacy);
//!
//! let depay = DepayConfig::from_json("{}").unwrap();
//! assert_eq!(depay, DepayConfig::default());
//! ```

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::{flags, ProtocolVersion, DEFAULT_MAX_PAYLOAD_SIZE};

/// Default initial capacity of the depacketizer's input buffer.
pub const DEFAULT_INITIAL_CAPACITY: usize = 64 * 1024;

/// Packetizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PayConfig {
    /// Protect headers with a CRC.
    pub crc_header: bool,
    /// Protect payloads with a CRC.
    pub crc_payload: bool,
    /// Wire generation to produce.
    pub version: ProtocolVersion,
}

impl Default for PayConfig {
    fn default() -> Self {
        Self {
            crc_header: true,
            crc_payload: false,
            version: ProtocolVersion::Current,
        }
    }
}

impl PayConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_crc_header(mut self, enabled: bool) -> Self {
        self.crc_header = enabled;
        self
    }

    pub fn with_crc_payload(mut self, enabled: bool) -> Self {
        self.crc_payload = enabled;
        self
    }

    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    /// Header flags byte for these settings.
    pub fn flags(&self) -> u8 {
        let mut out = flags::NONE;
        if self.crc_header {
            out |= flags::CRC_HEADER;
        }
        if self.crc_payload {
            out |= flags::CRC_PAYLOAD;
        }
        out
    }
}

/// Depacketizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DepayConfig {
    /// Largest accepted payload; bigger announcements end the stream.
    pub max_payload_size: u32,
    /// Signed offset (ns) added to decoded frame timestamps.
    pub ts_offset: i64,
    /// Initial input buffer capacity.
    pub initial_capacity: usize,
}

impl Default for DepayConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            ts_offset: 0,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl DepayConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_payload_size(mut self, max: u32) -> Self {
        self.max_payload_size = max;
        self
    }

    pub fn with_ts_offset(mut self, offset: i64) -> Self {
        self.ts_offset = offset;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Apply `ts_offset` to a timestamp, clamping at zero.
    pub(crate) fn shift(&self, ts: u64) -> u64 {
        if self.ts_offset >= 0 {
            ts.saturating_add(self.ts_offset as u64)
        } else {
            ts.saturating_sub(self.ts_offset.unsigned_abs())
        }
    }
}
