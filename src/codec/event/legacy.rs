//! Legacy (0.x) event payloads.
//!
//! Only a handful of events have serialization rules. All of them carry an
//! empty payload except seek, which uses a fixed binary layout:
//!
//! ```text
//! ┌──────────┬──────────┬────────────┬──────────┬───────────┬──────────┐
//! │ Format   │ Flags    │ Start type │ Start    │ Stop type │ Stop     │
//! │ uint32 BE│ uint32 BE│ uint32 BE  │ int64 BE │ uint32 BE │ int64 BE │
//! └──────────┴──────────┴────────────┴──────────┴───────────┴──────────┘
//!   0..4       4..8       8..12        12..20     20..24      24..32
//! ```
//!
//! The seek rate is not carried; decoded seeks have a rate of `1.0`.
//!
//! Legacy event codes are `(number << 4) | direction flags`.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{GdpError, Result};
use crate::types::{Event, EventType, Format, SeekParams, SeekType};

/// Legacy event type codes.
pub mod codes {
    pub const FLUSH_START: u16 = 19;
    pub const FLUSH_STOP: u16 = 39;
    pub const EOS: u16 = 86;
    pub const NEW_SEGMENT: u16 = 102;
    pub const TAG: u16 = 118;
    pub const BUFFER_SIZE: u16 = 134;
    pub const QOS: u16 = 241;
    pub const SEEK: u16 = 257;
    pub const NAVIGATION: u16 = 273;
    pub const LATENCY: u16 = 289;
}

/// Size of the seek payload.
pub const SEEK_PAYLOAD_SIZE: usize = 32;

/// Legacy code of an event type, if the legacy generation knows it.
pub fn legacy_code(event_type: EventType) -> Option<u16> {
    Some(match event_type {
        EventType::FlushStart => codes::FLUSH_START,
        EventType::FlushStop => codes::FLUSH_STOP,
        EventType::Eos => codes::EOS,
        EventType::Segment => codes::NEW_SEGMENT,
        EventType::Tag => codes::TAG,
        EventType::Qos => codes::QOS,
        EventType::Seek => codes::SEEK,
        EventType::Navigation => codes::NAVIGATION,
        EventType::Latency => codes::LATENCY,
        _ => return None,
    })
}

/// Encode an event; returns the legacy subtype code and the payload.
pub fn encode_event(event: &Event) -> Result<(u16, Bytes)> {
    let event_type = event.event_type();
    match event_type {
        EventType::FlushStart | EventType::FlushStop | EventType::Eos | EventType::Segment => {
            let code = legacy_code(event_type).ok_or(GdpError::UnsupportedEvent {
                event_type,
                reason: "no legacy code",
            })?;
            Ok((code, Bytes::new()))
        }
        EventType::Seek => {
            let params = event.parse_seek().ok_or(GdpError::UnsupportedEvent {
                event_type,
                reason: "seek event without seek fields",
            })?;
            Ok((codes::SEEK, encode_seek(&params)))
        }
        _ => Err(GdpError::UnsupportedEvent {
            event_type,
            reason: "no legacy serialization rule",
        }),
    }
}

fn encode_seek(params: &SeekParams) -> Bytes {
    let mut buf = BytesMut::with_capacity(SEEK_PAYLOAD_SIZE);
    buf.put_u32(params.format as u32);
    buf.put_u32(params.flags);
    buf.put_u32(params.start_type as u32);
    buf.put_i64(params.start);
    buf.put_u32(params.stop_type as u32);
    buf.put_i64(params.stop);
    buf.freeze()
}

/// Decode a legacy event payload.
///
/// Codes without a rule yield [`GdpError::UnhandledEvent`]; a short or
/// invalid seek yields [`GdpError::MalformedPayload`]. Both are recoverable.
pub fn decode_event(code: u16, payload: &[u8]) -> Result<Event> {
    match code {
        codes::FLUSH_START => Ok(Event::new(EventType::FlushStart)),
        codes::FLUSH_STOP => Ok(Event::new(EventType::FlushStop)),
        codes::EOS => Ok(Event::new(EventType::Eos)),
        codes::NEW_SEGMENT => Ok(Event::new(EventType::Segment)),
        codes::SEEK => decode_seek(payload).map(|params| Event::seek(&params)),
        codes::TAG | codes::BUFFER_SIZE | codes::QOS | codes::NAVIGATION | codes::LATENCY => {
            debug!(code, "Legacy event type has no deserialization rule");
            Err(GdpError::UnhandledEvent(code))
        }
        _ => Err(GdpError::UnhandledEvent(code)),
    }
}

fn decode_seek(payload: &[u8]) -> Result<SeekParams> {
    if payload.len() < SEEK_PAYLOAD_SIZE {
        return Err(GdpError::MalformedPayload(format!(
            "seek payload has {} bytes, need {}",
            payload.len(),
            SEEK_PAYLOAD_SIZE
        )));
    }

    let u32_at = |at: usize| {
        u32::from_be_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]])
    };
    let i64_at = |at: usize| {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&payload[at..at + 8]);
        i64::from_be_bytes(bytes)
    };
    let malformed =
        |what: &str, value: u32| GdpError::MalformedPayload(format!("invalid seek {what} {value}"));

    let format = Format::from_u32(u32_at(0)).ok_or_else(|| malformed("format", u32_at(0)))?;
    let start_type =
        SeekType::from_u32(u32_at(8)).ok_or_else(|| malformed("start type", u32_at(8)))?;
    let stop_type =
        SeekType::from_u32(u32_at(20)).ok_or_else(|| malformed("stop type", u32_at(20)))?;

    Ok(SeekParams {
        rate: 1.0,
        format,
        flags: u32_at(4),
        start_type,
        start: i64_at(12),
        stop_type,
        stop: i64_at(24),
    })
}
