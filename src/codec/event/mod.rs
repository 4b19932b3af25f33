//! Event payloads.
//!
//! The two protocol generations serialize events in incompatible ways, so
//! each has its own pure encoder/decoder pair ([`legacy`], [`current`]).
//! [`encode_event`] and [`decode_event`] are the only places that choose
//! between them.

pub mod current;
pub mod legacy;

use bytes::Bytes;

use crate::error::{GdpError, Result};
use crate::protocol::{PacketHeader, PayloadType, ProtocolVersion, CLOCK_TIME_NONE, HEADER_SIZE};
use crate::types::Event;

/// Encode an event packet for the given generation.
pub fn encode_event(
    event: &Event,
    flags: u8,
    version: ProtocolVersion,
) -> Result<([u8; HEADER_SIZE], Bytes)> {
    let (code, payload) = match version {
        ProtocolVersion::Legacy => legacy::encode_event(event)?,
        ProtocolVersion::Current => current::encode_event(event)?,
    };

    let mut header = PacketHeader::new(
        version,
        flags,
        PayloadType::Event(code),
        payload.len() as u32,
    );
    header.timestamp = event.timestamp.unwrap_or(CLOCK_TIME_NONE);
    Ok((header.encode(&[&payload])?, payload))
}

/// Decode an event packet, choosing the strategy from the header version.
///
/// Per-packet problems come back as recoverable errors
/// ([`GdpError::is_recoverable`]); a header that is not an event packet or
/// carries an unknown version is an error of its own kind.
pub fn decode_event(header: &PacketHeader, payload: &[u8]) -> Result<Event> {
    let PayloadType::Event(code) = header.payload_type else {
        return Err(GdpError::UnknownPayloadType(
            header.payload_type.to_raw().unwrap_or_default(),
        ));
    };

    let mut event = match header.require_version()? {
        ProtocolVersion::Legacy => legacy::decode_event(code, payload)?,
        ProtocolVersion::Current => current::decode_event(code, payload)?,
    };
    event.timestamp = (header.timestamp != CLOCK_TIME_NONE).then_some(header.timestamp);
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_header, flags, validate_packet};
    use crate::types::{seek_flags, EventType, Format, SeekParams, SeekType};

    fn seek_params() -> SeekParams {
        SeekParams {
            rate: 1.0,
            format: Format::Time,
            flags: seek_flags::FLUSH | seek_flags::ACCURATE,
            start_type: SeekType::Set,
            start: 2_000_000_000,
            stop_type: SeekType::Set,
            stop: 8_000_000_000,
        }
    }

    fn round_trip(event: &Event, version: ProtocolVersion) -> Result<Event> {
        let (header, payload) = encode_event(event, flags::CRC, version)?;
        assert!(validate_packet(&header, &payload));
        decode_event(&decode_header(&header)?, &payload)
    }

    #[test]
    fn test_timestamp_travels_in_header() {
        let event = Event::eos().with_timestamp(123_456);
        for version in [ProtocolVersion::Legacy, ProtocolVersion::Current] {
            let decoded = round_trip(&event, version).unwrap();
            assert_eq!(decoded.timestamp, Some(123_456));
            assert_eq!(decoded.event_type(), EventType::Eos);
        }
        assert_eq!(round_trip(&Event::eos(), ProtocolVersion::Current).unwrap().timestamp, None);
    }

    #[test]
    fn test_seek_in_both_generations() {
        let event = Event::seek(&seek_params());

        let legacy = round_trip(&event, ProtocolVersion::Legacy).unwrap();
        assert_eq!(legacy.parse_seek(), Some(seek_params()));

        let current = round_trip(&event, ProtocolVersion::Current).unwrap();
        assert_eq!(current.parse_seek(), Some(seek_params()));
    }

    #[test]
    fn test_cross_generation_payloads_are_rejected() {
        let event = Event::seek(&seek_params());

        // Legacy binary seek presented as a current-generation packet.
        let (header, payload) = encode_event(&event, flags::NONE, ProtocolVersion::Legacy).unwrap();
        let mut header = decode_header(&header).unwrap();
        header.major_version = 1;
        header.minor_version = 0;
        let err = decode_event(&header, &payload).unwrap_err();
        assert!(err.is_recoverable());

        // Current text seek presented as a legacy packet.
        let (header, payload) =
            encode_event(&event, flags::NONE, ProtocolVersion::Current).unwrap();
        let mut header = decode_header(&header).unwrap();
        header.major_version = 0;
        header.minor_version = 2;
        let err = decode_event(&header, &payload).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_non_event_header() {
        let header = PacketHeader::new(ProtocolVersion::Current, 0, PayloadType::Frame, 0);
        assert!(matches!(decode_event(&header, &[]), Err(GdpError::UnknownPayloadType(1))));
    }

    #[test]
    fn test_unknown_version() {
        let mut header = PacketHeader::new(ProtocolVersion::Current, 0, PayloadType::Event(10), 0);
        header.major_version = 3;
        assert!(matches!(
            decode_event(&header, &[]),
            Err(GdpError::UnsupportedVersion { major: 3, .. })
        ));
    }
}
