//! Wire format encoding and decoding.
//!
//! Implements the 62-byte packet header:
//! ```text
//! ┌───────┬───────┬───────┬─────┬──────────┬──────────┬───────────┬──────────┐
//! │ Major │ Minor │ Flags │ Pad │ Type     │ Length   │ Timestamp │ Duration │
//! │ 1     │ 1     │ 1     │ 1   │ uint16 BE│ uint32 BE│ uint64 BE │ uint64 BE│
//! ├───────┴───────┴───────┴─────┼──────────┼──────────┼───────────┼──────────┤
//! │ Offset     │ Offset end     │ Flags    │ DTS      │ Pad       │ CRCs     │
//! │ uint64 BE  │ uint64 BE      │ uint16 BE│ uint64 BE│ 6 bytes   │ 2 x u16  │
//! └─────────────────────────────┴──────────┴──────────┴───────────┴──────────┘
//!   0..4        4..6  6..10  10..18  18..26  26..34  34..42  42..44  44..52
//!   52..58 padding, 58..60 header CRC, 60..62 payload CRC
//! ```
//!
//! All multi-byte integers are Big Endian. The header CRC covers bytes
//! `0..58`; the payload CRC covers the payload only.

use serde::{Deserialize, Serialize};

use super::crc::{crc16, crc16_scatter};
use crate::error::{GdpError, Result};

/// Header size in bytes (fixed, exactly 62).
pub const HEADER_SIZE: usize = 62;

/// Number of leading header bytes covered by the header CRC.
pub const HEADER_CRC_SPAN: usize = offsets::HEADER_CRC;

/// Default maximum payload size accepted by the depacketizer (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1_073_741_824;

/// Payload type of the first event subtype; event `N` is `EVENT_BASE + N`.
pub const EVENT_BASE: u16 = 64;

/// Wire value for "no timestamp" / "no offset".
pub const CLOCK_TIME_NONE: u64 = u64::MAX;

/// Flag constants for the protocol.
pub mod flags {
    /// No checksums.
    pub const NONE: u8 = 0;
    /// Header CRC field is valid.
    pub const CRC_HEADER: u8 = 0b0000_0001;
    /// Payload CRC field is valid.
    pub const CRC_PAYLOAD: u8 = 0b0000_0010;
    /// Both checksums.
    pub const CRC: u8 = CRC_HEADER | CRC_PAYLOAD;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }
}

/// Byte offsets of each header field.
pub mod offsets {
    pub const MAJOR_VERSION: usize = 0;
    pub const MINOR_VERSION: usize = 1;
    pub const FLAGS: usize = 2;
    pub const PAYLOAD_TYPE: usize = 4;
    pub const PAYLOAD_LENGTH: usize = 6;
    pub const TIMESTAMP: usize = 10;
    pub const DURATION: usize = 18;
    pub const OFFSET: usize = 26;
    pub const OFFSET_END: usize = 34;
    pub const FRAME_FLAGS: usize = 42;
    pub const DTS: usize = 44;
    pub const HEADER_CRC: usize = 58;
    pub const PAYLOAD_CRC: usize = 60;
}

/// Protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Version 0.2: a handful of events with ad hoc binary payloads.
    #[serde(rename = "0.2", alias = "legacy")]
    Legacy,
    /// Version 1.0: events carry their fields as structure text.
    #[default]
    #[serde(rename = "1.0", alias = "current")]
    Current,
}

impl ProtocolVersion {
    pub const fn major(self) -> u8 {
        match self {
            ProtocolVersion::Legacy => 0,
            ProtocolVersion::Current => 1,
        }
    }

    pub const fn minor(self) -> u8 {
        match self {
            ProtocolVersion::Legacy => 2,
            ProtocolVersion::Current => 0,
        }
    }

    /// Select the generation for a wire version pair.
    ///
    /// Minor versions are forward compatible, so only the major version
    /// decides.
    pub fn from_pair(major: u8, _minor: u8) -> Option<Self> {
        match major {
            0 => Some(ProtocolVersion::Legacy),
            1 => Some(ProtocolVersion::Current),
            _ => None,
        }
    }
}

/// What a packet carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    None,
    Frame,
    Caps,
    /// Event with the given subtype code.
    Event(u16),
    /// Values 3..=63, reserved.
    Unknown(u16),
}

impl PayloadType {
    /// Classify a raw wire value. Total.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => PayloadType::None,
            1 => PayloadType::Frame,
            2 => PayloadType::Caps,
            n if n >= EVENT_BASE => PayloadType::Event(n - EVENT_BASE),
            n => PayloadType::Unknown(n),
        }
    }

    /// Raw wire value, `None` if an event code does not fit.
    pub fn to_raw(self) -> Option<u16> {
        match self {
            PayloadType::None => Some(0),
            PayloadType::Frame => Some(1),
            PayloadType::Caps => Some(2),
            PayloadType::Event(code) => EVENT_BASE.checked_add(code),
            PayloadType::Unknown(n) => Some(n),
        }
    }
}

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub major_version: u8,
    pub minor_version: u8,
    /// Flags byte (see `flags` module).
    pub flags: u8,
    pub payload_type: PayloadType,
    /// Payload length in bytes.
    pub payload_length: u32,
    pub timestamp: u64,
    pub duration: u64,
    pub offset: u64,
    pub offset_end: u64,
    /// Frame flags restricted to the wire allow-list.
    pub frame_flags: u16,
    /// Decode timestamp; only carried by the current generation.
    pub dts: u64,
    pub header_crc: u16,
    pub payload_crc: u16,
}

impl PacketHeader {
    /// Create a header with every timing field zero.
    pub fn new(
        version: ProtocolVersion,
        flags: u8,
        payload_type: PayloadType,
        payload_length: u32,
    ) -> Self {
        Self {
            major_version: version.major(),
            minor_version: version.minor(),
            flags,
            payload_type,
            payload_length,
            timestamp: 0,
            duration: 0,
            offset: 0,
            offset_end: 0,
            frame_flags: 0,
            dts: 0,
            header_crc: 0,
            payload_crc: 0,
        }
    }

    /// Generation this header belongs to, if supported.
    pub fn version(&self) -> Option<ProtocolVersion> {
        ProtocolVersion::from_pair(self.major_version, self.minor_version)
    }

    /// Version check as a typed error.
    pub fn require_version(&self) -> Result<ProtocolVersion> {
        self.version().ok_or(GdpError::UnsupportedVersion {
            major: self.major_version,
            minor: self.minor_version,
        })
    }

    /// Encode header to bytes (Big Endian), computing the CRCs the flags ask
    /// for. `payload` are the segments that will follow the header.
    ///
    /// The `header_crc`/`payload_crc` fields of `self` are ignored. Fails
    /// if the segments do not add up to `payload_length` or an event code
    /// does not fit the payload type field.
    ///
    /// # Example
    ///
    /// ```
    /// use gdp_protocol::protocol::{
    ///     flags, PacketHeader, PayloadType, ProtocolVersion, HEADER_SIZE,
    /// };
    ///
    /// let header = PacketHeader::new(ProtocolVersion::Current, flags::CRC, PayloadType::Frame, 5);
    /// let bytes = header.encode(&[b"hello"]).unwrap();
    /// assert_eq!(bytes.len(), HEADER_SIZE);
    /// assert_eq!(&bytes[..3], &[1, 0, flags::CRC]);
    ///
    /// assert!(header.encode(&[b"hi"]).is_err());
    /// ```
    pub fn encode<S: AsRef<[u8]>>(&self, payload: &[S]) -> Result<[u8; HEADER_SIZE]> {
        let actual: u64 = payload.iter().map(|s| s.as_ref().len() as u64).sum();
        if actual != u64::from(self.payload_length) {
            return Err(GdpError::LengthMismatch {
                declared: self.payload_length,
                actual,
            });
        }
        let payload_type = match self.payload_type {
            PayloadType::None => 0,
            PayloadType::Frame => 1,
            PayloadType::Caps => 2,
            PayloadType::Unknown(raw) => raw,
            PayloadType::Event(code) => {
                EVENT_BASE.checked_add(code).ok_or(GdpError::EventCodeOverflow(code))?
            }
        };

        let mut w = HeaderWriter::new();
        w.put_u8::<{ offsets::MAJOR_VERSION }>(self.major_version);
        w.put_u8::<{ offsets::MINOR_VERSION }>(self.minor_version);
        w.put_u8::<{ offsets::FLAGS }>(self.flags);
        w.put_u16::<{ offsets::PAYLOAD_TYPE }>(payload_type);
        w.put_u32::<{ offsets::PAYLOAD_LENGTH }>(self.payload_length);
        w.put_u64::<{ offsets::TIMESTAMP }>(self.timestamp);
        w.put_u64::<{ offsets::DURATION }>(self.duration);
        w.put_u64::<{ offsets::OFFSET }>(self.offset);
        w.put_u64::<{ offsets::OFFSET_END }>(self.offset_end);
        w.put_u16::<{ offsets::FRAME_FLAGS }>(self.frame_flags);
        if self.version() == Some(ProtocolVersion::Current) {
            w.put_u64::<{ offsets::DTS }>(self.dts);
        }

        if flags::has_flag(self.flags, flags::CRC_PAYLOAD) && self.payload_length > 0 {
            w.put_u16::<{ offsets::PAYLOAD_CRC }>(crc16_scatter(payload));
        }
        if flags::has_flag(self.flags, flags::CRC_HEADER) {
            let crc = crc16(&w.buf[..HEADER_CRC_SPAN]);
            w.put_u16::<{ offsets::HEADER_CRC }>(crc);
        }
        Ok(w.finish())
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Pure field extraction: call [`validate_header`] before trusting the
    /// result.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(GdpError::ShortHeader {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }
        Ok(Self {
            major_version: buf[offsets::MAJOR_VERSION],
            minor_version: buf[offsets::MINOR_VERSION],
            flags: buf[offsets::FLAGS],
            payload_type: PayloadType::from_raw(read_u16(buf, offsets::PAYLOAD_TYPE)),
            payload_length: read_u32(buf, offsets::PAYLOAD_LENGTH),
            timestamp: read_u64(buf, offsets::TIMESTAMP),
            duration: read_u64(buf, offsets::DURATION),
            offset: read_u64(buf, offsets::OFFSET),
            offset_end: read_u64(buf, offsets::OFFSET_END),
            frame_flags: read_u16(buf, offsets::FRAME_FLAGS),
            dts: read_u64(buf, offsets::DTS),
            header_crc: read_u16(buf, offsets::HEADER_CRC),
            payload_crc: read_u16(buf, offsets::PAYLOAD_CRC),
        })
    }

    /// Check `payload` against the decoded payload CRC.
    pub fn check_payload_crc(&self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() || !self.has_payload_crc() {
            return Ok(());
        }
        let computed = crc16(payload);
        if self.payload_crc != computed {
            return Err(GdpError::PayloadCrcMismatch {
                stored: self.payload_crc,
                computed,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn has_header_crc(&self) -> bool {
        flags::has_flag(self.flags, flags::CRC_HEADER)
    }

    #[inline]
    pub fn has_payload_crc(&self) -> bool {
        flags::has_flag(self.flags, flags::CRC_PAYLOAD)
    }
}

/// Zero-initialized header buffer with offset-checked writers.
struct HeaderWriter {
    buf: [u8; HEADER_SIZE],
}

impl HeaderWriter {
    fn new() -> Self {
        Self {
            buf: [0u8; HEADER_SIZE],
        }
    }

    fn put_u8<const AT: usize>(&mut self, value: u8) {
        const { assert!(AT < HEADER_SIZE) };
        self.buf[AT] = value;
    }

    fn put_u16<const AT: usize>(&mut self, value: u16) {
        const { assert!(AT + 2 <= HEADER_SIZE) };
        self.buf[AT..AT + 2].copy_from_slice(&value.to_be_bytes());
    }

    fn put_u32<const AT: usize>(&mut self, value: u32) {
        const { assert!(AT + 4 <= HEADER_SIZE) };
        self.buf[AT..AT + 4].copy_from_slice(&value.to_be_bytes());
    }

    fn put_u64<const AT: usize>(&mut self, value: u64) {
        const { assert!(AT + 8 <= HEADER_SIZE) };
        self.buf[AT..AT + 8].copy_from_slice(&value.to_be_bytes());
    }

    fn finish(self) -> [u8; HEADER_SIZE] {
        self.buf
    }
}

#[inline]
fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}

#[inline]
fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

#[inline]
fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_be_bytes(bytes)
}

/// Check the header CRC, reporting both values on mismatch.
pub fn check_header(buf: &[u8]) -> Result<()> {
    if buf.len() < HEADER_SIZE {
        return Err(GdpError::ShortHeader {
            expected: HEADER_SIZE,
            actual: buf.len(),
        });
    }
    if !flags::has_flag(buf[offsets::FLAGS], flags::CRC_HEADER) {
        return Ok(());
    }
    let stored = read_u16(buf, offsets::HEADER_CRC);
    let computed = crc16(&buf[..HEADER_CRC_SPAN]);
    if stored != computed {
        return Err(GdpError::HeaderCrcMismatch { stored, computed });
    }
    Ok(())
}

/// Check the payload CRC against the header, reporting both values on
/// mismatch.
pub fn check_payload(header: &[u8], payload: &[u8]) -> Result<()> {
    PacketHeader::decode(header)?.check_payload_crc(payload)
}

/// Encode a header (standalone function).
#[inline]
pub fn encode_header<S: AsRef<[u8]>>(
    header: &PacketHeader,
    payload: &[S],
) -> Result<[u8; HEADER_SIZE]> {
    header.encode(payload)
}

/// Decode a header from bytes (standalone function).
#[inline]
pub fn decode_header(buf: &[u8]) -> Result<PacketHeader> {
    PacketHeader::decode(buf)
}

/// Whether the header CRC (if present) matches. Headers without the
/// header-CRC flag are trusted.
#[inline]
pub fn validate_header(buf: &[u8]) -> bool {
    check_header(buf).is_ok()
}

/// Whether the payload CRC (if present) matches. Empty payloads always
/// validate.
#[inline]
pub fn validate_payload(header: &[u8], payload: &[u8]) -> bool {
    check_payload(header, payload).is_ok()
}

/// Header and payload validation combined.
#[inline]
pub fn validate_packet(header: &[u8], payload: &[u8]) -> bool {
    validate_header(header) && validate_payload(header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_header(flags: u8) -> PacketHeader {
        let mut header = PacketHeader::new(ProtocolVersion::Current, flags, PayloadType::Frame, 5);
        header.timestamp = 0x0102_0304_0506_0708;
        header.duration = 40_000_000;
        header.offset = 7;
        header.offset_end = 8;
        header.frame_flags = 0x0040;
        header.dts = 11;
        header
    }

    #[test]
    fn test_header_size_is_exactly_62() {
        assert_eq!(HEADER_SIZE, 62);
        assert_eq!(sample_header(0).encode(&[b"hello"]).unwrap().len(), 62);
    }

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = sample_header(flags::CRC);
        let encoded = original.encode(&[b"hello"]).unwrap();
        let decoded = PacketHeader::decode(&encoded).unwrap();

        assert_eq!(decoded.payload_type, PayloadType::Frame);
        assert_eq!(decoded.payload_length, 5);
        assert_eq!(decoded.timestamp, original.timestamp);
        assert_eq!(decoded.duration, original.duration);
        assert_eq!(decoded.offset, 7);
        assert_eq!(decoded.offset_end, 8);
        assert_eq!(decoded.frame_flags, 0x0040);
        assert_eq!(decoded.dts, 11);
        assert_eq!(decoded.payload_crc, crc16(b"hello"));
        assert_eq!(decoded.header_crc, crc16(&encoded[..HEADER_CRC_SPAN]));
        assert!(validate_header(&encoded));
        assert!(validate_payload(&encoded, b"hello"));
    }

    #[test]
    fn test_header_big_endian_byte_order() {
        let bytes = sample_header(flags::NONE).encode(&[b"hello"]).unwrap();

        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[4..6], &[0, 1]);
        assert_eq!(&bytes[6..10], &[0, 0, 0, 5]);
        assert_eq!(&bytes[10..18], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[42..44], &[0x00, 0x40]);
        assert_eq!(&bytes[44..52], &[0, 0, 0, 0, 0, 0, 0, 11]);
        assert!(bytes[52..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_event_payload_type_on_wire() {
        let header = PacketHeader::new(ProtocolVersion::Current, 0, PayloadType::Event(257), 0);
        let bytes = header.encode::<&[u8]>(&[]).unwrap();
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), 64 + 257);
    }

    #[test]
    fn test_encode_rejects_inconsistent_headers() {
        let header = sample_header(flags::CRC);
        assert!(matches!(
            header.encode(&[b"hell"]),
            Err(GdpError::LengthMismatch { declared: 5, actual: 4 })
        ));
        assert!(matches!(
            header.encode(&[&b"hello"[..], &b"!"[..]]),
            Err(GdpError::LengthMismatch { declared: 5, actual: 6 })
        ));

        let overflow = PacketHeader::new(
            ProtocolVersion::Current,
            flags::CRC,
            PayloadType::Event(u16::MAX - 10),
            0,
        );
        assert!(matches!(
            encode_header::<&[u8]>(&overflow, &[]),
            Err(GdpError::EventCodeOverflow(code)) if code == u16::MAX - 10
        ));
    }

    #[test]
    fn test_legacy_header_leaves_dts_zero() {
        let mut header = sample_header(flags::NONE);
        header.major_version = 0;
        header.minor_version = 2;
        let bytes = header.encode(&[b"hello"]).unwrap();
        assert!(bytes[44..52].iter().all(|&b| b == 0));
        assert_eq!(PacketHeader::decode(&bytes).unwrap().dts, 0);
    }

    #[test]
    fn test_crc_fields_zero_without_flags() {
        let bytes = sample_header(flags::NONE).encode(&[b"hello"]).unwrap();
        assert_eq!(&bytes[58..62], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_payload_crc_zero_for_empty_payload() {
        let header = PacketHeader::new(ProtocolVersion::Current, flags::CRC, PayloadType::Caps, 0);
        let bytes = header.encode::<&[u8]>(&[]).unwrap();
        assert_eq!(&bytes[60..62], &[0, 0]);
        assert!(validate_packet(&bytes, &[]));
    }

    #[test]
    fn test_payload_crc_over_segments() {
        let header = PacketHeader::new(
            ProtocolVersion::Current,
            flags::CRC_PAYLOAD,
            PayloadType::Frame,
            10,
        );
        let bytes = header.encode(&[&b"01234"[..], &b"56789"[..]]).unwrap();
        assert!(validate_payload(&bytes, b"0123456789"));
        assert!(!validate_payload(&bytes, b"0123456780"));
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; HEADER_SIZE - 1];
        assert!(matches!(
            PacketHeader::decode(&buf),
            Err(GdpError::ShortHeader { expected: 62, actual: 61 })
        ));
        assert!(!validate_header(&buf));
    }

    #[test]
    fn test_tamper_detection_every_bit() {
        let bytes = sample_header(flags::CRC_HEADER).encode(&[b"hello"]).unwrap();
        assert!(validate_header(&bytes));

        for byte in 0..offsets::PAYLOAD_CRC {
            for bit in 0..8 {
                let mut tampered = bytes;
                tampered[byte] ^= 1 << bit;
                if byte == offsets::FLAGS && bit == 0 {
                    // Clearing the header-CRC flag turns validation off.
                    continue;
                }
                assert!(!validate_header(&tampered), "byte {byte} bit {bit}");
            }
        }
    }

    #[test]
    fn test_check_header_reports_values() {
        let mut bytes = sample_header(flags::CRC_HEADER).encode(&[b"hello"]).unwrap();
        bytes[12] ^= 0xFF;
        match check_header(&bytes) {
            Err(GdpError::HeaderCrcMismatch { stored, computed }) => assert_ne!(stored, computed),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_crc_passthrough() {
        let mut bytes = sample_header(flags::NONE).encode(&[b"hello"]).unwrap();
        bytes[20] ^= 0xFF;
        assert!(validate_header(&bytes));
        assert!(validate_payload(&bytes, b"anything at all"));
    }

    #[test]
    fn test_payload_type_classification() {
        assert_eq!(PayloadType::from_raw(0), PayloadType::None);
        assert_eq!(PayloadType::from_raw(1), PayloadType::Frame);
        assert_eq!(PayloadType::from_raw(2), PayloadType::Caps);
        assert_eq!(PayloadType::from_raw(3), PayloadType::Unknown(3));
        assert_eq!(PayloadType::from_raw(63), PayloadType::Unknown(63));
        assert_eq!(PayloadType::from_raw(64), PayloadType::Event(0));
        assert_eq!(PayloadType::Event(u16::MAX).to_raw(), None);
    }

    #[test]
    fn test_version_pairs() {
        assert_eq!(ProtocolVersion::from_pair(0, 2), Some(ProtocolVersion::Legacy));
        assert_eq!(ProtocolVersion::from_pair(1, 0), Some(ProtocolVersion::Current));
        assert_eq!(ProtocolVersion::from_pair(1, 7), Some(ProtocolVersion::Current));
        assert_eq!(ProtocolVersion::from_pair(2, 0), None);

        let mut header = sample_header(0);
        header.major_version = 9;
        assert!(matches!(
            header.require_version(),
            Err(GdpError::UnsupportedVersion { major: 9, minor: 0 })
        ));
    }

    #[test]
    fn test_version_serde_names() {
        let v: ProtocolVersion = serde_json::from_str("\"0.2\"").unwrap();
        assert_eq!(v, ProtocolVersion::Legacy);
        let v: ProtocolVersion = serde_json::from_str("\"current\"").unwrap();
        assert_eq!(v, ProtocolVersion::Current);
        assert_eq!(serde_json::to_string(&ProtocolVersion::Current).unwrap(), "\"1.0\"");
    }

    proptest! {
        #[test]
        fn prop_header_roundtrip(
            flag_bits in 0u8..4,
            kind in prop_oneof![Just(1u16), Just(2u16), 64u16..=u16::MAX],
            timestamp in any::<u64>(),
            duration in any::<u64>(),
            offset in any::<u64>(),
            offset_end in any::<u64>(),
            frame_flags in any::<u16>(),
            dts in any::<u64>(),
            payload in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut header = PacketHeader::new(
                ProtocolVersion::Current,
                flag_bits,
                PayloadType::from_raw(kind),
                payload.len() as u32,
            );
            header.timestamp = timestamp;
            header.duration = duration;
            header.offset = offset;
            header.offset_end = offset_end;
            header.frame_flags = frame_flags;
            header.dts = dts;

            let bytes = header.encode(&[&payload]).unwrap();
            let decoded = decode_header(&bytes).unwrap();

            prop_assert_eq!(decoded.major_version, 1);
            prop_assert_eq!(decoded.flags, flag_bits);
            prop_assert_eq!(decoded.payload_type, header.payload_type);
            prop_assert_eq!(decoded.payload_length, header.payload_length);
            prop_assert_eq!(decoded.timestamp, timestamp);
            prop_assert_eq!(decoded.duration, duration);
            prop_assert_eq!(decoded.offset, offset);
            prop_assert_eq!(decoded.offset_end, offset_end);
            prop_assert_eq!(decoded.frame_flags, frame_flags);
            prop_assert_eq!(decoded.dts, dts);
            prop_assert!(validate_packet(&bytes, &payload));
        }
    }
}
