//! Frame payloads.
//!
//! The payload is the frame's own memory: segments are shared into the
//! packet, never copied or modified. Timing fields travel in the header.

use bytes::Bytes;

use crate::error::{GdpError, Result};
use crate::protocol::{PacketHeader, PayloadType, ProtocolVersion, CLOCK_TIME_NONE, HEADER_SIZE};
use crate::types::{frame_flags, Frame};

#[inline]
fn to_wire(value: Option<u64>) -> u64 {
    value.unwrap_or(CLOCK_TIME_NONE)
}

#[inline]
fn from_wire(value: u64) -> Option<u64> {
    (value != CLOCK_TIME_NONE).then_some(value)
}

/// Encode a frame packet.
///
/// Returns the encoded header and the payload segments (reference-counted
/// clones of the frame's segments).
///
/// # Example
///
/// ```
/// use gdp_protocol::codec::encode_frame;
/// use gdp_protocol::protocol::{decode_header, flags, PayloadType, ProtocolVersion};
/// use gdp_protocol::types::Frame;
///
/// let frame = Frame::new(&b"abc"[..]).with_pts(1_000);
/// let (header, payload) = encode_frame(&frame, flags::CRC, ProtocolVersion::Current).unwrap();
///
/// let decoded = decode_header(&header).unwrap();
/// assert_eq!(decoded.payload_type, PayloadType::Frame);
/// assert_eq!(decoded.payload_length, 3);
/// assert_eq!(decoded.timestamp, 1_000);
/// assert_eq!(payload.len(), 1);
/// ```
pub fn encode_frame(
    frame: &Frame,
    flags: u8,
    version: ProtocolVersion,
) -> Result<([u8; HEADER_SIZE], Vec<Bytes>)> {
    let length = frame.len();
    let payload_length = u32::try_from(length).map_err(|_| GdpError::PayloadTooLarge {
        size: length as u64,
        max: u64::from(u32::MAX),
    })?;

    let mut header = PacketHeader::new(version, flags, PayloadType::Frame, payload_length);
    header.timestamp = to_wire(frame.pts);
    header.duration = to_wire(frame.duration);
    header.offset = to_wire(frame.offset);
    header.offset_end = to_wire(frame.offset_end);
    header.frame_flags = frame.flags & frame_flags::WIRE_MASK;
    header.dts = to_wire(frame.dts);

    let payload = frame.segments().to_vec();
    Ok((header.encode(&payload)?, payload))
}

/// Rebuild a frame from a frame packet.
///
/// The decode timestamp is only taken from current-generation headers.
pub fn decode_frame_header(header: &PacketHeader, payload: Bytes) -> Frame {
    let mut frame = Frame::new(payload);
    frame.pts = from_wire(header.timestamp);
    frame.duration = from_wire(header.duration);
    frame.offset = from_wire(header.offset);
    frame.offset_end = from_wire(header.offset_end);
    frame.flags = header.frame_flags & frame_flags::WIRE_MASK;
    if header.version() == Some(ProtocolVersion::Current) {
        frame.dts = from_wire(header.dts);
    }
    frame
}
