//! Outbound packet: an encoded header plus shared payload segments.
//!
//! Payload segments are `bytes::Bytes`, so a packet built from a frame
//! shares the frame's memory instead of copying it.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use gdp_protocol::protocol::{
//!     build_packet, flags, PacketHeader, PayloadType, ProtocolVersion, HEADER_SIZE,
//! };
//!
//! let header =
//!     PacketHeader::new(ProtocolVersion::Current, flags::CRC_HEADER, PayloadType::Frame, 5);
//! let packet = build_packet(&header, vec![Bytes::from_static(b"hello")]).unwrap();
//!
//! assert_eq!(packet.len(), HEADER_SIZE + 5);
//! assert_eq!(&packet.to_bytes()[HEADER_SIZE..], b"hello");
//! ```

use bytes::Bytes;

use super::wire_format::{PacketHeader, HEADER_SIZE};
use crate::error::Result;

/// A packet ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    /// Encoded header.
    pub header: [u8; HEADER_SIZE],
    /// Payload segments, written in order after the header.
    pub payload: Vec<Bytes>,
    /// Header-class packet (stream start, caps, segment, tag) that late
    /// readers need replayed. Not a wire flag.
    pub is_header: bool,
}

impl OutboundPacket {
    /// Create a packet from an encoded header and payload segments.
    pub fn new(header: [u8; HEADER_SIZE], payload: Vec<Bytes>) -> Self {
        Self {
            header,
            payload,
            is_header: false,
        }
    }

    /// Create a packet with a single payload segment (possibly empty).
    pub fn single(header: [u8; HEADER_SIZE], payload: Bytes) -> Self {
        let payload = if payload.is_empty() {
            Vec::new()
        } else {
            vec![payload]
        };
        Self::new(header, payload)
    }

    /// Mark as header-class.
    pub fn into_header_class(mut self) -> Self {
        self.is_header = true;
        self
    }

    /// Payload length in bytes.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.iter().map(Bytes::len).sum()
    }

    /// Total length on the wire.
    #[inline]
    pub fn len(&self) -> usize {
        HEADER_SIZE + self.payload_len()
    }

    /// A packet always holds at least a header.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append the packet's wire bytes to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.len());
        buf.extend_from_slice(&self.header);
        for segment in &self.payload {
            buf.extend_from_slice(segment);
        }
    }

    /// Contiguous wire bytes (copies).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len());
        self.write_to(&mut buf);
        buf
    }
}

/// Build a packet, computing the header CRCs over `payload`.
pub fn build_packet(header: &PacketHeader, payload: Vec<Bytes>) -> Result<OutboundPacket> {
    let encoded = header.encode(&payload)?;
    Ok(OutboundPacket::new(encoded, payload))
}

/// Build a packet as one contiguous byte vector.
pub fn build_packet_bytes(header: &PacketHeader, payload: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode(&[payload])?);
    buf.extend_from_slice(payload);
    Ok(buf)
}
