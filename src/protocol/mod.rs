//! Protocol module - wire format, checksums, and packet reassembly.
//!
//! This module implements the binary packet layer:
//! - CRC-16 over contiguous and scattered buffers
//! - 62-byte header encoding/decoding and validation
//! - Outbound packets with shared payload segments
//! - Depacketizer state machine for partial reads

mod crc;
mod depacketizer;
mod packet;
mod wire_format;

pub use crc::{crc16, crc16_scatter};
pub use depacketizer::{DepacketizerState, Depacketizer, DepayItem};
pub use packet::{build_packet, build_packet_bytes, OutboundPacket};
pub use wire_format::{
    check_header, check_payload, decode_header, encode_header, flags, offsets, validate_header,
    validate_packet, validate_payload, PacketHeader, PayloadType, ProtocolVersion,
    CLOCK_TIME_NONE, DEFAULT_MAX_PAYLOAD_SIZE, EVENT_BASE, HEADER_CRC_SPAN, HEADER_SIZE,
};
