//! Depacketizer: rebuilds packets from an arbitrarily chunked byte stream.
//!
//! Uses `bytes::BytesMut` as the input adapter. The state machine:
//! - `AwaitingHeader`: need `HEADER_SIZE` bytes
//! - `AwaitingPayload`: header checked, need `payload_length` more bytes
//! - `DispatchFrame` / `DispatchCaps` / `DispatchEvent`: decode and emit
//!
//! Every dispatch returns to `AwaitingHeader`. A fatal error poisons the
//! depacketizer: later calls fail with [`GdpError::StreamFailed`] until
//! [`Depacketizer::reset`]. Items decoded before the error are always
//! delivered first, however the input was chunked.
//!
//! # Example
//!
//! ```
//! use gdp_protocol::codec::{encode_caps, encode_frame};
//! use gdp_protocol::protocol::{flags, DepayItem, Depacketizer, ProtocolVersion};
//! use gdp_protocol::types::{Caps, Frame};
//!
//! let version = ProtocolVersion::Current;
//! let caps: Caps = "video/x-raw, width=(int)320".parse().unwrap();
//! let (caps_header, caps_payload) = encode_caps(&caps, flags::CRC, version).unwrap();
//! let frame = Frame::new(&b"pixels"[..]).with_pts(0);
//! let (frame_header, frame_payload) = encode_frame(&frame, flags::CRC, version).unwrap();
//!
//! let mut stream = Vec::new();
//! stream.extend_from_slice(&caps_header);
//! stream.extend_from_slice(&caps_payload);
//! stream.extend_from_slice(&frame_header);
//! stream.extend_from_slice(&frame_payload[0]);
//!
//! let mut depay = Depacketizer::new();
//! let items = depay.push(&stream).unwrap();
//! assert!(matches!(items[0], DepayItem::Caps(_)));
//! assert!(matches!(&items[1], DepayItem::Frame { frame, .. } if frame.to_bytes() == "pixels"));
//! ```

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::{debug, error, warn};

use super::wire_format::{check_header, PacketHeader, PayloadType, HEADER_SIZE};
use crate::codec::{decode_caps, decode_event, decode_frame_header};
use crate::config::DepayConfig;
use crate::error::{GdpError, Result};
use crate::types::{Caps, Event, Frame};

/// Observable state of the depacketizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepacketizerState {
    AwaitingHeader,
    AwaitingPayload,
    DispatchFrame,
    DispatchCaps,
    DispatchEvent,
}

/// Something the depacketizer decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum DepayItem {
    /// A frame and the caps in force when it arrived.
    Frame { frame: Frame, caps: Arc<Caps> },
    /// New caps; they apply to every following frame.
    Caps(Arc<Caps>),
    Event(Event),
}

/// Internal state with the data each step needs.
#[derive(Debug)]
enum State {
    AwaitingHeader,
    AwaitingPayload(PacketHeader),
    Dispatch(PacketHeader, Bytes),
}

/// Streaming packet decoder for one stream.
pub struct Depacketizer {
    /// Accumulated bytes not yet consumed.
    buffer: BytesMut,
    state: State,
    /// Caps from the most recent caps packet.
    caps: Option<Arc<Caps>>,
    /// Set after a fatal error.
    failed: bool,
    /// Fatal error held back by `push` behind the items decoded before it.
    deferred: Option<GdpError>,
    config: DepayConfig,
}

impl Depacketizer {
    /// Create a depacketizer with default settings.
    ///
    /// Default capacity: 64KB, max payload: 1GB.
    pub fn new() -> Self {
        Self::with_config(DepayConfig::default())
    }

    pub fn with_config(config: DepayConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(config.initial_capacity),
            state: State::AwaitingHeader,
            caps: None,
            failed: false,
            deferred: None,
            config,
        }
    }

    /// Append bytes to the input adapter without decoding.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Decode the next item, if enough bytes are buffered.
    ///
    /// Returns `Ok(None)` when more data is needed. Event packets that fail
    /// to decode are logged and skipped.
    pub fn next_item(&mut self) -> Result<Option<DepayItem>> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        if self.failed {
            return Err(GdpError::StreamFailed);
        }
        self.step().map_err(|e| {
            error!(error = %e, "Depacketizer failed");
            self.failed = true;
            self.state = State::AwaitingHeader;
            e
        })
    }

    /// Push data and extract all complete items.
    ///
    /// A fatal error hit after some items were decoded is held back: this
    /// call returns those items and the next call returns the error. Feeding
    /// the same bytes in one call or in pieces yields the same sequence.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<DepayItem>> {
        self.push_bytes(data);

        let mut items = Vec::new();
        loop {
            match self.next_item() {
                Ok(Some(item)) => items.push(item),
                Ok(None) => return Ok(items),
                Err(e) if items.is_empty() => return Err(e),
                Err(e) => {
                    self.deferred = Some(e);
                    return Ok(items);
                }
            }
        }
    }

    fn step(&mut self) -> Result<Option<DepayItem>> {
        loop {
            match std::mem::replace(&mut self.state, State::AwaitingHeader) {
                State::AwaitingHeader => {
                    if self.buffer.len() < HEADER_SIZE {
                        return Ok(None);
                    }
                    let raw = self.buffer.split_to(HEADER_SIZE);
                    check_header(&raw)?;
                    let header = PacketHeader::decode(&raw)?;
                    header.require_version()?;

                    if header.payload_length > self.config.max_payload_size {
                        return Err(GdpError::PayloadTooLarge {
                            size: u64::from(header.payload_length),
                            max: u64::from(self.config.max_payload_size),
                        });
                    }
                    self.state = State::AwaitingPayload(header);
                }

                State::AwaitingPayload(header) => {
                    let length = header.payload_length as usize;
                    if self.buffer.len() < length {
                        self.state = State::AwaitingPayload(header);
                        return Ok(None);
                    }
                    let payload = self.buffer.split_to(length).freeze();
                    header.check_payload_crc(&payload)?;

                    match header.payload_type {
                        PayloadType::Frame | PayloadType::Caps | PayloadType::Event(_) => {
                            self.state = State::Dispatch(header, payload);
                        }
                        other => {
                            return Err(GdpError::UnknownPayloadType(
                                other.to_raw().unwrap_or_default(),
                            ))
                        }
                    }
                }

                State::Dispatch(header, payload) => {
                    if let Some(item) = self.dispatch(&header, payload)? {
                        return Ok(Some(item));
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, header: &PacketHeader, payload: Bytes) -> Result<Option<DepayItem>> {
        match header.payload_type {
            PayloadType::Frame => {
                let caps = self.caps.clone().ok_or(GdpError::FrameBeforeCaps)?;
                let mut frame = decode_frame_header(header, payload);
                if self.config.ts_offset != 0 {
                    frame.pts = frame.pts.map(|ts| self.config.shift(ts));
                    frame.dts = frame.dts.map(|ts| self.config.shift(ts));
                }
                Ok(Some(DepayItem::Frame { frame, caps }))
            }
            PayloadType::Caps => {
                let caps = Arc::new(decode_caps(&payload)?);
                debug!(caps = %caps, "Received caps");
                self.caps = Some(caps.clone());
                Ok(Some(DepayItem::Caps(caps)))
            }
            PayloadType::Event(code) => match decode_event(header, &payload) {
                Ok(event) => Ok(Some(DepayItem::Event(event))),
                Err(e) if e.is_recoverable() => {
                    warn!(code, error = %e, "Dropping event packet");
                    Ok(None)
                }
                Err(e) => Err(e),
            },
            other => Err(GdpError::UnknownPayloadType(
                other.to_raw().unwrap_or_default(),
            )),
        }
    }

    /// Current state.
    pub fn state(&self) -> DepacketizerState {
        match &self.state {
            State::AwaitingHeader => DepacketizerState::AwaitingHeader,
            State::AwaitingPayload(_) => DepacketizerState::AwaitingPayload,
            State::Dispatch(header, _) => match header.payload_type {
                PayloadType::Frame => DepacketizerState::DispatchFrame,
                PayloadType::Caps => DepacketizerState::DispatchCaps,
                _ => DepacketizerState::DispatchEvent,
            },
        }
    }

    /// Caps from the most recent caps packet.
    pub fn caps(&self) -> Option<&Arc<Caps>> {
        self.caps.as_ref()
    }

    /// Whether a fatal error is pending a reset. Also true while the error
    /// itself is still waiting to be returned.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop buffered bytes and any partial packet and clear the failure.
    /// Known caps are kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::AwaitingHeader;
        self.failed = false;
        self.deferred = None;
    }

    /// Like [`reset`](Self::reset), and forget the caps too.
    pub fn clear(&mut self) {
        self.reset();
        self.caps = None;
    }
}

impl Default for Depacketizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_caps, encode_event, encode_frame};
    use crate::protocol::{flags, ProtocolVersion};
    use crate::types::EventType;
    use proptest::prelude::*;

    const V: ProtocolVersion = ProtocolVersion::Current;

    fn caps_bytes(text: &str) -> Vec<u8> {
        let caps: Caps = text.parse().unwrap();
        let (header, payload) = encode_caps(&caps, flags::CRC, V).unwrap();
        [&header[..], &payload[..]].concat()
    }

    fn frame_bytes(data: &'static [u8], pts: u64) -> Vec<u8> {
        let frame = Frame::new(data).with_pts(pts);
        let (header, payload) = encode_frame(&frame, flags::CRC, V).unwrap();
        let mut out = header.to_vec();
        for segment in payload {
            out.extend_from_slice(&segment);
        }
        out
    }

    fn event_bytes(event: &Event, version: ProtocolVersion) -> Vec<u8> {
        let (header, payload) = encode_event(event, flags::CRC, version).unwrap();
        [&header[..], &payload[..]].concat()
    }

    fn stream() -> Vec<u8> {
        [
            event_bytes(&Event::stream_start("s0"), V),
            caps_bytes("audio/x-raw, rate=(int)8000"),
            frame_bytes(b"first", 0),
            event_bytes(&Event::flush_start(), V),
            frame_bytes(b"", 10),
            caps_bytes("audio/x-raw, rate=(int)16000"),
            frame_bytes(b"second frame", 20),
            event_bytes(&Event::eos(), V),
        ]
        .concat()
    }

    #[test]
    fn test_full_stream() {
        let mut depay = Depacketizer::new();
        let items = depay.push(&stream()).unwrap();
        assert_eq!(items.len(), 8);
        assert!(depay.is_empty());
        assert_eq!(depay.state(), DepacketizerState::AwaitingHeader);

        match &items[0] {
            DepayItem::Event(e) => assert_eq!(e.parse_stream_start(), Some("s0")),
            other => panic!("unexpected {other:?}"),
        }
        match &items[2] {
            DepayItem::Frame { frame, caps } => {
                assert_eq!(&frame.to_bytes()[..], b"first");
                assert_eq!(caps.structure(0).unwrap().get_i64("rate"), Some(8000));
            }
            other => panic!("unexpected {other:?}"),
        }
        match &items[6] {
            DepayItem::Frame { frame, caps } => {
                assert_eq!(frame.pts, Some(20));
                assert_eq!(caps.structure(0).unwrap().get_i64("rate"), Some(16000));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&items[7], DepayItem::Event(e) if e.event_type() == EventType::Eos));
    }

    #[test]
    fn test_fragmented_header_and_payload() {
        let bytes = caps_bytes("video/x-raw");
        let mut depay = Depacketizer::new();

        assert!(depay.push(&bytes[..10]).unwrap().is_empty());
        assert_eq!(depay.state(), DepacketizerState::AwaitingHeader);

        assert!(depay.push(&bytes[10..HEADER_SIZE + 3]).unwrap().is_empty());
        assert_eq!(depay.state(), DepacketizerState::AwaitingPayload);

        let items = depay.push(&bytes[HEADER_SIZE + 3..]).unwrap();
        assert_eq!(items.len(), 1);
        assert!(depay.caps().is_some());
    }

    #[test]
    fn test_next_item_one_at_a_time() {
        let mut depay = Depacketizer::new();
        depay.push_bytes(&stream());
        let mut count = 0;
        while depay.next_item().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 8);
    }

    #[test]
    fn test_frame_before_caps_is_fatal() {
        let mut depay = Depacketizer::new();
        let err = depay.push(&frame_bytes(b"early", 0)).unwrap_err();
        assert!(matches!(err, GdpError::FrameBeforeCaps));
        assert!(depay.is_failed());

        // Poisoned until reset.
        assert!(matches!(depay.push(&caps_bytes("a/b")), Err(GdpError::StreamFailed)));

        depay.clear();
        let bytes = [caps_bytes("a/b"), frame_bytes(b"late", 0)].concat();
        let items = depay.push(&bytes).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_header_crc_mismatch_is_fatal() {
        let mut bytes = caps_bytes("a/b");
        bytes[12] ^= 0x01;
        let mut depay = Depacketizer::new();
        assert!(matches!(depay.push(&bytes), Err(GdpError::HeaderCrcMismatch { .. })));
        assert!(matches!(depay.next_item(), Err(GdpError::StreamFailed)));
    }

    /// Feed `chunks` until the first error; return the items and the error.
    fn until_error(chunks: &[&[u8]]) -> (Vec<DepayItem>, Option<GdpError>) {
        let mut depay = Depacketizer::new();
        let mut items = Vec::new();
        for chunk in chunks {
            match depay.push(chunk) {
                Ok(more) => items.extend(more),
                Err(e) => return (items, Some(e)),
            }
        }
        match depay.push(&[]) {
            Ok(more) => {
                items.extend(more);
                (items, None)
            }
            Err(e) => (items, Some(e)),
        }
    }

    #[test]
    fn test_items_before_fatal_error_are_delivered() {
        let mut corrupt = caps_bytes("a/b, rate=(int)2");
        corrupt[20] ^= 0x04;
        let bytes = [caps_bytes("a/b"), frame_bytes(b"good", 7), corrupt].concat();

        let mut depay = Depacketizer::new();
        let items = depay.push(&bytes).unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], DepayItem::Frame { frame, .. } if frame.pts == Some(7)));
        assert!(depay.is_failed());
        assert!(matches!(depay.push(&[]), Err(GdpError::HeaderCrcMismatch { .. })));
        assert!(matches!(depay.push(&[]), Err(GdpError::StreamFailed)));

        let (whole, whole_err) = until_error(&[&bytes]);
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        let (single, single_err) = until_error(&chunks);
        assert_eq!(whole, single);
        assert!(matches!(whole_err, Some(GdpError::HeaderCrcMismatch { .. })));
        assert!(matches!(single_err, Some(GdpError::HeaderCrcMismatch { .. })));
    }

    #[test]
    fn test_reset_drops_deferred_error() {
        let mut corrupt = caps_bytes("a/b");
        corrupt[20] ^= 0x04;
        let mut depay = Depacketizer::new();
        assert_eq!(depay.push(&[caps_bytes("a/b"), corrupt].concat()).unwrap().len(), 1);

        depay.reset();
        assert!(!depay.is_failed());
        assert_eq!(depay.push(&frame_bytes(b"next", 0)).unwrap().len(), 1);
    }

    #[test]
    fn test_payload_crc_mismatch_is_fatal() {
        let mut bytes = caps_bytes("a/b");
        let last = bytes.len() - 2;
        bytes[last] ^= 0x20;
        let mut depay = Depacketizer::new();
        assert!(matches!(depay.push(&bytes), Err(GdpError::PayloadCrcMismatch { .. })));
    }

    #[test]
    fn test_unknown_payload_type_is_fatal() {
        for raw in [0u16, 3, 63] {
            let header = PacketHeader::new(V, flags::CRC_HEADER, PayloadType::from_raw(raw), 0);
            let mut depay = Depacketizer::new();
            let err = depay.push(&header.encode::<&[u8]>(&[]).unwrap()).unwrap_err();
            assert!(matches!(err, GdpError::UnknownPayloadType(r) if r == raw));
        }
    }

    #[test]
    fn test_unsupported_version_is_fatal() {
        let mut header = PacketHeader::new(V, flags::CRC_HEADER, PayloadType::Caps, 0);
        header.major_version = 2;
        let mut depay = Depacketizer::new();
        assert!(matches!(
            depay.push(&header.encode::<&[u8]>(&[]).unwrap()),
            Err(GdpError::UnsupportedVersion { major: 2, .. })
        ));
    }

    #[test]
    fn test_max_payload_validation() {
        let config = DepayConfig::default().with_max_payload_size(4);
        let mut depay = Depacketizer::with_config(config);
        let result = depay.push(&caps_bytes("video/x-raw"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_invalid_caps_is_fatal() {
        let payload = b"video/x-raw, width=(int)wide\0";
        let header = PacketHeader::new(V, flags::CRC, PayloadType::Caps, payload.len() as u32);
        let bytes = [&header.encode(&[payload]).unwrap()[..], &payload[..]].concat();
        let mut depay = Depacketizer::new();
        assert!(matches!(depay.push(&bytes), Err(GdpError::InvalidCaps(_))));
    }

    #[test]
    fn test_empty_caps_payload() {
        let header = PacketHeader::new(V, flags::CRC, PayloadType::Caps, 0);
        let mut depay = Depacketizer::new();
        let items = depay.push(&header.encode::<&[u8]>(&[]).unwrap()).unwrap();
        assert!(matches!(&items[0], DepayItem::Caps(c) if c.is_empty()));
    }

    #[test]
    fn test_bad_events_are_dropped() {
        let payload = b"not a structure\0";
        let tag = PayloadType::Event(EventType::Tag.code());
        let header = PacketHeader::new(V, flags::CRC, tag, payload.len() as u32);
        let bad = [&header.encode(&[payload]).unwrap()[..], &payload[..]].concat();

        let legacy_tag =
            PacketHeader::new(ProtocolVersion::Legacy, flags::CRC, PayloadType::Event(118), 0);

        let bytes = [
            bad,
            legacy_tag.encode::<&[u8]>(&[]).unwrap().to_vec(),
            event_bytes(&Event::eos(), ProtocolVersion::Legacy),
        ]
        .concat();

        let mut depay = Depacketizer::new();
        let items = depay.push(&bytes).unwrap();
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], DepayItem::Event(e) if e.event_type() == EventType::Eos));
        assert!(!depay.is_failed());
    }

    #[test]
    fn test_reset_keeps_caps() {
        let mut depay = Depacketizer::new();
        depay.push(&caps_bytes("a/b")).unwrap();
        depay.push_bytes(&frame_bytes(b"partial", 0)[..20]);
        assert_eq!(depay.len(), 20);

        depay.reset();
        assert!(depay.is_empty());
        assert!(depay.caps().is_some());
        let items = depay.push(&frame_bytes(b"whole", 5)).unwrap();
        assert_eq!(items.len(), 1);

        depay.clear();
        assert!(depay.caps().is_none());
    }

    #[test]
    fn test_ts_offset() {
        let mut depay = Depacketizer::with_config(DepayConfig::default().with_ts_offset(-15));
        let bytes = [caps_bytes("a/b"), frame_bytes(b"x", 100), frame_bytes(b"y", 10)].concat();
        let items = depay.push(&bytes).unwrap();
        let pts: Vec<_> = items
            .iter()
            .filter_map(|item| match item {
                DepayItem::Frame { frame, .. } => Some(frame.pts),
                _ => None,
            })
            .collect();
        assert_eq!(pts, vec![Some(85), Some(0)]);
    }

    fn drain(depay: &mut Depacketizer, chunks: &[&[u8]]) -> Vec<DepayItem> {
        let mut items = Vec::new();
        for chunk in chunks {
            items.extend(depay.push(chunk).unwrap());
        }
        items
    }

    #[test]
    fn test_byte_at_a_time() {
        let bytes = stream();
        let whole = Depacketizer::new().push(&bytes).unwrap();

        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        let single = drain(&mut Depacketizer::new(), &chunks);
        assert_eq!(whole, single);
    }

    proptest! {
        #[test]
        fn prop_fragmentation_invariance(chunk_size in 1usize..200) {
            let bytes = stream();
            let whole = Depacketizer::new().push(&bytes).unwrap();

            let chunks: Vec<&[u8]> = bytes.chunks(chunk_size).collect();
            let split = drain(&mut Depacketizer::new(), &chunks);
            prop_assert_eq!(whole, split);
        }
    }
}
