//! Packetizer: turns frames, caps and events into ordered packets.
//!
//! Readers need the stream header (stream start, caps, segment and the last
//! tags) before any data. The payloader holds back frames and ordinary
//! events until caps, a segment and a stream start have all been seen, then
//! emits the header followed by everything it queued:
//!
//! ```text
//! submit_frame ─┐                         ┌─► [stream-start, caps, segment, tag]
//! submit_event ─┼─► queue until header ───┤
//! submit_caps  ─┘    is complete          └─► queued packets, in order
//! ```
//!
//! Afterwards frames and events pass straight through. A change of caps
//! re-sends the whole stream header; a new segment, tag or stream start is
//! sent once and replaces its entry in the cache handed to late joiners.
//!
//! # Example
//!
//! ```
//! use gdp_protocol::payloader::Payloader;
//! use gdp_protocol::types::{Caps, Event, Format, Frame, Segment};
//!
//! let mut pay = Payloader::default();
//! assert!(pay.submit_frame(Frame::new(&b"early"[..])).unwrap().is_empty());
//!
//! pay.submit_event(Event::stream_start("s0")).unwrap();
//! pay.submit_caps("audio/x-raw".parse::<Caps>().unwrap()).unwrap();
//! let packets = pay.submit_event(Event::segment(&Segment::new(Format::Time))).unwrap();
//!
//! // stream-start, caps, segment, then the queued frame
//! assert_eq!(packets.len(), 4);
//! assert!(packets[..3].iter().all(|p| p.is_header));
//! assert!(!packets[3].is_header);
//! ```

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::codec::{encode_caps, encode_event, encode_frame};
use crate::config::PayConfig;
use crate::error::Result;
use crate::protocol::{OutboundPacket, ProtocolVersion};
use crate::types::{Caps, Event, EventType, Format, Frame, Segment};

/// Header-class packets to replay to a reader joining mid-stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamHeaderCache {
    packets: Vec<OutboundPacket>,
}

impl StreamHeaderCache {
    pub fn packets(&self) -> &[OutboundPacket] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// All packets concatenated, ready to be written ahead of live data.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.packets.iter().map(OutboundPacket::len).sum());
        for packet in &self.packets {
            packet.write_to(&mut buf);
        }
        buf
    }
}

/// Packetizer for one stream.
#[derive(Debug)]
pub struct Payloader {
    config: PayConfig,
    caps: Option<Caps>,
    caps_packet: Option<OutboundPacket>,
    stream_start_packet: Option<OutboundPacket>,
    segment_packet: Option<OutboundPacket>,
    tag_packet: Option<OutboundPacket>,
    have_caps: bool,
    have_segment: bool,
    have_stream_start: bool,
    sent_streamheader: bool,
    /// Packets held back until the stream header is out.
    queue: VecDeque<OutboundPacket>,
    cache: StreamHeaderCache,
}

impl Payloader {
    pub fn new(config: PayConfig) -> Self {
        Self {
            config,
            caps: None,
            caps_packet: None,
            stream_start_packet: None,
            segment_packet: None,
            tag_packet: None,
            have_caps: false,
            have_segment: false,
            have_stream_start: false,
            sent_streamheader: false,
            queue: VecDeque::new(),
            cache: StreamHeaderCache::default(),
        }
    }

    pub fn config(&self) -> &PayConfig {
        &self.config
    }

    #[inline]
    fn flags(&self) -> u8 {
        self.config.flags()
    }

    #[inline]
    fn version(&self) -> ProtocolVersion {
        self.config.version
    }

    /// Submit new caps.
    ///
    /// Identical caps are ignored. Changed caps after the stream header went
    /// out re-send the whole header.
    pub fn submit_caps(&mut self, caps: Caps) -> Result<Vec<OutboundPacket>> {
        if self.caps.as_ref() == Some(&caps) {
            debug!(caps = %caps, "Caps unchanged");
            return Ok(Vec::new());
        }

        let (header, payload) = encode_caps(&caps, self.flags(), self.version())?;
        self.caps_packet = Some(OutboundPacket::single(header, payload).into_header_class());
        self.caps = Some(caps);
        self.have_caps = true;

        if !self.sent_streamheader {
            return Ok(self.try_initial_sequence());
        }

        self.rebuild_cache();
        debug!(packets = self.cache.len(), "Caps changed, re-sending stream header");
        Ok(self.cache.packets.clone())
    }

    /// Submit an event.
    ///
    /// Stream start, segment and tag events become part of the stream
    /// header. Other events are held back until the header is out.
    pub fn submit_event(&mut self, event: Event) -> Result<Vec<OutboundPacket>> {
        let event_type = event.event_type();
        match event_type {
            EventType::StreamStart | EventType::Segment | EventType::Tag => {
                let packet = self.encode_header_event(&event)?;
                match event_type {
                    EventType::StreamStart => self.have_stream_start = true,
                    EventType::Segment => self.have_segment = true,
                    _ => {}
                }

                let Some(packet) = packet else {
                    debug!(event = event_type.name(), "No legacy rule, event not sent");
                    return Ok(self.try_initial_sequence());
                };

                let slot = match event_type {
                    EventType::StreamStart => &mut self.stream_start_packet,
                    EventType::Segment => &mut self.segment_packet,
                    _ => &mut self.tag_packet,
                };
                *slot = Some(packet.clone());

                if !self.sent_streamheader {
                    return Ok(self.try_initial_sequence());
                }
                self.rebuild_cache();
                Ok(vec![packet])
            }
            _ => {
                let (header, payload) = encode_event(&event, self.flags(), self.version())?;
                Ok(self.emit_or_queue(OutboundPacket::single(header, payload)))
            }
        }
    }

    /// Submit a frame.
    ///
    /// A frame arriving with caps but without any segment gets a default
    /// time segment first. A frame that cannot be encoded changes nothing.
    pub fn submit_frame(&mut self, frame: Frame) -> Result<Vec<OutboundPacket>> {
        let (header, payload) = encode_frame(&frame, self.flags(), self.version())?;
        let packet = OutboundPacket::new(header, payload);

        let mut out = Vec::new();
        if self.have_caps && !self.have_segment {
            warn!("Frame without a segment, using a default time segment");
            out = self.submit_event(Event::segment(&Segment::new(Format::Time)))?;
        }
        out.extend(self.emit_or_queue(packet));
        Ok(out)
    }

    /// The stream header for readers joining now.
    pub fn stream_header(&self) -> &StreamHeaderCache {
        &self.cache
    }

    /// Whether the initial stream header has been emitted.
    pub fn is_streamheader_sent(&self) -> bool {
        self.sent_streamheader
    }

    /// Number of packets waiting for the stream header.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Forget everything and start over.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Encode a header-class event. `None` for events the legacy generation
    /// has no rule for (stream start, tag).
    fn encode_header_event(&self, event: &Event) -> Result<Option<OutboundPacket>> {
        if self.version() == ProtocolVersion::Legacy
            && matches!(event.event_type(), EventType::StreamStart | EventType::Tag)
        {
            return Ok(None);
        }
        let (header, payload) = encode_event(event, self.flags(), self.version())?;
        Ok(Some(OutboundPacket::single(header, payload).into_header_class()))
    }

    fn emit_or_queue(&mut self, packet: OutboundPacket) -> Vec<OutboundPacket> {
        if self.sent_streamheader {
            vec![packet]
        } else {
            self.queue.push_back(packet);
            Vec::new()
        }
    }

    fn try_initial_sequence(&mut self) -> Vec<OutboundPacket> {
        if self.sent_streamheader
            || !(self.have_caps && self.have_segment && self.have_stream_start)
        {
            return Vec::new();
        }

        self.rebuild_cache();
        let mut out = self.cache.packets.clone();
        out.extend(self.queue.drain(..));
        self.sent_streamheader = true;
        debug!(
            header_packets = self.cache.len(),
            total = out.len(),
            "Stream header complete"
        );
        out
    }

    fn rebuild_cache(&mut self) {
        self.cache.packets = [
            &self.stream_start_packet,
            &self.caps_packet,
            &self.segment_packet,
            &self.tag_packet,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    }
}

impl Default for Payloader {
    fn default() -> Self {
        Self::new(PayConfig::default())
    }
}
