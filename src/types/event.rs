//! In-band control events.
//!
//! An [`Event`] is a type, an optional timestamp, and an optional
//! [`Structure`] holding its fields. Helpers build and read the field
//! layouts of the common event types (stream start, segment, seek).
//!
//! Event type codes carry direction and stickiness in their low byte:
//!
//! ```text
//! code = (number << 8) | flags
//! flags: UPSTREAM=1, DOWNSTREAM=2, SERIALIZED=4, STICKY=8, STICKY_MULTI=16
//! ```

use super::structure::{Structure, Value};

/// Direction and stickiness bits in an event type code.
pub mod event_type_flags {
    pub const UPSTREAM: u16 = 1 << 0;
    pub const DOWNSTREAM: u16 = 1 << 1;
    pub const SERIALIZED: u16 = 1 << 2;
    pub const STICKY: u16 = 1 << 3;
    pub const STICKY_MULTI: u16 = 1 << 4;

    pub const BOTH: u16 = UPSTREAM | DOWNSTREAM;
    /// Mask of all flag bits.
    pub const MASK: u16 = 0xFF;
}

use event_type_flags::{BOTH, DOWNSTREAM, SERIALIZED, STICKY, STICKY_MULTI, UPSTREAM};

const fn make_type(number: u16, flags: u16) -> u16 {
    (number << 8) | flags
}

/// Event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    FlushStart,
    FlushStop,
    StreamStart,
    Segment,
    Tag,
    Eos,
    SegmentDone,
    Gap,
    Qos,
    Seek,
    Navigation,
    Latency,
    Reconfigure,
    /// Any other code, carried verbatim.
    Other(u16),
}

impl EventType {
    const KNOWN: [EventType; 13] = [
        EventType::FlushStart,
        EventType::FlushStop,
        EventType::StreamStart,
        EventType::Segment,
        EventType::Tag,
        EventType::Eos,
        EventType::SegmentDone,
        EventType::Gap,
        EventType::Qos,
        EventType::Seek,
        EventType::Navigation,
        EventType::Latency,
        EventType::Reconfigure,
    ];

    /// Code used by the current protocol generation.
    pub const fn code(self) -> u16 {
        match self {
            EventType::FlushStart => make_type(10, BOTH),
            EventType::FlushStop => make_type(20, BOTH | SERIALIZED),
            EventType::StreamStart => make_type(40, DOWNSTREAM | SERIALIZED | STICKY),
            EventType::Segment => make_type(70, DOWNSTREAM | SERIALIZED | STICKY),
            EventType::Tag => make_type(80, DOWNSTREAM | SERIALIZED | STICKY | STICKY_MULTI),
            EventType::Eos => make_type(110, DOWNSTREAM | SERIALIZED | STICKY),
            EventType::SegmentDone => make_type(150, DOWNSTREAM | SERIALIZED),
            EventType::Gap => make_type(160, DOWNSTREAM | SERIALIZED),
            EventType::Qos => make_type(190, UPSTREAM),
            EventType::Seek => make_type(200, UPSTREAM),
            EventType::Navigation => make_type(210, UPSTREAM),
            EventType::Latency => make_type(220, UPSTREAM),
            EventType::Reconfigure => make_type(240, UPSTREAM),
            EventType::Other(code) => code,
        }
    }

    /// Map a current-generation code back to a type. Total.
    pub fn from_code(code: u16) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|t| t.code() == code)
            .unwrap_or(EventType::Other(code))
    }

    fn flags(self) -> u16 {
        self.code() & event_type_flags::MASK
    }

    pub fn is_upstream(self) -> bool {
        self.flags() & UPSTREAM != 0
    }

    pub fn is_downstream(self) -> bool {
        self.flags() & DOWNSTREAM != 0
    }

    pub fn is_serialized(self) -> bool {
        self.flags() & SERIALIZED != 0
    }

    /// Sticky events describe stream state and must reach late readers.
    pub fn is_sticky(self) -> bool {
        self.flags() & STICKY != 0
    }

    /// Short lowercase name, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            EventType::FlushStart => "flush-start",
            EventType::FlushStop => "flush-stop",
            EventType::StreamStart => "stream-start",
            EventType::Segment => "segment",
            EventType::Tag => "tag",
            EventType::Eos => "eos",
            EventType::SegmentDone => "segment-done",
            EventType::Gap => "gap",
            EventType::Qos => "qos",
            EventType::Seek => "seek",
            EventType::Navigation => "navigation",
            EventType::Latency => "latency",
            EventType::Reconfigure => "reconfigure",
            EventType::Other(_) => "other",
        }
    }
}

/// Unit of segment and seek positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Format {
    Undefined = 0,
    Default = 1,
    Bytes = 2,
    Time = 3,
    Buffers = 4,
    Percent = 5,
}

impl Format {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => Format::Undefined,
            1 => Format::Default,
            2 => Format::Bytes,
            3 => Format::Time,
            4 => Format::Buffers,
            5 => Format::Percent,
            _ => return None,
        })
    }
}

/// How a seek boundary is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SeekType {
    None = 0,
    Set = 1,
    End = 2,
}

impl SeekType {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => SeekType::None,
            1 => SeekType::Set,
            2 => SeekType::End,
            _ => return None,
        })
    }
}

/// Seek flag bits.
pub mod seek_flags {
    pub const FLUSH: u32 = 1 << 0;
    pub const ACCURATE: u32 = 1 << 1;
    pub const KEY_UNIT: u32 = 1 << 2;
    pub const SEGMENT: u32 = 1 << 3;
    pub const TRICKMODE: u32 = 1 << 4;
    pub const SNAP_BEFORE: u32 = 1 << 5;
    pub const SNAP_AFTER: u32 = 1 << 6;
}

/// Fields of a seek request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekParams {
    pub rate: f64,
    pub format: Format,
    pub flags: u32,
    pub start_type: SeekType,
    pub start: i64,
    pub stop_type: SeekType,
    pub stop: i64,
}

/// Playback segment carried by segment events. `None` positions are
/// unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub flags: u32,
    pub rate: f64,
    pub format: Format,
    pub base: u64,
    pub start: u64,
    pub stop: Option<u64>,
    pub time: u64,
    pub position: u64,
    pub duration: Option<u64>,
}

impl Segment {
    /// Open-ended segment in `format` starting at zero.
    pub fn new(format: Format) -> Self {
        Self {
            flags: 0,
            rate: 1.0,
            format,
            base: 0,
            start: 0,
            stop: None,
            time: 0,
            position: 0,
            duration: None,
        }
    }
}

const NONE_U64: u64 = u64::MAX;

fn opt_u64(value: Option<u64>) -> Value {
    Value::UInt64(value.unwrap_or(NONE_U64))
}

fn read_opt_u64(s: &Structure, name: &str) -> Option<Option<u64>> {
    s.get_u64(name).map(|v| (v != NONE_U64).then_some(v))
}

/// A control event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: EventType,
    /// Running-time stamp (ns) copied to and from the packet header.
    pub timestamp: Option<u64>,
    structure: Option<Structure>,
}

impl Event {
    /// Event without fields.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            timestamp: None,
            structure: None,
        }
    }

    /// Event carrying a field structure.
    pub fn new_custom(event_type: EventType, structure: Structure) -> Self {
        Self {
            event_type,
            timestamp: None,
            structure: Some(structure),
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn eos() -> Self {
        Self::new(EventType::Eos)
    }

    pub fn flush_start() -> Self {
        Self::new(EventType::FlushStart)
    }

    pub fn flush_stop(reset_time: bool) -> Self {
        Self::new_custom(
            EventType::FlushStop,
            Structure::new("GstEventFlushStop").field("reset-time", Value::Boolean(reset_time)),
        )
    }

    pub fn stream_start(stream_id: &str) -> Self {
        Self::new_custom(
            EventType::StreamStart,
            Structure::new("GstEventStreamStart")
                .field("stream-id", Value::String(stream_id.to_string())),
        )
    }

    pub fn segment(segment: &Segment) -> Self {
        Self::new_custom(
            EventType::Segment,
            Structure::new("GstEventSegment")
                .field("flags", Value::UInt(segment.flags))
                .field("rate", Value::Double(segment.rate))
                .field("format", Value::UInt(segment.format as u32))
                .field("base", Value::UInt64(segment.base))
                .field("start", Value::UInt64(segment.start))
                .field("stop", opt_u64(segment.stop))
                .field("time", Value::UInt64(segment.time))
                .field("position", Value::UInt64(segment.position))
                .field("duration", opt_u64(segment.duration)),
        )
    }

    /// Tag event; `tags` is the tag list as a structure.
    pub fn tag(tags: Structure) -> Self {
        Self::new_custom(EventType::Tag, tags)
    }

    pub fn gap(timestamp: u64, duration: Option<u64>) -> Self {
        let mut event = Self::new_custom(
            EventType::Gap,
            Structure::new("GstEventGap")
                .field("timestamp", Value::UInt64(timestamp))
                .field("duration", opt_u64(duration)),
        );
        event.timestamp = Some(timestamp);
        event
    }

    pub fn seek(params: &SeekParams) -> Self {
        Self::new_custom(
            EventType::Seek,
            Structure::new("GstEventSeek")
                .field("rate", Value::Double(params.rate))
                .field("format", Value::UInt(params.format as u32))
                .field("flags", Value::UInt(params.flags))
                .field("start-type", Value::UInt(params.start_type as u32))
                .field("start", Value::Int64(params.start))
                .field("stop-type", Value::UInt(params.stop_type as u32))
                .field("stop", Value::Int64(params.stop)),
        )
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn structure(&self) -> Option<&Structure> {
        self.structure.as_ref()
    }

    pub fn is_sticky(&self) -> bool {
        self.event_type.is_sticky()
    }

    /// Stream id of a stream-start event.
    pub fn parse_stream_start(&self) -> Option<&str> {
        if self.event_type != EventType::StreamStart {
            return None;
        }
        self.structure.as_ref()?.get_str("stream-id")
    }

    /// Segment of a segment event carrying fields.
    pub fn parse_segment(&self) -> Option<Segment> {
        if self.event_type != EventType::Segment {
            return None;
        }
        let s = self.structure.as_ref()?;
        Some(Segment {
            flags: u32::try_from(s.get_u64("flags")?).ok()?,
            rate: s.get_f64("rate")?,
            format: Format::from_u32(u32::try_from(s.get_u64("format")?).ok()?)?,
            base: s.get_u64("base")?,
            start: s.get_u64("start")?,
            stop: read_opt_u64(s, "stop")?,
            time: s.get_u64("time")?,
            position: s.get_u64("position")?,
            duration: read_opt_u64(s, "duration")?,
        })
    }

    /// Seek fields of a seek event.
    pub fn parse_seek(&self) -> Option<SeekParams> {
        if self.event_type != EventType::Seek {
            return None;
        }
        let s = self.structure.as_ref()?;
        let u32_field = |name: &str| s.get_u64(name).and_then(|v| u32::try_from(v).ok());
        Some(SeekParams {
            rate: s.get_f64("rate").unwrap_or(1.0),
            format: Format::from_u32(u32_field("format")?)?,
            flags: u32_field("flags")?,
            start_type: SeekType::from_u32(u32_field("start-type")?)?,
            start: s.get_i64("start")?,
            stop_type: SeekType::from_u32(u32_field("stop-type")?)?,
            stop: s.get_i64("stop")?,
        })
    }
}
