//! Media frame: shared memory segments plus timing metadata.

use bytes::Bytes;

/// Frame flag constants.
pub mod frame_flags {
    /// Frame was produced by a live source.
    pub const LIVE: u16 = 0x0010;
    /// Frame should be decoded but not rendered.
    pub const DECODE_ONLY: u16 = 0x0020;
    /// First frame after a discontinuity.
    pub const DISCONT: u16 = 0x0040;
    /// Timestamps need resynchronization.
    pub const RESYNC: u16 = 0x0080;
    /// Data may be corrupted.
    pub const CORRUPTED: u16 = 0x0100;
    /// Media-specific marker.
    pub const MARKER: u16 = 0x0200;
    /// Frame holds stream header data.
    pub const HEADER: u16 = 0x0400;
    /// Frame is a gap filler.
    pub const GAP: u16 = 0x0800;
    /// Frame may be dropped.
    pub const DROPPABLE: u16 = 0x1000;
    /// Frame cannot be decoded independently.
    pub const DELTA_UNIT: u16 = 0x2000;
    /// Memory of the frame was tagged.
    pub const TAG_MEMORY: u16 = 0x4000;
    /// Sink should wait for this frame's end before continuing.
    pub const SYNC_AFTER: u16 = 0x8000;

    /// Flags that survive serialization. The rest only matter to the local
    /// pipeline.
    pub const WIRE_MASK: u16 = LIVE | DISCONT | HEADER | GAP | DELTA_UNIT;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u16, flag: u16) -> bool {
        flags & flag != 0
    }
}

/// A media frame.
///
/// The frame owns its data as one or more reference-counted segments; the
/// encoder shares them into outgoing packets without copying.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    segments: Vec<Bytes>,
    /// Presentation timestamp (ns).
    pub pts: Option<u64>,
    /// Decode timestamp (ns).
    pub dts: Option<u64>,
    /// Duration (ns).
    pub duration: Option<u64>,
    /// Media-specific start offset.
    pub offset: Option<u64>,
    /// Media-specific end offset.
    pub offset_end: Option<u64>,
    /// Flag bits, see [`frame_flags`].
    pub flags: u16,
}

impl Frame {
    /// Create a frame backed by a single segment.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let segments = if data.is_empty() { Vec::new() } else { vec![data] };
        Self {
            segments,
            ..Self::default()
        }
    }

    /// Create a frame from several segments.
    pub fn from_segments(segments: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            segments: segments.into_iter().filter(|s| !s.is_empty()).collect(),
            ..Self::default()
        }
    }

    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = Some(dts);
        self
    }

    pub fn with_duration(mut self, duration: u64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_offsets(mut self, offset: u64, offset_end: u64) -> Self {
        self.offset = Some(offset);
        self.offset_end = Some(offset_end);
        self
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    /// Append a memory segment.
    pub fn append(&mut self, segment: Bytes) {
        if !segment.is_empty() {
            self.segments.push(segment);
        }
    }

    pub fn segments(&self) -> &[Bytes] {
        &self.segments
    }

    /// Total byte length across all segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Bytes::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn has_flag(&self, flag: u16) -> bool {
        frame_flags::has_flag(self.flags, flag)
    }

    /// Contiguous view of the data. Copies only when there are several
    /// segments.
    pub fn to_bytes(&self) -> Bytes {
        match self.segments.as_slice() {
            [] => Bytes::new(),
            [one] => one.clone(),
            many => Bytes::from(many.concat()),
        }
    }
}
