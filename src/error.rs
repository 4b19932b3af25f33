//! Error types for gdp-protocol.
//!
//! Errors fall into three groups:
//!
//! - **Fatal**: the byte stream can no longer be trusted (CRC mismatch,
//!   unknown payload type, frame before caps, unsupported version). The
//!   depacketizer refuses further work until it is reset.
//! - **Recoverable**: a single event packet could not be turned into an
//!   event. The packet is dropped and decoding continues.
//! - **Caller contract**: the caller asked the encoder for something it has
//!   no serialization rule for, or handed it inconsistent input. Nothing
//!   is emitted.

use thiserror::Error;

use crate::types::EventType;

/// Main error type for all GDP operations.
#[derive(Debug, Error)]
pub enum GdpError {
    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fewer than `HEADER_SIZE` bytes were supplied to the header decoder.
    #[error("Header needs {expected} bytes, got {actual}")]
    ShortHeader { expected: usize, actual: usize },

    /// Stored header CRC does not match the header bytes.
    #[error("Header CRC mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    HeaderCrcMismatch { stored: u16, computed: u16 },

    /// Stored payload CRC does not match the payload bytes.
    #[error("Payload CRC mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    PayloadCrcMismatch { stored: u16, computed: u16 },

    /// Payload type is neither frame, caps nor event.
    #[error("Unknown payload type: {0}")]
    UnknownPayloadType(u16),

    /// A frame packet arrived before any caps packet.
    #[error("Received a frame before any caps")]
    FrameBeforeCaps,

    /// Header carries a protocol version this crate cannot decode.
    #[error("Unsupported protocol version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    /// Payload exceeds the configured (or representable) maximum.
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Caps payload could not be parsed.
    #[error("Invalid caps payload: {0}")]
    InvalidCaps(String),

    /// Event subtype is known to the decoder but not supported by it.
    #[error("Unhandled event type {0}")]
    UnhandledEvent(u16),

    /// Event payload could not be parsed.
    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),

    /// The encoder has no serialization rule for this event.
    #[error("Cannot serialize {event_type:?} event: {reason}")]
    UnsupportedEvent {
        event_type: EventType,
        reason: &'static str,
    },

    /// Payload segments do not add up to the header's payload length.
    #[error("Header declares {declared} payload bytes, got {actual}")]
    LengthMismatch { declared: u32, actual: u64 },

    /// Event code does not fit the 16-bit payload type field.
    #[error("Event code {0} does not fit the payload type field")]
    EventCodeOverflow(u16),

    /// Structure or field name that the text form cannot carry.
    #[error("Invalid structure or field name {0:?}")]
    InvalidName(String),

    /// Structure or caps text could not be parsed.
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    /// A previous fatal error left the depacketizer unusable.
    #[error("Stream failed earlier; reset required")]
    StreamFailed,

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Backpressure timeout - write buffer full.
    #[error("Backpressure timeout")]
    BackpressureTimeout,
}

impl GdpError {
    /// Whether the error only affects a single packet.
    ///
    /// Recoverable errors are logged and the packet is dropped; everything
    /// else ends the stream.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GdpError::UnhandledEvent(_) | GdpError::MalformedPayload(_)
        )
    }

    /// Whether the error means the byte stream is no longer trustworthy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GdpError::HeaderCrcMismatch { .. }
                | GdpError::PayloadCrcMismatch { .. }
                | GdpError::UnknownPayloadType(_)
                | GdpError::FrameBeforeCaps
                | GdpError::UnsupportedVersion { .. }
                | GdpError::PayloadTooLarge { .. }
                | GdpError::InvalidCaps(_)
                | GdpError::StreamFailed
        )
    }

    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        GdpError::Parse {
            position,
            message: message.into(),
        }
    }
}

/// Result type alias using GdpError.
pub type Result<T> = std::result::Result<T, GdpError>;
