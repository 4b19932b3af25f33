//! Codec module - payload encoders and decoders.
//!
//! One encoder/decoder pair per payload kind:
//!
//! - [`encode_frame`] / [`decode_frame_header`] - frame memory shared into
//!   the packet, timing in the header
//! - [`encode_caps`] / [`decode_caps`] - canonical caps text plus NUL
//! - [`encode_event`] / [`decode_event`] - two wire generations, selected by
//!   [`ProtocolVersion`](crate::protocol::ProtocolVersion)
//!
//! # Design
//!
//! Codecs are free functions over borrowed entities. Encoders return the
//! encoded header together with the payload so the caller decides whether
//! to write them with one vectored write or to concatenate.
//!
//! # Example
//!
//! ```
//! use gdp_protocol::codec::{decode_caps, decode_event, encode_caps, encode_event};
//! use gdp_protocol::protocol::{decode_header, flags, ProtocolVersion};
//! use gdp_protocol::types::{Caps, Event, EventType};
//!
//! let caps: Caps = "audio/x-raw, rate=(int)48000".parse().unwrap();
//! let (_, payload) = encode_caps(&caps, flags::CRC, ProtocolVersion::Current).unwrap();
//! assert_eq!(decode_caps(&payload).unwrap(), caps);
//!
//! let (header, payload) =
//!     encode_event(&Event::eos(), flags::CRC, ProtocolVersion::Legacy).unwrap();
//! let event = decode_event(&decode_header(&header).unwrap(), &payload).unwrap();
//! assert_eq!(event.event_type(), EventType::Eos);
//! ```

mod caps;
pub mod event;
mod frame;

pub use caps::{decode_caps, encode_caps};
pub use event::{decode_event, encode_event};
pub use frame::{decode_frame_header, encode_frame};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{GdpError, Result};

/// Text payload: the UTF-8 bytes of `text` followed by one NUL.
pub(crate) fn nul_terminated(text: String) -> Result<Bytes> {
    if text.contains('\0') {
        return Err(GdpError::MalformedPayload(
            "text payload contains a NUL byte".to_string(),
        ));
    }
    let size = text.len() + 1;
    if u32::try_from(size).is_err() {
        return Err(GdpError::PayloadTooLarge {
            size: size as u64,
            max: u64::from(u32::MAX),
        });
    }
    let mut buf = BytesMut::with_capacity(size);
    buf.put_slice(text.as_bytes());
    buf.put_u8(0);
    Ok(buf.freeze())
}

/// Text of a text payload. A single trailing NUL is stripped; interior NULs
/// and invalid UTF-8 are rejected.
pub(crate) fn split_text(payload: &[u8]) -> std::result::Result<&str, &'static str> {
    let body = payload.strip_suffix(&[0]).unwrap_or(payload);
    if body.contains(&0) {
        return Err("embedded NUL byte");
    }
    std::str::from_utf8(body).map_err(|_| "payload is not UTF-8")
}
