//! Caps payloads: canonical text plus a NUL terminator.

use bytes::Bytes;

use super::{nul_terminated, split_text};
use crate::error::{GdpError, Result};
use crate::protocol::{PacketHeader, PayloadType, ProtocolVersion, HEADER_SIZE};
use crate::types::Caps;

/// Encode a caps packet. All timing fields are zero.
///
/// Caps whose text form would not parse back are rejected with
/// [`GdpError::InvalidName`].
pub fn encode_caps(
    caps: &Caps,
    flags: u8,
    version: ProtocolVersion,
) -> Result<([u8; HEADER_SIZE], Bytes)> {
    caps.validate()?;
    let payload = nul_terminated(caps.to_string())?;
    let header = PacketHeader::new(version, flags, PayloadType::Caps, payload.len() as u32);
    Ok((header.encode(&[&payload])?, payload))
}

/// Decode a caps payload. An empty payload is the empty caps.
pub fn decode_caps(payload: &[u8]) -> Result<Caps> {
    if payload.is_empty() {
        return Ok(Caps::new_empty());
    }
    let text =
        split_text(payload).map_err(|reason| GdpError::InvalidCaps(reason.to_string()))?;
    text.parse::<Caps>()
        .map_err(|e| GdpError::InvalidCaps(format!("{e} in {text:?}")))
}
