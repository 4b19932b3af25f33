//! Current (1.x) event payloads.
//!
//! Any event type may be sent. Fields travel as structure text followed by
//! one NUL; an event without fields has an empty payload.

use bytes::Bytes;

use crate::codec::{nul_terminated, split_text};
use crate::error::{GdpError, Result};
use crate::protocol::EVENT_BASE;
use crate::types::{Event, EventType, Structure};

/// Encode an event; returns the subtype code and the payload.
pub fn encode_event(event: &Event) -> Result<(u16, Bytes)> {
    let event_type = event.event_type();
    let code = event_type.code();
    if EVENT_BASE.checked_add(code).is_none() {
        return Err(GdpError::UnsupportedEvent {
            event_type,
            reason: "event code does not fit the payload type field",
        });
    }

    let payload = match event.structure() {
        Some(structure) => {
            structure.validate()?;
            nul_terminated(structure.to_string())?
        }
        None => Bytes::new(),
    };
    Ok((code, payload))
}

/// Decode a current-generation event payload.
///
/// Every failure is a recoverable [`GdpError::MalformedPayload`].
pub fn decode_event(code: u16, payload: &[u8]) -> Result<Event> {
    let event_type = EventType::from_code(code);
    if payload.is_empty() {
        return Ok(Event::new(event_type));
    }

    if payload.last() != Some(&0) {
        return Err(GdpError::MalformedPayload(
            "event payload is not NUL-terminated".to_string(),
        ));
    }
    let text =
        split_text(payload).map_err(|reason| GdpError::MalformedPayload(reason.to_string()))?;
    let structure = text
        .parse::<Structure>()
        .map_err(|e| GdpError::MalformedPayload(e.to_string()))?;
    Ok(Event::new_custom(event_type, structure))
}
