//! Media entities serialized by the protocol.
//!
//! These are the wire-visible parts of what a pipeline exchanges:
//! - [`Frame`] - media data with timing metadata
//! - [`Caps`] - stream description
//! - [`Event`] - in-band control event
//! - [`Structure`] - named typed fields shared by caps and events

mod caps;
mod event;
mod frame;
mod structure;

pub use caps::Caps;
pub use event::{
    event_type_flags, seek_flags, Event, EventType, Format, SeekParams, SeekType, Segment,
};
pub use frame::{frame_flags, Frame};
pub use structure::{Structure, Value};
