//! # gdp-protocol
//!
//! Framing for media streams sent over a reliable byte transport (pipe,
//! TCP, file). Every packet is a fixed 62-byte header followed by a
//! payload that carries a frame, the stream's caps, or an event.
//!
//! ## Architecture
//!
//! - **Sending**: [`payloader::Payloader`] orders frames, caps and events
//!   behind a replayable stream header; [`writer`] writes the packets with
//!   vectored I/O.
//! - **Receiving**: [`protocol::Depacketizer`] rebuilds packets from any
//!   chunking of the byte stream; [`reader`] drives it from an `AsyncRead`.
//! - **Wire**: [`protocol`] (header, CRC) and [`codec`] (payloads) are pure
//!   functions shared by both directions.
//!
//! ## Example
//!
//! ```
//! use gdp_protocol::payloader::Payloader;
//! use gdp_protocol::protocol::{Depacketizer, DepayItem};
//! use gdp_protocol::types::{Caps, Event, Format, Frame, Segment};
//!
//! let mut pay = Payloader::default();
//! let mut packets = pay.submit_event(Event::stream_start("camera")).unwrap();
//! let caps: Caps = "video/x-raw, width=(int)640".parse().unwrap();
//! packets.extend(pay.submit_caps(caps).unwrap());
//! packets.extend(pay.submit_event(Event::segment(&Segment::new(Format::Time))).unwrap());
//! packets.extend(pay.submit_frame(Frame::new(&b"frame data"[..]).with_pts(0)).unwrap());
//!
//! let wire: Vec<u8> = packets.iter().flat_map(|p| p.to_bytes()).collect();
//!
//! let mut depay = Depacketizer::new();
//! let items = depay.push(&wire).unwrap();
//! assert!(matches!(items.last(), Some(DepayItem::Frame { .. })));
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod payloader;
pub mod protocol;
pub mod reader;
pub mod types;
pub mod writer;

pub use config::{DepayConfig, PayConfig};
pub use error::{GdpError, Result};
pub use payloader::Payloader;
pub use protocol::{Depacketizer, DepayItem};
