//! Wire protocol: constants, value codecs, decoders and the command encoder.
//!
//! Inbound decoding is split by packet shape:
//!
//! - [`sync`] – the full-state packet describing all eight zones.
//! - [`change`] – the single-change broadcast and the command echo.
//! - [`names`] – the ALLNAMES response.
//! - [`inbound`] – classifies one framed buffer and dispatches to the above.
//!
//! Outbound frames are built by [`commands`].

pub mod change;
pub mod commands;
pub mod inbound;
pub mod layout;
pub mod names;
pub mod sync;
pub mod values;
pub mod wire;

pub use change::decode_change;
pub use commands::{encode_command, encode_state_query, ControlCommand, NameTarget};
pub use inbound::{decode_inbound, frame_extent, InboundPacket};
pub use layout::{SyncLayout, SyncPacketLayout};
pub use names::parse_names;
pub use sync::{decode_sync, extract_sync_section, SyncSnapshot};
pub use wire::CommandCode;
