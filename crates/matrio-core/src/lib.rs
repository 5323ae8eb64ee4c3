//! # matrio-core
//!
//! Binary protocol codec for Matrio-compatible multi-zone amplifiers (the
//! Dayton Audio DAX88 family and relatives).
//!
//! This crate is used by the `matrio-client` session layer and by anything
//! else that needs to speak the amplifier's control protocol.  It has zero
//! dependencies on sockets, async runtimes, or UI frameworks: every function
//! is a pure transformation over byte slices.
//!
//! # Architecture overview (for beginners)
//!
//! The amplifier exposes up to 8 independently controllable *zones* and 8
//! *inputs*.  A controller talks to it over a TCP socket using a compact,
//! reverse-engineered binary protocol:
//!
//! - **Outbound** control commands (power, volume, mute, ...) are wrapped in
//!   a fixed envelope: magic bytes, a little-endian length word, an opaque
//!   12-byte command block, the ASCII tag `MCU+PAS+`, and finally the
//!   `0x82 <command>` body.
//! - **Inbound** traffic is either a full-state *sync packet* describing all
//!   8 zones, a single-change *broadcast* (or the echo of a command), or the
//!   *ALLNAMES* response carrying the device, zone and input names.
//!
//! The crate is organised in two layers:
//!
//! - **`domain`** – The values the protocol talks about: [`ZoneId`],
//!   [`ZoneSnapshot`], [`ZoneChangeEvent`], [`NameTable`], [`InputMapping`].
//!
//! - **`protocol`** – How those values travel over the wire: value codecs,
//!   the sync/broadcast/names decoders, and the command encoder.

pub mod domain;
pub mod error;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `matrio_core::ZoneSnapshot` instead of `matrio_core::domain::zone::ZoneSnapshot`.
pub use domain::change::{CommandKind, ZoneChange, ZoneChangeEvent};
pub use domain::names::{InputMapping, NameTable};
pub use domain::zone::{
    BalanceValue, InputRef, MuteState, PowerState, RawZoneBytes, ZoneId, ZoneSnapshot,
};
pub use error::{DecodeError, ValidationError};
pub use protocol::change::decode_change;
pub use protocol::commands::{encode_command, encode_state_query, ControlCommand, NameTarget};
pub use protocol::inbound::{decode_inbound, frame_extent, InboundPacket};
pub use protocol::layout::{SyncLayout, SyncPacketLayout};
pub use protocol::names::parse_names;
pub use protocol::sync::{decode_sync, extract_sync_section, SyncSnapshot};
