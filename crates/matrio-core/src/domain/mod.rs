//! Domain values for the amplifier protocol.
//!
//! This module contains plain data types with no wire knowledge and no I/O.
//! The decoders in [`crate::protocol`] produce them and the session layer in
//! `matrio-client` caches them.
//!
//! # Ownership (for beginners)
//!
//! Every type here is a *value*: it is cloned, compared and replaced, never
//! shared behind a pointer and mutated.  When a new sync packet arrives the
//! session swaps in a whole new table of [`zone::ZoneSnapshot`]s; when a single
//! change arrives it builds a new snapshot with [`zone::ZoneSnapshot::apply`]
//! and replaces the old one.  That keeps the codec trivially thread-safe.

/// Per-zone decoded state and the typed zone id.
pub mod zone;

/// Discrete change notifications decoded from broadcast/echo packets.
pub mod change;

/// Device, zone and input names, plus the input mapping injected into decoders.
pub mod names;

/// Number of zones on every supported amplifier.
pub const ZONE_COUNT: usize = 8;

/// Number of selectable inputs on every supported amplifier.
pub const INPUT_COUNT: usize = 8;
