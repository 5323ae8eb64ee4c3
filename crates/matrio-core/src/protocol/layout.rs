//! Sync packet layouts.
//!
//! Two firmware variants send the full-state packet with different byte
//! offsets for the power and mute regions.  The layout is resolved once per
//! packet by [`SyncPacketLayout::classify`] and then passed explicitly to every
//! offset lookup and value codec, so the decode paths cannot drift apart.
//!
//! # Field regions (for beginners)
//!
//! Each field occupies an 8-byte run, one byte per zone, starting at a fixed
//! offset from the beginning of the sync section:
//!
//! ```text
//! field     68-byte   96-byte
//! input       +2        +2
//! volume     +10       +10
//! treble     +18       +18
//! bass       +26       +26
//! mute       +28       +52
//! balance    +34       +34
//! power      +50       +44
//! ```
//!
//! In the 68-byte layout the mute region overlaps the bass and balance
//! regions.  That is how the device sends it; the offsets are not a typo.

use serde::{Deserialize, Serialize};

use crate::protocol::wire::SYNC_SIGNATURE;

/// Length of a bare 68-byte sync packet.
pub const SYNC_LEN_68: usize = 68;

/// Length of a 96-byte sync packet including its 28-byte preamble.
pub const SYNC_LEN_96: usize = 96;

/// Bytes preceding the sync section in a 96-byte packet.
pub const SYNC_PREAMBLE_96: usize = 28;

/// Every field region is one byte per zone.
pub const FIELD_REGION_LEN: usize = 8;

/// Which byte-offset scheme a sync packet uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncLayout {
    SixtyEight,
    NinetySix,
}

/// A field carried in a sync packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncField {
    Input,
    Volume,
    Treble,
    Bass,
    Balance,
    Power,
    Mute,
}

impl SyncField {
    pub const ALL: [SyncField; 7] = [
        SyncField::Input,
        SyncField::Volume,
        SyncField::Treble,
        SyncField::Bass,
        SyncField::Balance,
        SyncField::Power,
        SyncField::Mute,
    ];
}

impl SyncLayout {
    /// Offset of `field`'s 8-byte region from the start of the sync section.
    pub fn field_offset(self, field: SyncField) -> usize {
        match (self, field) {
            (_, SyncField::Input) => 2,
            (_, SyncField::Volume) => 10,
            (_, SyncField::Treble) => 18,
            (_, SyncField::Bass) => 26,
            (_, SyncField::Balance) => 34,
            (SyncLayout::NinetySix, SyncField::Power) => 44,
            (SyncLayout::SixtyEight, SyncField::Power) => 50,
            (SyncLayout::NinetySix, SyncField::Mute) => 52,
            (SyncLayout::SixtyEight, SyncField::Mute) => 28,
        }
    }

    /// Bytes needed after the section start to read every field region.
    pub fn section_len(self) -> usize {
        SyncField::ALL
            .iter()
            .map(|&field| self.field_offset(field))
            .max()
            .unwrap_or(0)
            + FIELD_REGION_LEN
    }
}

/// The resolved layout of one sync packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPacketLayout {
    pub layout: SyncLayout,
    /// Offset of the `82 0C` section inside the buffer.
    pub section_start: usize,
    /// `false` when the buffer matched neither known shape and the 68-byte
    /// table is being applied as a fallback.
    pub recognized: bool,
}

impl SyncPacketLayout {
    /// Resolves the layout of `bytes`.
    ///
    /// - A buffer of exactly 96 bytes uses the 96-byte table; any other
    ///   length uses the 68-byte table.
    /// - A buffer opening with `82 0C` is an already-extracted section
    ///   (start 0).  Otherwise a 96-byte buffer carries its section at 28.
    /// - A buffer that is neither 68 nor 96 bytes long and lacks the
    ///   signature is flagged as unrecognized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use matrio_core::{SyncLayout, SyncPacketLayout};
    ///
    /// let layout = SyncPacketLayout::classify(&[0u8; 96]);
    /// assert_eq!(layout.layout, SyncLayout::NinetySix);
    /// assert_eq!(layout.section_start, 28);
    ///
    /// let fallback = SyncPacketLayout::classify(&[0u8; 70]);
    /// assert_eq!(fallback.layout, SyncLayout::SixtyEight);
    /// assert!(!fallback.recognized);
    /// ```
    pub fn classify(bytes: &[u8]) -> Self {
        let layout = if bytes.len() == SYNC_LEN_96 {
            SyncLayout::NinetySix
        } else {
            SyncLayout::SixtyEight
        };
        let has_signature = bytes.starts_with(&SYNC_SIGNATURE);

        let section_start = if has_signature {
            0
        } else if bytes.len() == SYNC_LEN_96 {
            SYNC_PREAMBLE_96
        } else {
            0
        };

        let recognized =
            has_signature || bytes.len() == SYNC_LEN_68 || bytes.len() == SYNC_LEN_96;

        Self {
            layout,
            section_start,
            recognized,
        }
    }

    /// Absolute offset of `field`'s region inside the buffer.
    pub fn region_start(&self, field: SyncField) -> usize {
        self.section_start + self.layout.field_offset(field)
    }

    /// Minimum buffer length needed to decode every zone.
    pub fn required_len(&self) -> usize {
        self.section_start + self.layout.section_len()
    }
}
