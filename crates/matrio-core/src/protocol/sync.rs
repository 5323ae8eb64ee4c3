//! Full-state (sync) packet decoder.
//!
//! # How a sync packet is read (for beginners)
//!
//! 1. [`SyncPacketLayout::classify`] picks the offset table and the section
//!    start from the buffer's length and its first two bytes.
//! 2. The buffer must be long enough to reach the end of the last field
//!    region; otherwise the whole decode fails with
//!    [`DecodeError::TruncatedPacket`].  No partial table is ever returned.
//! 3. For each zone `i` the decoder reads byte `i` of every field region and
//!    runs it through the matching value codec.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::names::InputMapping;
use crate::domain::zone::{RawZoneBytes, ZoneId, ZoneSnapshot};
use crate::domain::ZONE_COUNT;
use crate::error::DecodeError;
use crate::protocol::layout::{SyncField, SyncPacketLayout, SYNC_LEN_68, SYNC_LEN_96};
use crate::protocol::values::{
    balance_wire_to_ui, mute_wire_to_ui, power_wire_to_ui, tone_wire_to_ui, volume_wire_to_ui,
};
use crate::protocol::wire::SYNC_SIGNATURE;

/// All eight zones decoded from one sync packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub layout: SyncPacketLayout,
    /// Index 0 is zone 1.
    pub zones: [ZoneSnapshot; ZONE_COUNT],
}

impl SyncSnapshot {
    pub fn zone(&self, zone: ZoneId) -> &ZoneSnapshot {
        &self.zones[zone.index()]
    }
}

/// Decodes a sync packet into eight [`ZoneSnapshot`]s.
///
/// Input bytes are resolved through `inputs`; a byte the mapping has no
/// entry for decodes to [`crate::InputRef::Unknown`].
///
/// # Errors
///
/// Returns [`DecodeError::TruncatedPacket`] when the buffer is shorter than
/// the detected (or assumed) layout requires.
///
/// # Examples
///
/// ```rust
/// use matrio_core::{decode_sync, InputMapping, PowerState, ZoneId};
///
/// let mut packet = vec![0x82, 0x0c];
/// packet.resize(68, 0x01);
/// let snapshot = decode_sync(&packet, &InputMapping::default()).unwrap();
/// let zone = snapshot.zone(ZoneId::new(1).unwrap());
/// assert_eq!(zone.power, PowerState::On);
/// assert_eq!(zone.input.name(), Some("Input1"));
/// ```
pub fn decode_sync(bytes: &[u8], inputs: &InputMapping) -> Result<SyncSnapshot, DecodeError> {
    let layout = SyncPacketLayout::classify(bytes);
    if !layout.recognized {
        warn!(
            len = bytes.len(),
            "unrecognized sync packet layout; falling back to 68-byte field table"
        );
    }

    let needed = layout.required_len();
    if bytes.len() < needed {
        return Err(DecodeError::TruncatedPacket {
            context: "sync packet",
            needed,
            available: bytes.len(),
        });
    }

    let read = |field: SyncField, index: usize| bytes[layout.region_start(field) + index];

    let zones = std::array::from_fn(|index| {
        let raw = RawZoneBytes {
            power: read(SyncField::Power, index),
            input: read(SyncField::Input, index),
            volume: read(SyncField::Volume, index),
            balance: read(SyncField::Balance, index),
            mute: read(SyncField::Mute, index),
            bass: read(SyncField::Bass, index),
            treble: read(SyncField::Treble, index),
        };
        ZoneSnapshot {
            zone: ZoneId::from_index(index),
            power: power_wire_to_ui(raw.power, layout.layout),
            input: inputs.resolve(raw.input),
            volume: volume_wire_to_ui(raw.volume),
            balance: balance_wire_to_ui(raw.balance),
            mute: mute_wire_to_ui(raw.mute, layout.layout),
            bass: tone_wire_to_ui(raw.bass),
            treble: tone_wire_to_ui(raw.treble),
            raw,
        }
    });

    debug!(
        layout = ?layout.layout,
        section_start = layout.section_start,
        "decoded sync packet"
    );
    Ok(SyncSnapshot { layout, zones })
}

/// Finds the first `82 0C` sync section in a larger buffer.
///
/// Returns the 96-byte slice starting at the signature when that many bytes
/// are available, otherwise the 68-byte slice, otherwise `None`.
pub fn extract_sync_section(buf: &[u8]) -> Option<&[u8]> {
    let start = buf
        .windows(SYNC_SIGNATURE.len())
        .position(|window| window == SYNC_SIGNATURE)?;

    [SYNC_LEN_96, SYNC_LEN_68]
        .into_iter()
        .find_map(|len| buf.get(start..start + len))
}
